use anyhow::Result;
use task_concurrency::prelude::*;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

// Uploads share one `keep_latest` group; the status reporter prints their lifecycle.
fn main() -> Result<()> {
    FmtSubscriber::builder()
        .with_max_level(Level::DEBUG)
        .init();

    let runtime = TaskRuntime::new()?;
    runtime.block_on(async {
        let uploads = TaskGroupBuilder::default()
            .set_name("uploads")
            .keep_latest()
            .build()?;

        let upload = build_upload_task(&uploads)?;
        let reporter = upload
            .status_reporter()
            .ok_or_else(|| anyhow!("status report is not enabled"))?;

        let instances: Vec<_> = (1..=4).map(|n| upload.perform(vec![n * 10])).collect();
        info!(
            "running: {}, queued: {}",
            uploads.num_running(),
            uploads.num_queued()
        );

        for instance in instances {
            let _ = instance.await;
        }

        while let Ok(event) = reporter.next_public_event() {
            info!("{:?}", event);
        }
        info!("last successful upload: {:?}", uploads.last_successful());
        Ok::<(), anyhow::Error>(())
    })
}

fn build_upload_task(group: &TaskGroup) -> Result<Task<u64, u64>, TaskError> {
    TaskBuilder::default()
        .set_name("upload")
        .set_group(group)
        .enable_status_report()
        .spawn_async(|cx: TaskContext, args: Vec<u64>| async move {
            cx.sleep(Duration::from_millis(args[0])).await?;
            Ok(args[0])
        })
}
