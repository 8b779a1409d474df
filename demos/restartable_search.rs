use anyhow::Result;
use task_concurrency::async_task_body;
use task_concurrency::prelude::*;
use tokio::time::sleep;

// Search-as-you-type: every keystroke restarts the search, only the last one lands.
fn main() -> Result<()> {
    env_logger::init();

    let runtime = TaskRuntimeBuilder::default()
        .set_thread_name("search-demo")
        .build()?;

    runtime.block_on(async {
        let search: Task<String, Vec<String>> = TaskBuilder::default()
            .set_name("search")
            .restartable()
            .spawn_async(async_task_body!(|cx, args: Vec<String>| {
                // Debounce, then pretend to hit the network.
                cx.sleep(Duration::from_millis(150)).await?;
                let query = args[0].clone();
                let hits = cx
                    .wait(async move {
                        sleep(Duration::from_millis(100)).await;
                        Ok(vec![format!("{}-lang.org", query), format!("{}ception", query)])
                    })
                    .await?;
                Ok(hits)
            }))?;

        let mut typed = Vec::new();
        for query in ["r", "ru", "rus", "rust"] {
            typed.push(search.perform(vec![query.to_string()]));
            sleep(Duration::from_millis(60)).await;
        }

        for instance in typed {
            match instance.clone().await {
                Ok(hits) => println!("instance {} found {:?}", instance.id(), hits),
                Err(e) if did_cancel(&e) => println!("instance {} canceled: {}", instance.id(), e),
                Err(e) => println!("instance {} failed: {}", instance.id(), e),
            }
        }

        println!(
            "performed {} times, last successful: {:?}",
            search.perform_count(),
            search.last_successful().and_then(|i| i.value())
        );
        Ok::<(), anyhow::Error>(())
    })
}
