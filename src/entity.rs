//! TaskRuntime
//! It hosts the engine: a current-thread tokio runtime plus the `LocalSet`
//! every deferred step, timer and finalize-triggered flush is spawned on.
use crate::prelude::*;

use std::future::Future;

use tokio::runtime::{Builder as TokioBuilder, Runtime};
use tokio::task::LocalSet;

/// Builder for [`TaskRuntime`].
///
/// # Example
///
/// ```
/// use task_concurrency::prelude::*;
///
/// let runtime = TaskRuntimeBuilder::default()
///     .set_thread_name("ui-tasks")
///     .build()
///     .unwrap();
///
/// let value = runtime.block_on(async {
///     let double = TaskBuilder::default()
///         .spawn_async(|cx: TaskContext, args: Vec<u32>| async move {
///             cx.sleep(Duration::from_millis(5)).await?;
///             Ok(args[0] * 2)
///         })
///         .unwrap();
///
///     double.perform(vec![21]).await
/// });
///
/// assert_eq!(value.unwrap(), 42);
/// ```
#[derive(Debug, Default, Clone)]
pub struct TaskRuntimeBuilder {
    thread_name: Option<String>,
}

/// A single-threaded host for tasks.
#[derive(Debug)]
pub struct TaskRuntime {
    runtime: Runtime,
    local: LocalSet,
}

impl TaskRuntimeBuilder {
    /// Name of the runtime's blocking-pool threads.
    ///
    /// Tasks themselves run on whichever thread calls [`TaskRuntime::block_on`].
    pub fn set_thread_name(&mut self, name: &str) -> &mut Self {
        self.thread_name = Some(name.to_string());
        self
    }

    pub fn build(&self) -> Result<TaskRuntime, TaskError> {
        let mut builder = TokioBuilder::new_current_thread();
        builder.enable_all().on_thread_start(|| {
            trace!("task runtime blocking thread started");
        });
        if let Some(name) = self.thread_name.as_ref() {
            builder.thread_name(name.clone());
        }

        let runtime = builder.build()?;

        debug!("task runtime built (blocking threads: {:?})", self.thread_name);
        Ok(TaskRuntime {
            runtime,
            local: LocalSet::new(),
        })
    }
}

impl TaskRuntime {
    pub fn new() -> Result<TaskRuntime, TaskError> {
        TaskRuntimeBuilder::default().build()
    }

    /// Drive `future` to completion, with tasks running alongside it.
    pub fn block_on<F: Future>(&self, future: F) -> F::Output {
        self.local.block_on(&self.runtime, future)
    }

    /// Hand `future` to the runtime without waiting for it.
    pub fn spawn<F>(&self, future: F) -> tokio::task::JoinHandle<F::Output>
    where
        F: Future + 'static,
        F::Output: 'static,
    {
        self.local.spawn_local(future)
    }
}

/// Run `f` on a later tick of the current `LocalSet`.
///
/// Panics outside of a `LocalSet` context, like `tokio::task::spawn_local`.
pub(crate) fn defer<F>(f: F)
where
    F: FnOnce() + 'static,
{
    tokio::task::spawn_local(async move { f() });
}
