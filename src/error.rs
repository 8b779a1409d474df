//! Public error of task-concurrency.

use crate::prelude::*;

use std::sync::Arc;

/// Error enumeration for `Task`-related configuration.
#[derive(Error, Debug)]
pub enum TaskError {
    /// Modifiers change how the scheduler is built, so they are frozen once it exists.
    #[error("Task modifiers must be applied before the first `perform()`.")]
    ModifierAfterPerform,
    /// The task shares its group's scheduler; concurrency belongs to the group.
    #[error("Task `{task}` belongs to a task group, apply concurrency modifiers to the group instead.")]
    ModifierMixedWithGroup {
        /// Name of the offending task.
        task: String,
    },
    /// A concurrency cap of zero would never admit anything.
    #[error("`max_concurrency` must be at least 1.")]
    ZeroConcurrency,
    /// The local runtime could not be built.
    #[error("Failed to build the task runtime.")]
    RuntimeBuild(#[from] std::io::Error),
}

/// Error enumeration for a finished `TaskInstance`.
///
/// This is what the result interface rejects with. It is cheap to clone so every
/// subscriber (and a parent instance waiting on a child) gets its own copy.
#[derive(Error, Debug, Clone)]
pub enum InstanceError {
    /// The instance was canceled, see [`did_cancel`].
    #[error(transparent)]
    Canceled(#[from] TaskCancelation),
    /// The task body (or something it waited on) failed.
    #[error("{0}")]
    Failed(Arc<anyhow::Error>),
    /// A resumption value did not have the type the body asked for.
    #[error("Expected a resumption value of type `{expected}`.")]
    UnexpectedValue {
        /// Type name the body expected.
        expected: &'static str,
    },
    /// The body awaited a future without going through `TaskContext::suspend`.
    #[error("Task body awaited a future outside of `TaskContext::suspend`, wrap it with `Yieldable::future`.")]
    ForeignAwait,
    /// The coroutine unwound without producing a value and without being canceled.
    #[error("Task coroutine unwound without a value.")]
    Unwound,
}

/// The rejection value of a canceled instance.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{reason}")]
pub struct TaskCancelation {
    /// Name of the task the instance belongs to.
    pub task: String,
    /// Id of the canceled instance.
    pub instance: InstanceId,
    /// Human-readable explanation.
    pub reason: String,
}

impl InstanceError {
    /// Wrap an arbitrary error. An `InstanceError` that travelled through `anyhow`
    /// (e.g. a child's failure propagated with `?`) is recovered unchanged.
    pub fn from_anyhow(error: anyhow::Error) -> Self {
        match error.downcast::<InstanceError>() {
            Ok(instance_error) => instance_error,
            Err(error) => InstanceError::Failed(Arc::new(error)),
        }
    }

    /// Build a `Failed` error from a message.
    pub fn msg<M>(message: M) -> Self
    where
        M: std::fmt::Display + std::fmt::Debug + Send + Sync + 'static,
    {
        InstanceError::Failed(Arc::new(anyhow!(message)))
    }

    /// The cancellation details, if this is a cancellation.
    pub fn as_cancelation(&self) -> Option<&TaskCancelation> {
        match self {
            InstanceError::Canceled(cancelation) => Some(cancelation),
            _ => None,
        }
    }
}

/// Returns true if the error is a task cancellation.
///
/// Awaiting a `TaskInstance` rejects with the body's own error or with a
/// cancellation; use this to tell the two apart instead of matching messages.
///
/// ```
/// use task_concurrency::prelude::*;
///
/// fn report(result: Result<u32, InstanceError>) {
///     if let Err(e) = result {
///         if !did_cancel(&e) {
///             eprintln!("task failed: {}", e);
///         }
///     }
/// }
/// # report(Ok(1));
/// ```
pub fn did_cancel(error: &InstanceError) -> bool {
    matches!(error, InstanceError::Canceled(_))
}

/// `did_cancel` for errors that already went through `anyhow`.
pub fn did_cancel_any(error: &anyhow::Error) -> bool {
    error
        .downcast_ref::<InstanceError>()
        .map(did_cancel)
        .unwrap_or(false)
}
