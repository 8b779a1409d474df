//! Per-instance machinery.
//!
//! # TaskInstance
//!
//! one execution of a task:
//!
//! 1. drives the task's coroutine step by step, every step is deferred.
//! 2. a resume index guards each suspension, stale resumptions are ignored.
//! 3. finalizes exactly once: succeeded, errored or canceled.
//!
//! # Disposer
//!
//! cleanup tied to the instance's most recent suspension, it runs before the
//! next resumption or when the instance finalizes.
pub mod state;
pub mod task_handle;
pub mod task_instance;
