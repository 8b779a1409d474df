//! task is the core module of the library, it provides the API for task building,
//! admission control, instance execution and cancellation.

pub mod buffer_policy;
pub mod coroutine;
pub mod group;
pub mod runtime_trace;
pub mod scheduler;
#[allow(clippy::module_inception)]
pub mod task;
pub mod yieldable;
