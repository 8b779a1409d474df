//! A "prelude" for users of the `task_concurrency` crate.
//!
//! This prelude is similar to the standard library's prelude in that you'll
//! almost always want to import its entire contents, but unlike the standard
//! library's prelude you'll have to do so manually:
//!
//! ```
//! use task_concurrency::prelude::*;
//! ```
//!
//! The prelude may grow over time as additional items see ubiquitous use.

pub use crate::entity::{TaskRuntime, TaskRuntimeBuilder};
pub use crate::error::*;
pub use crate::task::buffer_policy::{Admission, BufferPolicy};
pub use crate::task::coroutine::{
    AnyValue, AsyncCoroutine, Coroutine, CoroutineState, Resumption, Suspend, TaskContext,
};
pub use crate::task::group::{TaskGroup, TaskGroupBuilder};
pub use crate::task::runtime_trace::state::instance;
pub use crate::task::runtime_trace::task_handle::{Dispose, Disposer, FnDisposer, TryFnDisposer};
pub use crate::task::runtime_trace::task_instance::{
    AnyInstance, CompletionState, PerformType, TaskInstance, DEFAULT_CANCEL_REASON,
};
pub use crate::task::scheduler::Scheduler;
pub use crate::task::task::{Task, TaskBuilder, TaskHost, TaskState};
pub use crate::task::yieldable::{Resumer, SuspendHandler, Yieldable};

pub use crate::utils::convenience::functions::{
    create_disposer, create_fn_disposer, create_signal, create_try_fn_disposer, Signal,
};

pub use anyhow::{anyhow, Result as AnyResult};
pub use std::time::Duration;
pub use thiserror::Error;

/// State of a task instance, one of the `instance` codes.
pub type InstanceState = usize;

/// Id of a task instance.
pub type InstanceId = u64;

pub(crate) use crate::entity::defer;
pub(crate) use crate::task::buffer_policy::Modifiers;
pub(crate) use crate::task::runtime_trace::state;
pub(crate) use crate::task::runtime_trace::task_handle::DisposerChain;
pub(crate) use crate::task::scheduler::LastPointers;
pub(crate) use crate::utils::convenience::functions::next_id;
pub(crate) use crate::utils::status_report::{Lifecycle, StatusSink};
pub(crate) use log::{debug, error, trace, warn};
pub(crate) use tracing::{debug_span, trace_span};

cfg_status_report!(
    pub use crate::utils::status_report::{PublicEvent, StatusReporter};
);
