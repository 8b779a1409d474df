//! task_concurrency runs suspendable units of work ("tasks") as cancelable
//! instances, with per-task or per-group concurrency policies,
//! on a single-threaded cooperative engine backed by tokio's `LocalSet`.
//!
//! # TaskConcurrency
//!
//! User applications can be served through the lib:
//!
//! 1. Tasks built from `async` bodies or hand-written coroutines.
//! 2. Buffer policies: enqueue, drop, restartable and keep-latest, with a concurrency cap.
//! 3. Cancellation that reaches into whatever an instance is suspended on.
//! 4. Task groups sharing one scheduler, with aggregated counts.
//! 5. Derived state: `last_successful`, `num_running`, `perform_count` and friends.
//!
//! # Example
//!
//! ```
//! use task_concurrency::prelude::*;
//!
//! let runtime = TaskRuntime::new().unwrap();
//!
//! runtime.block_on(async {
//!     let search = TaskBuilder::default()
//!         .set_name("search")
//!         .restartable()
//!         .spawn_async(|cx: TaskContext, args: Vec<&'static str>| async move {
//!             cx.sleep(Duration::from_millis(100)).await?;
//!             Ok(format!("results for {}", args[0]))
//!         })
//!         .unwrap();
//!
//!     let first = search.perform(vec!["r"]);
//!     let second = search.perform(vec!["ru"]);
//!
//!     assert!(did_cancel(&first.await.unwrap_err()));
//!     assert_eq!(second.await.unwrap(), "results for ru");
//!     assert_eq!(search.perform_count(), 2);
//! });
//! ```
//!
//! # Features
//!
//! `status-report` (or `full`): publish instance lifecycle events through
//! `Task::status_reporter`.
#![cfg_attr(docsrs, feature(doc_cfg))]

#[macro_use]
pub mod macros;

pub mod entity;
pub mod error;
pub mod prelude;
pub mod task;
pub mod utils;
