//! generate_fn_macro contains a simple macro that is used to generate the body
//! closure of an async task.
//! (the block becomes an `async move` block, so everything it uses is moved in,
//! clone shared state before the macro if the body is performed more than once).
/// Create a task body closure for `TaskBuilder::spawn_async` by macro.
///
/// ```
/// use task_concurrency::prelude::*;
/// use task_concurrency::async_task_body;
///
/// let sum: Task<u64, u64> = TaskBuilder::default()
///     .spawn_async(async_task_body!(|cx, args: Vec<u64>| {
///         cx.sleep(Duration::from_millis(10)).await?;
///         Ok(args.iter().sum())
///     }))
///     .unwrap();
///
/// let ping: Task<(), &str> = TaskBuilder::default()
///     .spawn_async(async_task_body!(|cx| {
///         cx.sleep(Duration::from_millis(10)).await?;
///         Ok("pong")
///     }))
///     .unwrap();
/// # assert!(sum.is_idle() && ping.is_idle());
/// ```
#[macro_export]
macro_rules! async_task_body {
    (|$cx:ident, $args:ident: $args_ty:ty| { $($body:tt)* }) => {
        move |$cx: $crate::prelude::TaskContext, $args: $args_ty| async move { $($body)* }
    };
    (|$cx:ident, $args:ident| { $($body:tt)* }) => {
        move |$cx: $crate::prelude::TaskContext, $args| async move { $($body)* }
    };
    (|$cx:ident| { $($body:tt)* }) => {
        move |$cx: $crate::prelude::TaskContext, _args| async move { $($body)* }
    };
}
