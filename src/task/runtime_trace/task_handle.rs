//! Disposers: cleanup bound to the most recent suspension point of an instance.
//!
//! A suspension may hold on to something that outlives it (a timer, a child
//! instance, a user resource). Whatever is yielded can hand the engine a
//! `Disposer`, which runs before the instance resumes again or when it finalizes.

use crate::prelude::*;

use tokio::task::JoinHandle;

/// Exported so that crate users can attach their own cleanup to a yielded value.
pub trait Dispose {
    /// Release whatever the suspension was holding.
    fn dispose(self: Box<Self>) -> AnyResult<()>;
}

/// A boxed, type-erased disposer.
pub type Disposer = Box<dyn Dispose>;

/// The disposer chain of one instance. Adding to an occupied chain keeps the
/// prior handlers and runs them first.
#[derive(Default)]
pub(crate) struct DisposerChain {
    handlers: Vec<Disposer>,
}

impl DisposerChain {
    pub(crate) fn push(&mut self, disposer: Disposer) {
        self.handlers.push(disposer);
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }

    /// Run every handler in attach order. A failing handler is reported and
    /// does not stop the rest of the chain.
    pub(crate) fn dispose(self, task_name: &str, instance_id: InstanceId) {
        for handler in self.handlers {
            if let Err(e) = handler.dispose() {
                error!(
                    "Disposer of task `{}` instance {} failed: {:?}",
                    task_name, instance_id, e
                );
            }
        }
    }
}

/// Adapter turning a closure into a `Dispose`.
pub struct FnDisposer<F>(F);

impl<F> FnDisposer<F>
where
    F: FnOnce() + 'static,
{
    pub fn new(f: F) -> Self {
        FnDisposer(f)
    }
}

impl<F> Dispose for FnDisposer<F>
where
    F: FnOnce() + 'static,
{
    fn dispose(self: Box<Self>) -> AnyResult<()> {
        (self.0)();
        Ok(())
    }
}

/// Adapter for cleanup that can fail.
pub struct TryFnDisposer<F>(F);

impl<F> TryFnDisposer<F>
where
    F: FnOnce() -> AnyResult<()> + 'static,
{
    pub fn new(f: F) -> Self {
        TryFnDisposer(f)
    }
}

impl<F> Dispose for TryFnDisposer<F>
where
    F: FnOnce() -> AnyResult<()> + 'static,
{
    fn dispose(self: Box<Self>) -> AnyResult<()> {
        (self.0)()
    }
}

// Default implementation for locally spawned work: dropping a `JoinHandle`
// detaches, so abort explicitly.
impl<T: 'static> Dispose for JoinHandle<T> {
    fn dispose(self: Box<Self>) -> AnyResult<()> {
        self.abort();
        Ok(())
    }
}
