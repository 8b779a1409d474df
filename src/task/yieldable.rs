//! Values a task body can suspend on.
//!
//! A closed set of suspension kinds, each optionally carrying a disposer that
//! becomes the instance's cleanup for that suspension point:
//!
//! * `raw`: handed straight back to the body on the next step.
//! * `timeout`: resumes after a delay; disposing aborts the timer.
//! * `future`: resumes when an outside future settles; a late result is dropped.
//! * a nested `TaskInstance`: resumes when the child settles.
//! * `custom`: a [`SuspendHandler`] that resumes the instance itself.

use crate::prelude::*;

use std::any::Any;
use std::future::Future;
use std::rc::{Rc, Weak};

use futures::future::LocalBoxFuture;
use futures::FutureExt;

/// A suspension point yielded by a task body.
pub struct Yieldable {
    pub(crate) kind: YieldKind,
    pub(crate) disposer: Option<Disposer>,
}

pub(crate) enum YieldKind {
    Raw(AnyValue),
    Timer(Duration),
    Future(LocalBoxFuture<'static, Result<AnyValue, InstanceError>>),
    Instance(AnyInstance),
    Custom(Box<dyn SuspendHandler>),
}

impl Yieldable {
    fn new(kind: YieldKind) -> Self {
        Yieldable {
            kind,
            disposer: None,
        }
    }

    /// Pass `value` back to the body on the next step, without interpreting it.
    ///
    /// `raw(instance)` resumes with the instance handle itself instead of
    /// waiting for the instance to settle.
    pub fn raw<V: 'static>(value: V) -> Self {
        Yieldable::new(YieldKind::Raw(Box::new(value)))
    }

    /// Resume with `()` after `duration`.
    pub fn timeout(duration: Duration) -> Self {
        Yieldable::new(YieldKind::Timer(duration))
    }

    /// Resume with the output of `future`, or throw its error.
    pub fn future<F, V>(future: F) -> Self
    where
        F: Future<Output = AnyResult<V>> + 'static,
        V: 'static,
    {
        let future = async move {
            future
                .await
                .map(|value| Box::new(value) as AnyValue)
                .map_err(InstanceError::from_anyhow)
        };
        Yieldable::new(YieldKind::Future(future.boxed_local()))
    }

    /// Suspend through a user-supplied handler.
    pub fn custom(handler: impl SuspendHandler + 'static) -> Self {
        Yieldable::new(YieldKind::Custom(Box::new(handler)))
    }

    /// Attach cleanup to this suspension point.
    ///
    /// It runs before the instance resumes again, or when it finalizes.
    pub fn with_disposer(mut self, disposer: impl Dispose + 'static) -> Self {
        self.disposer = Some(Box::new(disposer));
        self
    }

    pub(crate) fn linked_instance(&self) -> Option<InstanceId> {
        match &self.kind {
            YieldKind::Instance(instance) if instance.perform_type() == PerformType::Linked => {
                Some(instance.id())
            }
            _ => None,
        }
    }

    /// Release a yielded value nobody is going to wait on.
    pub(crate) fn discard(self, task_name: &str, instance_id: InstanceId) {
        if let Some(disposer) = self.disposer {
            let mut chain = DisposerChain::default();
            chain.push(disposer);
            chain.dispose(task_name, instance_id);
        }
    }

    pub(crate) fn describe(&self) -> &'static str {
        match self.kind {
            YieldKind::Raw(_) => "raw",
            YieldKind::Timer(_) => "timeout",
            YieldKind::Future(_) => "future",
            YieldKind::Instance(_) => "task instance",
            YieldKind::Custom(_) => "custom",
        }
    }
}

impl<T: Clone + 'static> From<TaskInstance<T>> for Yieldable {
    fn from(instance: TaskInstance<T>) -> Self {
        Yieldable::new(YieldKind::Instance(instance.erase()))
    }
}

impl From<AnyInstance> for Yieldable {
    fn from(instance: AnyInstance) -> Self {
        Yieldable::new(YieldKind::Instance(instance))
    }
}

impl std::fmt::Debug for Yieldable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Yieldable")
            .field("kind", &self.describe())
            .field("has_disposer", &self.disposer.is_some())
            .finish()
    }
}

/// Suspension capability for sources beyond timers, futures and child tasks.
///
/// `suspend` is called once when the body yields; the handler keeps the
/// [`Resumer`] and calls it when the awaited thing happens. A returned
/// disposer becomes the cleanup for this suspension point.
///
/// An `Err` is logged; it does not fail the instance, which then stays
/// suspended until something else resumes or cancels it.
pub trait SuspendHandler {
    fn suspend(self: Box<Self>, resumer: Resumer) -> AnyResult<Option<Disposer>>;
}

impl<F> SuspendHandler for F
where
    F: FnOnce(Resumer) -> AnyResult<Option<Disposer>> + 'static,
{
    fn suspend(self: Box<Self>, resumer: Resumer) -> AnyResult<Option<Disposer>> {
        (*self)(resumer)
    }
}

/// Engine-side re-entry point of an instance.
pub(crate) trait Resumable {
    fn proceed(&self, token: u64, resumption: Resumption);
    fn task_name(&self) -> Rc<str>;
    fn instance_id(&self) -> InstanceId;
}

/// Resumes one particular suspension of one instance.
///
/// The token pins the suspension point: once the instance has moved past
/// it (resumed, canceled or finished), every call is silently ignored.
#[derive(Clone)]
pub struct Resumer {
    pub(crate) target: Weak<dyn Resumable>,
    pub(crate) token: u64,
}

impl Resumer {
    /// Resume with `value`.
    pub fn resume<V: Any>(&self, value: V) {
        self.resume_with(Resumption::Continue(Box::new(value)));
    }

    /// Raise `error` at the suspension point.
    pub fn throw(&self, error: InstanceError) {
        self.resume_with(Resumption::Throw(error));
    }

    /// Cancel the suspended instance.
    pub fn cancel(&self) {
        self.resume_with(Resumption::Cancel);
    }

    pub fn resume_with(&self, resumption: Resumption) {
        match self.target.upgrade() {
            Some(target) => target.proceed(self.token, resumption),
            None => trace!("resumer {} outlived its instance", self.token),
        }
    }

    /// The sequence token this resumer was issued for.
    pub fn token(&self) -> u64 {
        self.token
    }

    pub fn task_name(&self) -> Option<Rc<str>> {
        self.target.upgrade().map(|target| target.task_name())
    }

    pub fn instance_id(&self) -> Option<InstanceId> {
        self.target.upgrade().map(|target| target.instance_id())
    }
}

impl std::fmt::Debug for Resumer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Resumer").field("token", &self.token).finish()
    }
}
