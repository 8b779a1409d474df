//! The coroutine contract a task body is driven through.
//!
//! The engine never polls a task body like an ordinary future. It drives a
//! [`Coroutine`] one step at a time from its own resumption loop, and every
//! step hands back either a [`Yieldable`] to wait on or a final value.
//!
//! `async` bodies are adapted by [`AsyncCoroutine`]: the body suspends by
//! awaiting [`TaskContext::suspend`] (or one of its shorthands), which parks
//! the yielded value in a slot shared with the driver and returns `Pending`.

use crate::prelude::*;

use std::any::{type_name, Any};
use std::cell::RefCell;
use std::future::Future;
use std::marker::PhantomData;
use std::pin::Pin;
use std::rc::{Rc, Weak};
use std::task::{Context, Poll};

use futures::future::LocalBoxFuture;
use futures::task::noop_waker_ref;
use futures::FutureExt;

/// A type-erased value passed into or out of a coroutine.
pub type AnyValue = Box<dyn Any>;

/// How a suspended coroutine is resumed.
pub enum Resumption {
    /// Resume with a value.
    Continue(AnyValue),
    /// Resume by raising an error at the suspension point.
    Throw(InstanceError),
    /// Unwind and complete with the given value.
    Return(AnyValue),
    /// Unwind through the cleanup path; the instance finalizes as canceled.
    Cancel,
}

impl Resumption {
    /// `Continue` without a meaningful value.
    pub fn unit() -> Self {
        Resumption::Continue(Box::new(()))
    }

    pub(crate) fn verb(&self) -> &'static str {
        match self {
            Resumption::Continue(_) => "continue",
            Resumption::Throw(_) => "throw",
            Resumption::Return(_) => "return",
            Resumption::Cancel => "cancel",
        }
    }
}

impl std::fmt::Debug for Resumption {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Resumption::Throw(e) => f.debug_tuple("Throw").field(e).finish(),
            other => f.write_str(other.verb()),
        }
    }
}

/// What one step of a coroutine produced.
pub enum CoroutineState {
    /// Suspended on a value; more steps follow.
    Yielded(Yieldable),
    /// Finished with a final value.
    Complete(AnyValue),
    /// Finished without a value, after `Cancel`.
    Unwound,
}

/// A suspendable function, driven exclusively by the engine.
///
/// The first `resume` starts the body; its value, if any, is ignored.
/// An `Err` is an uncaught error and finalizes the instance as errored.
pub trait Coroutine {
    fn resume(&mut self, resumption: Resumption) -> Result<CoroutineState, InstanceError>;
}

#[derive(Default)]
pub(crate) struct YieldChannel {
    yielded: RefCell<Option<Yieldable>>,
    resumed: RefCell<Option<Result<AnyValue, InstanceError>>>,
}

/// Adapts an `async` task body to [`Coroutine`].
pub struct AsyncCoroutine<T> {
    future: Option<LocalBoxFuture<'static, AnyResult<T>>>,
    channel: Rc<YieldChannel>,
    started: bool,
}

impl<T: 'static> AsyncCoroutine<T> {
    /// Invoke `body` with `cx` and wrap the returned future.
    pub fn new<F, Fut>(cx: TaskContext, body: F) -> Self
    where
        F: FnOnce(TaskContext) -> Fut,
        Fut: Future<Output = AnyResult<T>> + 'static,
    {
        let channel = cx.channel.clone();
        AsyncCoroutine {
            future: Some(body(cx).boxed_local()),
            channel,
            started: false,
        }
    }

    fn poll_body(&mut self) -> Result<CoroutineState, InstanceError> {
        let future = match self.future.as_mut() {
            Some(future) => future,
            None => return Ok(CoroutineState::Unwound),
        };

        let mut context = Context::from_waker(noop_waker_ref());
        let polled = future.as_mut().poll(&mut context);
        match polled {
            Poll::Ready(output) => {
                self.future = None;
                output
                    .map(|value| CoroutineState::Complete(Box::new(value)))
                    .map_err(InstanceError::from_anyhow)
            }
            Poll::Pending => match self.channel.yielded.borrow_mut().take() {
                Some(yieldable) => Ok(CoroutineState::Yielded(yieldable)),
                None => {
                    self.future = None;
                    Err(InstanceError::ForeignAwait)
                }
            },
        }
    }
}

impl<T: 'static> Coroutine for AsyncCoroutine<T> {
    fn resume(&mut self, resumption: Resumption) -> Result<CoroutineState, InstanceError> {
        let first = !self.started;
        self.started = true;

        match resumption {
            // Dropping the body runs its destructors, that is the cleanup path.
            Resumption::Cancel => {
                self.future = None;
                Ok(CoroutineState::Unwound)
            }
            Resumption::Return(value) => {
                self.future = None;
                Ok(CoroutineState::Complete(value))
            }
            Resumption::Throw(error) if first => {
                self.future = None;
                Err(error)
            }
            Resumption::Throw(error) => {
                *self.channel.resumed.borrow_mut() = Some(Err(error));
                self.poll_body()
            }
            Resumption::Continue(_) if first => self.poll_body(),
            Resumption::Continue(value) => {
                *self.channel.resumed.borrow_mut() = Some(Ok(value));
                self.poll_body()
            }
        }
    }
}

/// Engine-side view of the instance a context belongs to.
pub(crate) trait ContextTarget {
    fn expect_linked_yield(&self, child: InstanceId);
}

/// The execution context of one task instance.
///
/// Every body receives its own context; it is how the body suspends and how
/// linked child performs find their parent.
#[derive(Clone)]
pub struct TaskContext {
    pub(crate) instance: Weak<dyn ContextTarget>,
    pub(crate) instance_id: InstanceId,
    pub(crate) task_name: Rc<str>,
    pub(crate) host: Option<Rc<dyn TaskHost>>,
    pub(crate) channel: Rc<YieldChannel>,
}

impl TaskContext {
    pub(crate) fn new(
        instance: Weak<dyn ContextTarget>,
        instance_id: InstanceId,
        task_name: Rc<str>,
        host: Option<Rc<dyn TaskHost>>,
    ) -> Self {
        TaskContext {
            instance,
            instance_id,
            task_name,
            host,
            channel: Rc::new(YieldChannel::default()),
        }
    }

    /// Id of the running instance.
    pub fn instance_id(&self) -> InstanceId {
        self.instance_id
    }

    /// Name of the task the running instance belongs to.
    pub fn task_name(&self) -> &str {
        &self.task_name
    }

    /// Host context the task was built with.
    pub fn host(&self) -> Option<&Rc<dyn TaskHost>> {
        self.host.as_ref()
    }

    /// Suspend on `yieldable` and resume with a value of type `V`.
    ///
    /// Resolves to `Err` if the engine throws into the body at this point,
    /// or if the resumption value is not a `V`.
    pub fn suspend<V: 'static>(&self, yieldable: impl Into<Yieldable>) -> Suspend<V> {
        Suspend {
            yieldable: Some(yieldable.into()),
            channel: self.channel.clone(),
            _value: PhantomData,
        }
    }

    /// Suspend for `duration`.
    pub fn sleep(&self, duration: Duration) -> Suspend<()> {
        self.suspend(Yieldable::timeout(duration))
    }

    /// Suspend until an outside future settles.
    pub fn wait<F, V>(&self, future: F) -> Suspend<V>
    where
        F: Future<Output = AnyResult<V>> + 'static,
        V: 'static,
    {
        self.suspend(Yieldable::future(future))
    }

    /// Suspend until a child instance settles, resuming with its value.
    ///
    /// A failed child is thrown into the body, a canceled child cancels it.
    pub fn join<U: Clone + 'static>(&self, child: TaskInstance<U>) -> Suspend<U> {
        self.suspend(child)
    }

    pub(crate) fn expect_linked_yield(&self, child: InstanceId) {
        if let Some(instance) = self.instance.upgrade() {
            instance.expect_linked_yield(child);
        }
    }
}

impl std::fmt::Debug for TaskContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TaskContext")
            .field("instance_id", &self.instance_id)
            .field("task_name", &self.task_name)
            .finish()
    }
}

/// Future returned by [`TaskContext::suspend`].
pub struct Suspend<V> {
    yieldable: Option<Yieldable>,
    channel: Rc<YieldChannel>,
    _value: PhantomData<fn() -> V>,
}

impl<V> Unpin for Suspend<V> {}

impl<V: 'static> Future for Suspend<V> {
    type Output = Result<V, InstanceError>;

    fn poll(mut self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<Self::Output> {
        if let Some(yieldable) = self.yieldable.take() {
            *self.channel.yielded.borrow_mut() = Some(yieldable);
            return Poll::Pending;
        }

        match self.channel.resumed.borrow_mut().take() {
            Some(Ok(value)) => Poll::Ready(value.downcast::<V>().map(|v| *v).map_err(|_| {
                InstanceError::UnexpectedValue {
                    expected: type_name::<V>(),
                }
            })),
            Some(Err(error)) => Poll::Ready(Err(error)),
            None => Poll::Pending,
        }
    }
}
