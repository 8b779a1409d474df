use crate::prelude::*;

use super::state::driver;
use crate::task::coroutine::ContextTarget;
use crate::task::yieldable::{Resumable, YieldKind};

use std::any::{type_name, Any};
use std::cell::{Cell, RefCell};
use std::future::IntoFuture;
use std::mem;
use std::rc::{Rc, Weak};

use event_listener::Event;
use futures::future::LocalBoxFuture;
use futures::FutureExt;
use tokio::task::spawn_local;
use tokio::time::sleep;

/// Reason recorded by a plain `cancel()`.
pub const DEFAULT_CANCEL_REASON: &str = ".cancel() was explicitly called";

const ORPHANED_CHILD_REASON: &str = "the TaskInstance waiting on it stopped waiting";

/// How a child instance is tied to the instance that performed it.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PerformType {
    /// Canceled along with a parent that yielded it.
    Default,
    /// Survives its parent.
    Unlinked,
    /// Canceled along with its parent, and expected to be yielded right away.
    Linked,
}

/// Terminal outcome of an instance. Written once.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CompletionState {
    Pending,
    Success,
    Error,
    Cancel,
}

pub(crate) type CoroutineFactory = Box<dyn FnOnce(TaskContext) -> Box<dyn Coroutine>>;
pub(crate) type FinalizeCallback = Box<dyn FnOnce()>;

enum Driver {
    Pending(CoroutineFactory),
    Live(Box<dyn Coroutine>),
    Resuming,
    Done,
}

/// What an instance knows about the task that performed it.
#[derive(Clone)]
pub(crate) struct InstanceMeta {
    pub(crate) task_name: Rc<str>,
    pub(crate) host: Option<Rc<dyn TaskHost>>,
    pub(crate) reporter: StatusSink,
}

pub(crate) struct InstanceInner<T> {
    id: InstanceId,
    task_name: Rc<str>,
    host: Option<Rc<dyn TaskHost>>,
    reporter: StatusSink,
    perform_type: PerformType,
    has_started: Cell<bool>,
    is_canceling: Cell<bool>,
    index: Cell<u64>,
    completion: Cell<CompletionState>,
    driver_state: Cell<usize>,
    expects_linked_yield: Cell<Option<InstanceId>>,
    result: RefCell<Option<Result<T, InstanceError>>>,
    cancel_reason: RefCell<Option<String>>,
    driver: RefCell<Driver>,
    disposers: RefCell<DisposerChain>,
    finalize_callbacks: RefCell<Vec<FinalizeCallback>>,
    settled: Event,
    me: Weak<InstanceInner<T>>,
}

/// One execution of a task.
///
/// Handles are cheap to clone. Awaiting one (or calling
/// [`settled`](TaskInstance::settled)) yields the instance's result.
pub struct TaskInstance<T> {
    pub(crate) inner: Rc<InstanceInner<T>>,
}

impl<T> Clone for TaskInstance<T> {
    fn clone(&self) -> Self {
        TaskInstance {
            inner: self.inner.clone(),
        }
    }
}

impl<T: Clone + 'static> TaskInstance<T> {
    pub(crate) fn new(
        meta: InstanceMeta,
        perform_type: PerformType,
        factory: CoroutineFactory,
    ) -> Self {
        let inner = Rc::new_cyclic(|me| InstanceInner {
            id: next_id(),
            task_name: meta.task_name,
            host: meta.host,
            reporter: meta.reporter,
            perform_type,
            has_started: Cell::new(false),
            is_canceling: Cell::new(false),
            index: Cell::new(1),
            completion: Cell::new(CompletionState::Pending),
            driver_state: Cell::new(driver::BEFORE_CREATE),
            expects_linked_yield: Cell::new(None),
            result: RefCell::new(None),
            cancel_reason: RefCell::new(None),
            driver: RefCell::new(Driver::Pending(factory)),
            disposers: RefCell::new(DisposerChain::default()),
            finalize_callbacks: RefCell::new(Vec::new()),
            settled: Event::new(),
            me: me.clone(),
        });

        TaskInstance { inner }
    }

    pub fn id(&self) -> InstanceId {
        self.inner.id
    }

    pub fn task_name(&self) -> &str {
        &self.inner.task_name
    }

    pub fn perform_type(&self) -> PerformType {
        self.inner.perform_type
    }

    pub fn has_started(&self) -> bool {
        self.inner.has_started.get()
    }

    pub fn is_canceling(&self) -> bool {
        self.inner.is_canceling.get()
    }

    pub fn is_finished(&self) -> bool {
        self.inner.is_finished()
    }

    pub fn is_running(&self) -> bool {
        !self.is_finished()
    }

    pub fn is_successful(&self) -> bool {
        self.completion() == CompletionState::Success
    }

    pub fn is_error(&self) -> bool {
        self.completion() == CompletionState::Error
    }

    /// Canceled, whether or not it ever started.
    pub fn is_canceled(&self) -> bool {
        self.is_canceling() && self.is_finished()
    }

    /// Canceled before it ever started.
    pub fn is_dropped(&self) -> bool {
        self.is_canceling() && !self.has_started()
    }

    pub fn completion(&self) -> CompletionState {
        self.inner.completion.get()
    }

    /// One of the `state::instance` codes.
    pub fn state(&self) -> InstanceState {
        self.inner.state()
    }

    /// The result, once finalized.
    pub fn result(&self) -> Option<Result<T, InstanceError>> {
        self.inner.result()
    }

    pub fn value(&self) -> Option<T> {
        self.result().and_then(Result::ok)
    }

    pub fn error(&self) -> Option<InstanceError> {
        self.result().and_then(Result::err)
    }

    pub fn cancel_reason(&self) -> Option<String> {
        self.inner.cancel_reason.borrow().clone()
    }

    pub(crate) fn start(&self) {
        self.inner.start();
    }

    /// Cancel with the default reason.
    pub fn cancel(&self) {
        self.cancel_with(DEFAULT_CANCEL_REASON);
    }

    /// Cancel, explaining why.
    ///
    /// No-op once canceling or finished. An instance that has not started is
    /// finalized on the spot (dropped); a started one unwinds on its next step.
    pub fn cancel_with(&self, reason: &str) {
        self.inner.cancel_with(reason);
    }

    /// Wait until the instance finalizes.
    pub async fn settled(&self) -> Result<T, InstanceError> {
        loop {
            if let Some(result) = self.result() {
                return result;
            }

            let listener = self.inner.settled.listen();
            if let Some(result) = self.result() {
                return result;
            }
            listener.await;
        }
    }

    /// Run `callback` with the value if the instance succeeds.
    pub fn on_success(&self, callback: impl FnOnce(T) + 'static) -> &Self {
        self.on_settle(move |result| {
            if let Ok(value) = result {
                callback(value);
            }
        })
    }

    /// Run `callback` with the error if the instance errors or is canceled.
    pub fn on_failure(&self, callback: impl FnOnce(InstanceError) + 'static) -> &Self {
        self.on_settle(move |result| {
            if let Err(error) = result {
                callback(error);
            }
        })
    }

    /// Run `callback` once the instance finalizes, whatever the outcome.
    ///
    /// Callbacks are deferred, never run inside the call that finalized.
    pub fn on_settle(
        &self,
        callback: impl FnOnce(Result<T, InstanceError>) + 'static,
    ) -> &Self {
        let me = self.inner.me.clone();
        self.inner.on_finalize(Box::new(move || {
            if let Some(result) = me.upgrade().and_then(|inner| inner.result()) {
                defer(move || callback(result));
            }
        }));
        self
    }

    /// A type-erased handle to the same instance.
    pub fn erase(&self) -> AnyInstance {
        AnyInstance(self.inner.clone())
    }
}

impl<T: Clone + 'static> IntoFuture for TaskInstance<T> {
    type Output = Result<T, InstanceError>;
    type IntoFuture = LocalBoxFuture<'static, Self::Output>;

    fn into_future(self) -> Self::IntoFuture {
        async move { self.settled().await }.boxed_local()
    }
}

impl<T: Clone + 'static> std::fmt::Debug for TaskInstance<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TaskInstance")
            .field("id", &self.id())
            .field("task", &self.task_name())
            .field("completion", &self.completion())
            .field("has_started", &self.has_started())
            .field("is_canceling", &self.is_canceling())
            .finish()
    }
}

impl<T: Clone + 'static> InstanceInner<T> {
    fn is_finished(&self) -> bool {
        self.completion.get() != CompletionState::Pending
    }

    fn result(&self) -> Option<Result<T, InstanceError>> {
        self.result.borrow().clone()
    }

    fn state(&self) -> InstanceState {
        let canceling = self.is_canceling.get();
        if canceling && !self.has_started.get() {
            state::instance::DROPPED
        } else if canceling && self.is_finished() {
            state::instance::CANCELED
        } else if self.is_finished() {
            state::instance::FINISHED
        } else if self.has_started.get() {
            state::instance::RUNNING
        } else {
            state::instance::WAITING
        }
    }

    fn context(&self) -> TaskContext {
        let target: Weak<dyn ContextTarget> = self.me.clone();
        TaskContext::new(target, self.id, self.task_name.clone(), self.host.clone())
    }

    fn resumer(&self, token: u64) -> Resumer {
        let target: Weak<dyn Resumable> = self.me.clone();
        Resumer { target, token }
    }

    fn start(&self) {
        if self.has_started.get() || self.is_canceling.get() {
            return;
        }

        self.has_started.set(true);
        self.reporter
            .report(Lifecycle::Started, &self.task_name, self.id);
        trace!("Task `{}` instance {} started", self.task_name, self.id);
        self.schedule_step(Resumption::unit());
    }

    fn cancel_with(&self, reason: &str) {
        if self.is_canceling.get() || self.is_finished() {
            return;
        }

        self.mark_canceling(reason);
        debug!(
            "Task `{}` instance {} canceling because {}",
            self.task_name, self.id, reason
        );

        if self.has_started.get() {
            self.schedule_step(Resumption::Cancel);
        } else {
            self.finalize_canceled();
        }
    }

    fn mark_canceling(&self, reason: &str) {
        self.is_canceling.set(true);
        let mut recorded = self.cancel_reason.borrow_mut();
        if recorded.is_none() {
            *recorded = Some(format!(
                "TaskInstance '{}' was canceled because {}.",
                self.task_name, reason
            ));
        }
    }

    fn cancelation(&self) -> InstanceError {
        let reason = self.cancel_reason.borrow().clone().unwrap_or_else(|| {
            format!(
                "TaskInstance '{}' was canceled because {}.",
                self.task_name, DEFAULT_CANCEL_REASON
            )
        });

        InstanceError::Canceled(TaskCancelation {
            task: self.task_name.to_string(),
            instance: self.id,
            reason,
        })
    }

    fn on_finalize(&self, callback: FinalizeCallback) {
        if self.is_finished() {
            defer(callback);
        } else {
            self.finalize_callbacks.borrow_mut().push(callback);
        }
    }

    /// Advance the index and run the next step on a later tick.
    ///
    /// A step only runs if nothing advanced the index in between.
    fn schedule_step(&self, resumption: Resumption) {
        let index = self.index.get() + 1;
        self.index.set(index);

        let me = self.me.clone();
        defer(move || {
            if let Some(inner) = me.upgrade() {
                if inner.index.get() == index && !inner.is_finished() {
                    inner.step(resumption);
                } else {
                    trace!(
                        "Task `{}` instance {} skipped superseded step {}",
                        inner.task_name,
                        inner.id,
                        index
                    );
                }
            }
        });
    }

    fn step(&self, resumption: Resumption) {
        let span = debug_span!(
            "task_step",
            task = %self.task_name,
            instance = self.id,
            verb = resumption.verb()
        );
        let _entered = span.enter();

        if self.driver_state.get() == driver::DONE {
            self.settle_from(resumption);
            return;
        }

        if let Resumption::Cancel = resumption {
            self.mark_canceling(DEFAULT_CANCEL_REASON);
        }
        self.dispose();

        let before = self.index.get();
        let mut coroutine = match self.take_coroutine(&resumption) {
            Some(coroutine) => coroutine,
            None => return,
        };

        match coroutine.resume(resumption) {
            Ok(CoroutineState::Yielded(yieldable)) => {
                self.restore(coroutine);
                if self.index.get() != before || self.is_finished() {
                    trace!(
                        "Task `{}` instance {} moved on while stepping, discarding {}",
                        self.task_name,
                        self.id,
                        yieldable.describe()
                    );
                    yieldable.discard(&self.task_name, self.id);
                    return;
                }
                self.handle_yielded(yieldable);
            }
            Ok(CoroutineState::Complete(value)) => {
                self.retire(coroutine);
                if self.is_canceling.get() {
                    self.finalize_canceled();
                } else {
                    self.schedule_step(Resumption::Continue(value));
                }
            }
            Ok(CoroutineState::Unwound) => {
                self.retire(coroutine);
                if self.is_canceling.get() {
                    self.finalize_canceled();
                } else {
                    self.finalize(CompletionState::Error, Err(InstanceError::Unwound));
                }
            }
            Err(error) => {
                self.retire(coroutine);
                self.finalize(CompletionState::Error, Err(error));
            }
        }
    }

    fn take_coroutine(&self, resumption: &Resumption) -> Option<Box<dyn Coroutine>> {
        let driver = mem::replace(&mut *self.driver.borrow_mut(), Driver::Resuming);
        match driver {
            Driver::Live(coroutine) => Some(coroutine),
            Driver::Pending(factory) => {
                if let Resumption::Cancel = resumption {
                    *self.driver.borrow_mut() = Driver::Done;
                    self.driver_state.set(driver::DONE);
                    self.finalize_canceled();
                    return None;
                }

                self.driver_state.set(driver::HAS_MORE_VALUES);
                Some(factory(self.context()))
            }
            other => {
                *self.driver.borrow_mut() = other;
                None
            }
        }
    }

    fn restore(&self, coroutine: Box<dyn Coroutine>) {
        if self.is_finished() {
            return;
        }
        *self.driver.borrow_mut() = Driver::Live(coroutine);
    }

    fn retire(&self, coroutine: Box<dyn Coroutine>) {
        self.driver_state.set(driver::DONE);
        *self.driver.borrow_mut() = Driver::Done;
        drop(coroutine);
    }

    /// The body is done; the resumption decides the outcome.
    fn settle_from(&self, resumption: Resumption) {
        match resumption {
            Resumption::Continue(value) | Resumption::Return(value) => {
                match value.downcast::<T>() {
                    Ok(value) => self.finalize(CompletionState::Success, Ok(*value)),
                    Err(_) => self.finalize(
                        CompletionState::Error,
                        Err(InstanceError::UnexpectedValue {
                            expected: type_name::<T>(),
                        }),
                    ),
                }
            }
            Resumption::Throw(error) => self.finalize(CompletionState::Error, Err(error)),
            Resumption::Cancel => {
                self.mark_canceling(DEFAULT_CANCEL_REASON);
                self.finalize_canceled();
            }
        }
    }

    fn handle_yielded(&self, yieldable: Yieldable) {
        if let Some(expected) = self.expects_linked_yield.take() {
            if yieldable.linked_instance() != Some(expected) {
                warn!(
                    "Task `{}` instance {} performed linked instance {} but yielded a {} value; \
                     a linked instance must be yielded right away.",
                    self.task_name,
                    self.id,
                    expected,
                    yieldable.describe()
                );
            }
        }

        let Yieldable { kind, disposer } = yieldable;
        if let Some(disposer) = disposer {
            self.disposers.borrow_mut().push(disposer);
        }

        let token = self.index.get();
        match kind {
            YieldKind::Raw(value) => self.schedule_step(Resumption::Continue(value)),
            YieldKind::Timer(duration) => {
                let resumer = self.resumer(token);
                let timer = spawn_local(async move {
                    sleep(duration).await;
                    resumer.resume(());
                });
                self.disposers.borrow_mut().push(Box::new(timer));
            }
            YieldKind::Future(future) => {
                let resumer = self.resumer(token);
                spawn_local(async move {
                    match future.await {
                        Ok(value) => resumer.resume_with(Resumption::Continue(value)),
                        Err(error) => resumer.throw(error),
                    }
                });
            }
            YieldKind::Instance(child) => self.suspend_on_child(child, token),
            YieldKind::Custom(handler) => match handler.suspend(self.resumer(token)) {
                Ok(Some(disposer)) => self.disposers.borrow_mut().push(disposer),
                Ok(None) => {}
                Err(e) => error!(
                    "Task `{}` instance {} failed to register a custom suspension: {:?}",
                    self.task_name, self.id, e
                ),
            },
        }
    }

    fn suspend_on_child(&self, child: AnyInstance, token: u64) {
        let resumer = self.resumer(token);
        let watched = Rc::downgrade(&child.0);
        child.0.on_finalize(Box::new(move || {
            if let Some(outcome) = watched.upgrade().and_then(|child| child.outcome()) {
                resumer.resume_with(outcome);
            }
        }));

        if child.perform_type() == PerformType::Unlinked {
            return;
        }

        let parent_host = self.host.clone();
        let parent_name = self.task_name.clone();
        let unlink = FnDisposer::new(move || {
            if child.perform_type() == PerformType::Default && child.is_running() {
                let hazard = match (parent_host.as_ref(), child.0.host()) {
                    (Some(parent), Some(child_host)) => {
                        !Rc::ptr_eq(parent, &child_host) && parent.is_destroying()
                    }
                    _ => false,
                };
                if hazard {
                    warn!(
                        "Potential self-cancel loop between parent task `{}` and child task `{}`: \
                         the parent's host differs from the child's and is being torn down \
                         while the child is running. \
                         Use `perform_linked` to cancel the child with its parent, \
                         or `perform_unlinked` to let it outlive the parent.",
                        parent_name,
                        child.task_name()
                    );
                }
            }
            child.cancel_with(ORPHANED_CHILD_REASON);
        });
        self.disposers.borrow_mut().push(Box::new(unlink));
    }

    fn dispose(&self) {
        let chain = mem::take(&mut *self.disposers.borrow_mut());
        if !chain.is_empty() {
            chain.dispose(&self.task_name, self.id);
        }
    }

    fn finalize_canceled(&self) {
        let cancelation = self.cancelation();
        self.finalize(CompletionState::Cancel, Err(cancelation));
    }

    fn finalize(&self, completion: CompletionState, result: Result<T, InstanceError>) {
        if self.is_finished() {
            return;
        }
        self.index.set(self.index.get() + 1);

        let (completion, result) = if self.is_canceling.get() {
            (CompletionState::Cancel, Err(self.cancelation()))
        } else {
            (completion, result)
        };
        self.completion.set(completion);
        *self.result.borrow_mut() = Some(result);

        self.driver_state.set(driver::DONE);
        let driver = mem::replace(&mut *self.driver.borrow_mut(), Driver::Done);
        drop(driver);
        self.dispose();

        let callbacks = mem::take(&mut *self.finalize_callbacks.borrow_mut());
        for callback in callbacks {
            callback();
        }
        self.settled.notify(usize::MAX);

        let lifecycle = match completion {
            CompletionState::Success => Lifecycle::Succeeded,
            CompletionState::Error => Lifecycle::Errored,
            _ if !self.has_started.get() => Lifecycle::Dropped,
            _ => Lifecycle::Canceled,
        };
        self.reporter.report(lifecycle, &self.task_name, self.id);
        debug!(
            "Task `{}` instance {} finalized: {:?}",
            self.task_name, self.id, lifecycle
        );
    }
}

impl<T: Clone + 'static> Resumable for InstanceInner<T> {
    fn proceed(&self, token: u64, resumption: Resumption) {
        if self.is_finished() {
            return;
        }
        if token != self.index.get() {
            trace!(
                "Task `{}` instance {} ignored stale {} with token {} (at {})",
                self.task_name,
                self.id,
                resumption.verb(),
                token,
                self.index.get()
            );
            return;
        }
        self.schedule_step(resumption);
    }

    fn task_name(&self) -> Rc<str> {
        self.task_name.clone()
    }

    fn instance_id(&self) -> InstanceId {
        self.id
    }
}

impl<T: Clone + 'static> ContextTarget for InstanceInner<T> {
    fn expect_linked_yield(&self, child: InstanceId) {
        self.expects_linked_yield.set(Some(child));
    }
}

/// Type-erased operations the scheduler and parent instances need.
pub(crate) trait Schedulable {
    fn id(&self) -> InstanceId;
    fn task_name(&self) -> &str;
    fn host(&self) -> Option<Rc<dyn TaskHost>>;
    fn perform_type(&self) -> PerformType;
    fn has_started(&self) -> bool;
    fn is_canceling(&self) -> bool;
    fn completion(&self) -> CompletionState;
    fn state(&self) -> InstanceState;
    fn start(&self);
    fn cancel_with(&self, reason: &str);
    fn on_finalize(&self, callback: FinalizeCallback);
    /// How a parent waiting on this instance resumes.
    fn outcome(&self) -> Option<Resumption>;
    fn into_any(self: Rc<Self>) -> Rc<dyn Any>;
}

impl<T: Clone + 'static> Schedulable for InstanceInner<T> {
    fn id(&self) -> InstanceId {
        self.id
    }

    fn task_name(&self) -> &str {
        &self.task_name
    }

    fn host(&self) -> Option<Rc<dyn TaskHost>> {
        self.host.clone()
    }

    fn perform_type(&self) -> PerformType {
        self.perform_type
    }

    fn has_started(&self) -> bool {
        self.has_started.get()
    }

    fn is_canceling(&self) -> bool {
        self.is_canceling.get()
    }

    fn completion(&self) -> CompletionState {
        self.completion.get()
    }

    fn state(&self) -> InstanceState {
        InstanceInner::state(self)
    }

    fn start(&self) {
        InstanceInner::start(self);
    }

    fn cancel_with(&self, reason: &str) {
        InstanceInner::cancel_with(self, reason);
    }

    fn on_finalize(&self, callback: FinalizeCallback) {
        InstanceInner::on_finalize(self, callback);
    }

    fn outcome(&self) -> Option<Resumption> {
        match self.result()? {
            Ok(value) => Some(Resumption::Continue(Box::new(value))),
            Err(InstanceError::Canceled(_)) => Some(Resumption::Cancel),
            Err(error) => Some(Resumption::Throw(error)),
        }
    }

    fn into_any(self: Rc<Self>) -> Rc<dyn Any> {
        self
    }
}

/// A task instance with its value type erased.
///
/// Returned where instances of different tasks meet, e.g. a task group's
/// last-state pointers.
#[derive(Clone)]
pub struct AnyInstance(pub(crate) Rc<dyn Schedulable>);

impl AnyInstance {
    pub fn id(&self) -> InstanceId {
        self.0.id()
    }

    pub fn task_name(&self) -> &str {
        self.0.task_name()
    }

    pub fn perform_type(&self) -> PerformType {
        self.0.perform_type()
    }

    pub fn has_started(&self) -> bool {
        self.0.has_started()
    }

    pub fn is_canceling(&self) -> bool {
        self.0.is_canceling()
    }

    pub fn completion(&self) -> CompletionState {
        self.0.completion()
    }

    pub fn is_finished(&self) -> bool {
        self.completion() != CompletionState::Pending
    }

    pub fn is_running(&self) -> bool {
        !self.is_finished()
    }

    pub fn is_successful(&self) -> bool {
        self.completion() == CompletionState::Success
    }

    pub fn is_error(&self) -> bool {
        self.completion() == CompletionState::Error
    }

    pub fn is_canceled(&self) -> bool {
        self.is_canceling() && self.is_finished()
    }

    pub fn is_dropped(&self) -> bool {
        self.is_canceling() && !self.has_started()
    }

    pub fn state(&self) -> InstanceState {
        self.0.state()
    }

    pub fn cancel(&self) {
        self.cancel_with(DEFAULT_CANCEL_REASON);
    }

    pub fn cancel_with(&self, reason: &str) {
        self.0.cancel_with(reason);
    }

    /// Recover the typed handle.
    pub fn downcast<T: Clone + 'static>(&self) -> Option<TaskInstance<T>> {
        self.0
            .clone()
            .into_any()
            .downcast::<InstanceInner<T>>()
            .ok()
            .map(|inner| TaskInstance { inner })
    }

    pub(crate) fn start(&self) {
        self.0.start();
    }

    pub(crate) fn on_finalize(&self, callback: FinalizeCallback) {
        self.0.on_finalize(callback);
    }

    pub(crate) fn downgrade(&self) -> Weak<dyn Schedulable> {
        Rc::downgrade(&self.0)
    }

    pub(crate) fn same(&self, other: &AnyInstance) -> bool {
        self.id() == other.id()
    }
}

impl std::fmt::Debug for AnyInstance {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AnyInstance")
            .field("id", &self.id())
            .field("task", &self.task_name())
            .field("completion", &self.completion())
            .finish()
    }
}
