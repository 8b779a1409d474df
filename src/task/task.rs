use crate::prelude::*;

use crate::task::group::GroupCore;
use crate::task::runtime_trace::task_instance::{CoroutineFactory, InstanceMeta};
use crate::task::scheduler::SchedulerSlot;

use std::cell::{Cell, RefCell};
use std::future::Future;
use std::marker::PhantomData;
use std::rc::Rc;

/// The context a task is defined in.
///
/// The engine only reads the teardown flag, to warn about child instances
/// that would be canceled by a parent whose host is going away. Canceling a
/// host's instances on teardown is up to the host.
pub trait TaskHost {
    fn is_destroying(&self) -> bool {
        false
    }
}

/// Aggregate state of a task or task group.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TaskState {
    Running,
    Queued,
    Idle,
}

impl TaskState {
    pub(crate) fn from_counts(running: usize, queued: usize) -> Self {
        if running > 0 {
            TaskState::Running
        } else if queued > 0 {
            TaskState::Queued
        } else {
            TaskState::Idle
        }
    }
}

/// Per-task accounting, kept by the scheduler.
pub(crate) struct TaskCore {
    pub(crate) id: u64,
    pub(crate) name: Rc<str>,
    pub(crate) host: Option<Rc<dyn TaskHost>>,
    pub(crate) group: Option<Rc<GroupCore>>,
    pub(crate) num_running: Cell<usize>,
    pub(crate) num_queued: Cell<usize>,
    pub(crate) perform_count: Cell<u64>,
    pub(crate) seen: Cell<u64>,
    pub(crate) last: RefCell<LastPointers>,
    pub(crate) reporter: StatusSink,
}

impl TaskCore {
    fn derive(&self) -> TaskCore {
        TaskCore {
            id: next_id(),
            name: self.name.clone(),
            host: self.host.clone(),
            group: self.group.clone(),
            num_running: Cell::new(0),
            num_queued: Cell::new(0),
            perform_count: Cell::new(0),
            seen: Cell::new(0),
            last: RefCell::new(LastPointers::default()),
            reporter: self.reporter.clone(),
        }
    }
}

pub(crate) type Body<A> = Rc<dyn Fn(TaskContext, Vec<A>) -> Box<dyn Coroutine>>;

/// A task: a suspendable function plus the rules for running it repeatedly.
///
/// `A` is the argument type passed to `perform`, `T` the value an instance
/// settles with. Handles are cheap to clone and share everything.
pub struct Task<A, T> {
    core: Rc<TaskCore>,
    body: Body<A>,
    curried: Rc<Vec<A>>,
    slot: SchedulerSlot,
    grouped: bool,
    #[cfg(feature = "status-report")]
    status_reporter: Option<StatusReporter>,
    _output: PhantomData<fn() -> T>,
}

impl<A, T> Clone for Task<A, T> {
    fn clone(&self) -> Self {
        Task {
            core: self.core.clone(),
            body: self.body.clone(),
            curried: self.curried.clone(),
            slot: self.slot.clone(),
            grouped: self.grouped,
            #[cfg(feature = "status-report")]
            status_reporter: self.status_reporter.clone(),
            _output: PhantomData,
        }
    }
}

impl<A: Clone + 'static, T: Clone + 'static> Task<A, T> {
    pub fn id(&self) -> u64 {
        self.core.id
    }

    pub fn name(&self) -> &str {
        &self.core.name
    }

    /// Leading arguments fixed by `curry`.
    pub fn curried_args(&self) -> &[A] {
        &self.curried
    }

    /// Start a new instance with `args` after the curried ones.
    ///
    /// The instance is returned right away; when it starts is up to the
    /// buffer policy.
    pub fn perform(&self, args: Vec<A>) -> TaskInstance<T> {
        self.perform_as(PerformType::Default, args)
    }

    /// Perform an instance that outlives a parent that yields it.
    pub fn perform_unlinked(&self, args: Vec<A>) -> TaskInstance<T> {
        self.perform_as(PerformType::Unlinked, args)
    }

    /// Perform a child of the instance running `cx`, canceled along with it.
    ///
    /// The child is expected to be yielded by that instance right away.
    pub fn perform_linked(&self, cx: &TaskContext, args: Vec<A>) -> TaskInstance<T> {
        let instance = self.perform_as(PerformType::Linked, args);
        cx.expect_linked_yield(instance.id());
        instance
    }

    fn perform_as(&self, perform_type: PerformType, args: Vec<A>) -> TaskInstance<T> {
        let mut full_args = Vec::with_capacity(self.curried.len() + args.len());
        full_args.extend(self.curried.iter().cloned());
        full_args.extend(args);

        let body = self.body.clone();
        let factory: CoroutineFactory = Box::new(move |cx: TaskContext| body(cx, full_args));
        let meta = InstanceMeta {
            task_name: self.core.name.clone(),
            host: self.core.host.clone(),
            reporter: self.core.reporter.clone(),
        };
        let instance = TaskInstance::new(meta, perform_type, factory);

        debug!(
            "Task `{}` performed instance {} ({:?})",
            self.core.name,
            instance.id(),
            perform_type
        );
        self.slot
            .get_or_create()
            .schedule(instance.erase(), self.core.clone());
        instance
    }

    /// A task with `args` prepended to every perform.
    ///
    /// It gets its own counters and its own scheduler, created on first use
    /// from the current modifiers. Inside a group it still shares the group's.
    pub fn curry(&self, args: Vec<A>) -> Task<A, T> {
        let slot = if self.grouped {
            self.slot.clone()
        } else {
            SchedulerSlot::new(self.slot.modifiers())
        };
        self.derive(args, slot)
    }

    /// Like `curry`, but performing through this task's scheduler.
    pub fn curry_shared(&self, args: Vec<A>) -> Task<A, T> {
        self.derive(args, self.slot.clone())
    }

    fn derive(&self, args: Vec<A>, slot: SchedulerSlot) -> Task<A, T> {
        let mut curried = (*self.curried).clone();
        curried.extend(args);

        Task {
            core: Rc::new(self.core.derive()),
            body: self.body.clone(),
            curried: Rc::new(curried),
            slot,
            grouped: self.grouped,
            #[cfg(feature = "status-report")]
            status_reporter: self.status_reporter.clone(),
            _output: PhantomData,
        }
    }

    pub fn restartable(&self) -> Result<&Self, TaskError> {
        self.modify(|m| m.set_policy(BufferPolicy::Restartable))
    }

    pub fn enqueue(&self) -> Result<&Self, TaskError> {
        self.modify(|m| m.set_policy(BufferPolicy::Enqueue))
    }

    pub fn drop(&self) -> Result<&Self, TaskError> {
        self.modify(|m| m.set_policy(BufferPolicy::Drop))
    }

    pub fn keep_latest(&self) -> Result<&Self, TaskError> {
        self.modify(|m| m.set_policy(BufferPolicy::KeepLatest))
    }

    pub fn set_max_concurrency(&self, max_concurrency: usize) -> Result<&Self, TaskError> {
        if max_concurrency == 0 {
            return Err(TaskError::ZeroConcurrency);
        }
        self.modify(|m| m.max_concurrency = Some(max_concurrency))
    }

    fn modify(&self, f: impl FnOnce(&mut Modifiers)) -> Result<&Self, TaskError> {
        if self.grouped {
            return Err(TaskError::ModifierMixedWithGroup {
                task: self.core.name.to_string(),
            });
        }
        if self.slot.is_created() {
            return Err(TaskError::ModifierAfterPerform);
        }

        let mut modifiers = self.slot.modifiers();
        f(&mut modifiers);
        self.slot.set_modifiers(modifiers);
        Ok(self)
    }

    pub fn policy(&self) -> BufferPolicy {
        self.slot.modifiers().policy
    }

    pub fn max_concurrency(&self) -> usize {
        self.slot.modifiers().effective_max_concurrency()
    }

    /// The scheduler, once the first perform created it.
    pub fn scheduler(&self) -> Option<Scheduler> {
        self.slot.get()
    }

    /// Cancel this task's queued and running instances.
    pub fn cancel_all(&self) {
        self.cancel_all_with(".cancelAll() was explicitly called on the Task");
    }

    pub fn cancel_all_with(&self, reason: &str) {
        if let Some(scheduler) = self.slot.get() {
            scheduler.cancel_all(reason, Some(self.core.id));
        }
    }

    pub fn num_running(&self) -> usize {
        self.core.num_running.get()
    }

    pub fn num_queued(&self) -> usize {
        self.core.num_queued.get()
    }

    pub fn is_running(&self) -> bool {
        self.num_running() > 0
    }

    pub fn is_queued(&self) -> bool {
        self.num_queued() > 0
    }

    pub fn is_idle(&self) -> bool {
        !self.is_running() && !self.is_queued()
    }

    pub fn state(&self) -> TaskState {
        TaskState::from_counts(self.num_running(), self.num_queued())
    }

    pub fn perform_count(&self) -> u64 {
        self.core.perform_count.get()
    }

    fn pointer(
        &self,
        pick: impl FnOnce(&LastPointers) -> Option<AnyInstance>,
    ) -> Option<TaskInstance<T>> {
        pick(&self.core.last.borrow()).and_then(|instance| instance.downcast())
    }

    /// The most recently started instance.
    pub fn last(&self) -> Option<TaskInstance<T>> {
        self.last_started()
    }

    pub fn last_started(&self) -> Option<TaskInstance<T>> {
        self.pointer(|last| last.started.clone())
    }

    pub fn last_performed(&self) -> Option<TaskInstance<T>> {
        self.pointer(|last| last.performed.clone())
    }

    /// The most recently started instance that is still running.
    pub fn last_running(&self) -> Option<TaskInstance<T>> {
        self.pointer(|last| last.running.clone())
    }

    pub fn last_successful(&self) -> Option<TaskInstance<T>> {
        self.pointer(|last| last.successful.clone())
    }

    pub fn last_errored(&self) -> Option<TaskInstance<T>> {
        self.pointer(|last| last.errored.clone())
    }

    pub fn last_canceled(&self) -> Option<TaskInstance<T>> {
        self.pointer(|last| last.canceled.clone())
    }

    /// The most recently finalized instance, whatever its outcome.
    pub fn last_complete(&self) -> Option<TaskInstance<T>> {
        self.pointer(|last| last.complete.clone())
    }

    /// Errored or canceled.
    pub fn last_incomplete(&self) -> Option<TaskInstance<T>> {
        self.pointer(|last| last.incomplete.clone())
    }

    /// Lifecycle events of this task's instances, if enabled on the builder.
    #[cfg(feature = "status-report")]
    pub fn status_reporter(&self) -> Option<StatusReporter> {
        self.status_reporter.clone()
    }
}

impl<A, T> std::fmt::Debug for Task<A, T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Task")
            .field("id", &self.core.id)
            .field("name", &self.core.name)
            .field("num_running", &self.core.num_running.get())
            .field("num_queued", &self.core.num_queued.get())
            .finish()
    }
}

/// Builder for [`Task`].
///
/// # Example
///
/// ```
/// use task_concurrency::prelude::*;
///
/// let search = TaskBuilder::default()
///     .set_name("search")
///     .restartable()
///     .spawn_async(|cx: TaskContext, args: Vec<String>| async move {
///         cx.sleep(Duration::from_millis(200)).await?;
///         Ok(args.join(" "))
///     })
///     .unwrap();
///
/// assert_eq!(search.max_concurrency(), 1);
/// assert!(search.is_idle());
/// ```
#[derive(Default)]
pub struct TaskBuilder {
    name: Option<String>,
    host: Option<Rc<dyn TaskHost>>,
    group: Option<TaskGroup>,
    modifiers: Modifiers,
    zero_concurrency: bool,
    #[cfg(feature = "status-report")]
    status_report: bool,
}

impl TaskBuilder {
    pub fn set_name(&mut self, name: &str) -> &mut Self {
        self.name = Some(name.to_string());
        self
    }

    /// The context the task is defined in.
    pub fn set_host(&mut self, host: Rc<dyn TaskHost>) -> &mut Self {
        self.host = Some(host);
        self
    }

    /// Perform through `group`'s scheduler and count towards it.
    pub fn set_group(&mut self, group: &TaskGroup) -> &mut Self {
        self.group = Some(group.clone());
        self
    }

    /// Cancel the running instance when a new one is performed.
    pub fn restartable(&mut self) -> &mut Self {
        self.modifiers.set_policy(BufferPolicy::Restartable);
        self
    }

    /// Queue new instances behind the running ones.
    pub fn enqueue(&mut self) -> &mut Self {
        self.modifiers.set_policy(BufferPolicy::Enqueue);
        self
    }

    /// Drop new instances while at the cap.
    pub fn drop(&mut self) -> &mut Self {
        self.modifiers.set_policy(BufferPolicy::Drop);
        self
    }

    /// Keep only the newest instance waiting while at the cap.
    pub fn keep_latest(&mut self) -> &mut Self {
        self.modifiers.set_policy(BufferPolicy::KeepLatest);
        self
    }

    pub fn set_max_concurrency(&mut self, max_concurrency: usize) -> &mut Self {
        self.zero_concurrency = max_concurrency == 0;
        self.modifiers.max_concurrency = Some(max_concurrency);
        self
    }

    /// Publish lifecycle events, see `Task::status_reporter`.
    #[cfg(feature = "status-report")]
    pub fn enable_status_report(&mut self) -> &mut Self {
        self.status_report = true;
        self
    }

    /// Build a task around an `async` body.
    pub fn spawn_async<A, T, F, Fut>(&mut self, body: F) -> Result<Task<A, T>, TaskError>
    where
        A: Clone + 'static,
        T: Clone + 'static,
        F: Fn(TaskContext, Vec<A>) -> Fut + 'static,
        Fut: Future<Output = AnyResult<T>> + 'static,
    {
        let body = Rc::new(body);
        self.spawn_coroutine(move |cx: TaskContext, args: Vec<A>| {
            let body = body.clone();
            AsyncCoroutine::new(cx, move |cx| body(cx, args))
        })
    }

    /// Build a task around a hand-written coroutine.
    pub fn spawn_coroutine<A, T, F, C>(&mut self, body: F) -> Result<Task<A, T>, TaskError>
    where
        A: Clone + 'static,
        T: Clone + 'static,
        F: Fn(TaskContext, Vec<A>) -> C + 'static,
        C: Coroutine + 'static,
    {
        let id = next_id();
        let name = self
            .name
            .clone()
            .unwrap_or_else(|| format!("task-{}", id));

        if self.zero_concurrency {
            return Err(TaskError::ZeroConcurrency);
        }
        if self.group.is_some() && self.modifiers.has_used_modifier() {
            return Err(TaskError::ModifierMixedWithGroup { task: name });
        }

        let (reporter, status_reporter) = self.reporter();
        let core = TaskCore {
            id,
            name: Rc::from(name),
            host: self.host.clone(),
            group: self.group.as_ref().map(|group| group.core.clone()),
            num_running: Cell::new(0),
            num_queued: Cell::new(0),
            perform_count: Cell::new(0),
            seen: Cell::new(0),
            last: RefCell::new(LastPointers::default()),
            reporter,
        };
        let slot = match &self.group {
            Some(group) => group.slot.clone(),
            None => SchedulerSlot::new(self.modifiers),
        };
        let body: Body<A> = Rc::new(move |cx: TaskContext, args: Vec<A>| {
            Box::new(body(cx, args)) as Box<dyn Coroutine>
        });

        #[cfg(not(feature = "status-report"))]
        let _ = status_reporter;

        Ok(Task {
            core: Rc::new(core),
            body,
            curried: Rc::new(Vec::new()),
            slot,
            grouped: self.group.is_some(),
            #[cfg(feature = "status-report")]
            status_reporter,
            _output: PhantomData,
        })
    }

    #[cfg(feature = "status-report")]
    fn reporter(&self) -> (StatusSink, Option<StatusReporter>) {
        if self.status_report {
            let (sink, reporter) = StatusSink::channel();
            (sink, Some(reporter))
        } else {
            (StatusSink::default(), None)
        }
    }

    #[cfg(not(feature = "status-report"))]
    fn reporter(&self) -> (StatusSink, Option<()>) {
        (StatusSink::default(), None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn echo(builder: &mut TaskBuilder) -> Result<Task<u32, Vec<u32>>, TaskError> {
        builder.spawn_async(|_cx: TaskContext, args: Vec<u32>| async move { Ok(args) })
    }

    #[test]
    fn policy_modifier_defaults_cap_to_one() {
        let task = echo(&mut TaskBuilder::default()).expect("valid task");
        assert_eq!(task.policy(), BufferPolicy::Enqueue);
        assert_eq!(task.max_concurrency(), usize::MAX);

        task.keep_latest().expect("not performed yet");
        assert_eq!(task.policy(), BufferPolicy::KeepLatest);
        assert_eq!(task.max_concurrency(), 1);

        task.set_max_concurrency(3).expect("not performed yet");
        assert_eq!(task.max_concurrency(), 3);
        assert!(matches!(
            task.set_max_concurrency(0),
            Err(TaskError::ZeroConcurrency)
        ));
    }

    #[test]
    fn grouped_tasks_reject_modifiers() {
        let group = TaskGroupBuilder::default()
            .set_name("group")
            .build()
            .expect("valid group");

        let built = echo(TaskBuilder::default().set_group(&group).drop());
        assert!(matches!(
            built,
            Err(TaskError::ModifierMixedWithGroup { .. })
        ));

        let task = echo(TaskBuilder::default().set_name("member").set_group(&group))
            .expect("valid task");
        match task.restartable() {
            Err(TaskError::ModifierMixedWithGroup { task }) => assert_eq!(task, "member"),
            other => panic!("unexpected {:?}", other.map(|_| ())),
        }
    }

    #[test]
    fn curry_prepends_and_keeps_its_own_counters() {
        let task = echo(TaskBuilder::default().set_name("echo")).expect("valid task");
        let curried = task.curry(vec![1, 2]).curry(vec![3]);

        assert_eq!(curried.curried_args(), &[1, 2, 3]);
        assert_eq!(curried.name(), "echo");
        assert_ne!(curried.id(), task.id());
        assert!(task.curried_args().is_empty());
    }
}
