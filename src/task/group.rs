//! Task groups: a hierarchical aggregator with a scheduler shared by its members.
//!
//! Member tasks perform through the group's scheduler, so the group's buffer
//! policy and cap govern all of them together. After every flush, each touched
//! member's counts are written into its group, and the group's sums into its
//! parent, up to the root.

use crate::prelude::*;

use crate::task::scheduler::SchedulerSlot;

use std::cell::{Cell, RefCell};
use std::collections::BTreeMap;
use std::rc::Rc;

/// Aggregated counts of a group, shared with its members and child groups.
#[derive(Debug)]
pub(crate) struct GroupCore {
    pub(crate) id: u64,
    pub(crate) name: Rc<str>,
    parent: Option<Rc<GroupCore>>,
    contributions: RefCell<BTreeMap<u64, (usize, usize)>>,
    num_running: Cell<usize>,
    num_queued: Cell<usize>,
}

impl GroupCore {
    /// Replace one member's contribution, then refresh the sums up the chain.
    pub(crate) fn record_member(&self, member: u64, running: usize, queued: usize) {
        let (running, queued) = {
            let mut contributions = self.contributions.borrow_mut();
            if running == 0 && queued == 0 {
                contributions.remove(&member);
            } else {
                contributions.insert(member, (running, queued));
            }
            contributions
                .values()
                .fold((0, 0), |(r, q), (member_r, member_q)| (r + member_r, q + member_q))
        };

        self.num_running.set(running);
        self.num_queued.set(queued);

        if let Some(parent) = &self.parent {
            parent.record_member(self.id, running, queued);
        }
    }
}

/// A group of tasks sharing one scheduler.
///
/// # Example
///
/// ```
/// use task_concurrency::prelude::*;
///
/// let group = TaskGroupBuilder::default()
///     .set_name("uploads")
///     .enqueue()
///     .set_max_concurrency(2)
///     .build()
///     .unwrap();
///
/// assert_eq!(group.name(), "uploads");
/// assert!(group.is_idle());
/// ```
#[derive(Clone)]
pub struct TaskGroup {
    pub(crate) core: Rc<GroupCore>,
    pub(crate) slot: SchedulerSlot,
}

impl TaskGroup {
    pub fn name(&self) -> &str {
        &self.core.name
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

    /// Performs through this group's own scheduler.
    pub fn perform_count(&self) -> u64 {
        self.slot.get().map_or(0, |scheduler| scheduler.perform_count())
    }

    fn last(&self) -> LastPointers {
        self.slot
            .get()
            .map(|scheduler| scheduler.last())
            .unwrap_or_default()
    }

    /// Most recently started instance of any member.
    pub fn last_started(&self) -> Option<AnyInstance> {
        self.last().started
    }

    pub fn last_performed(&self) -> Option<AnyInstance> {
        self.last().performed
    }

    pub fn last_running(&self) -> Option<AnyInstance> {
        self.last().running
    }

    pub fn last_successful(&self) -> Option<AnyInstance> {
        self.last().successful
    }

    pub fn last_errored(&self) -> Option<AnyInstance> {
        self.last().errored
    }

    pub fn last_canceled(&self) -> Option<AnyInstance> {
        self.last().canceled
    }

    /// The most recently finalized member instance.
    pub fn last_complete(&self) -> Option<AnyInstance> {
        self.last().complete
    }

    pub fn last_incomplete(&self) -> Option<AnyInstance> {
        self.last().incomplete
    }

    /// Apply the restartable policy. Only before the first perform.
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
        if self.slot.is_created() {
            return Err(TaskError::ModifierAfterPerform);
        }
        let mut modifiers = self.slot.modifiers();
        f(&mut modifiers);
        self.slot.set_modifiers(modifiers);
        Ok(self)
    }

    /// Cancel every instance of every member with the default reason.
    pub fn cancel_all(&self) {
        self.cancel_all_with(".cancelAll() was explicitly called on the TaskGroup");
    }

    pub fn cancel_all_with(&self, reason: &str) {
        if let Some(scheduler) = self.slot.get() {
            scheduler.cancel_all(reason, None);
        }
    }
}

impl std::fmt::Debug for TaskGroup {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TaskGroup")
            .field("id", &self.core.id)
            .field("name", &self.core.name)
            .field("num_running", &self.num_running())
            .field("num_queued", &self.num_queued())
            .finish()
    }
}

/// Builder for [`TaskGroup`].
#[derive(Debug, Default, Clone)]
pub struct TaskGroupBuilder {
    name: Option<String>,
    parent: Option<Rc<GroupCore>>,
    modifiers: Modifiers,
    zero_concurrency: bool,
}

impl TaskGroupBuilder {
    pub fn set_name(&mut self, name: &str) -> &mut Self {
        self.name = Some(name.to_string());
        self
    }

    /// Nest under `parent`; this group's counts add up into it.
    pub fn set_parent(&mut self, parent: &TaskGroup) -> &mut Self {
        self.parent = Some(parent.core.clone());
        self
    }

    pub fn restartable(&mut self) -> &mut Self {
        self.modifiers.set_policy(BufferPolicy::Restartable);
        self
    }

    pub fn enqueue(&mut self) -> &mut Self {
        self.modifiers.set_policy(BufferPolicy::Enqueue);
        self
    }

    pub fn drop(&mut self) -> &mut Self {
        self.modifiers.set_policy(BufferPolicy::Drop);
        self
    }

    pub fn keep_latest(&mut self) -> &mut Self {
        self.modifiers.set_policy(BufferPolicy::KeepLatest);
        self
    }

    pub fn set_max_concurrency(&mut self, max_concurrency: usize) -> &mut Self {
        self.zero_concurrency = max_concurrency == 0;
        self.modifiers.max_concurrency = Some(max_concurrency);
        self
    }

    pub fn build(&mut self) -> Result<TaskGroup, TaskError> {
        if self.zero_concurrency {
            return Err(TaskError::ZeroConcurrency);
        }

        let id = next_id();
        let name: Rc<str> = match &self.name {
            Some(name) => Rc::from(name.as_str()),
            None => Rc::from(format!("group-{}", id)),
        };

        Ok(TaskGroup {
            core: Rc::new(GroupCore {
                id,
                name,
                parent: self.parent.clone(),
                contributions: RefCell::new(BTreeMap::new()),
                num_running: Cell::new(0),
                num_queued: Cell::new(0),
            }),
            slot: SchedulerSlot::new(self.modifiers),
        })
    }
}
