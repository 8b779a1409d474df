//! Admission control for one task (or one task group).
//!
//! The scheduler owns the ordered active and queued lists. Both are mutated
//! only inside `flush` and `cancel_all`, and no list borrow is ever held while
//! an instance is started or canceled.

use crate::prelude::*;

use crate::task::task::TaskCore;

use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::rc::Rc;

/// Most recent instance per category.
#[derive(Clone, Debug, Default)]
pub(crate) struct LastPointers {
    pub(crate) performed: Option<AnyInstance>,
    pub(crate) started: Option<AnyInstance>,
    pub(crate) running: Option<AnyInstance>,
    pub(crate) successful: Option<AnyInstance>,
    pub(crate) errored: Option<AnyInstance>,
    pub(crate) canceled: Option<AnyInstance>,
    pub(crate) complete: Option<AnyInstance>,
    pub(crate) incomplete: Option<AnyInstance>,
}

impl LastPointers {
    fn record_performed(&mut self, instance: &AnyInstance) {
        self.performed = Some(instance.clone());
    }

    fn record_started(&mut self, instance: &AnyInstance) {
        self.started = Some(instance.clone());
        self.running = Some(instance.clone());
    }

    fn record_finished(&mut self, instance: &AnyInstance, still_running: Option<AnyInstance>) {
        match instance.completion() {
            CompletionState::Pending => {}
            CompletionState::Success => self.successful = Some(instance.clone()),
            CompletionState::Error => {
                self.errored = Some(instance.clone());
                self.incomplete = Some(instance.clone());
            }
            CompletionState::Cancel => {
                self.canceled = Some(instance.clone());
                self.incomplete = Some(instance.clone());
            }
        }
        if instance.completion() != CompletionState::Pending {
            self.complete = Some(instance.clone());
        }

        if self
            .running
            .as_ref()
            .map_or(false, |running| running.same(instance))
        {
            self.running = still_running;
        }
    }
}

#[derive(Clone)]
pub(crate) struct Entry {
    pub(crate) instance: AnyInstance,
    pub(crate) core: Rc<TaskCore>,
}

#[derive(Default)]
struct Lists {
    active: Vec<Entry>,
    queued: VecDeque<Entry>,
}

struct SchedulerInner {
    id: u64,
    policy: BufferPolicy,
    max_concurrency: usize,
    lists: RefCell<Lists>,
    last: RefCell<LastPointers>,
    perform_count: Cell<u64>,
}

/// Admission controller applying a [`BufferPolicy`] under a concurrency cap.
#[derive(Clone)]
pub struct Scheduler {
    inner: Rc<SchedulerInner>,
}

impl Scheduler {
    pub(crate) fn new(policy: BufferPolicy, max_concurrency: usize) -> Self {
        let id = next_id();
        trace!(
            "scheduler {} created: {:?} with max concurrency {}",
            id,
            policy,
            max_concurrency
        );

        Scheduler {
            inner: Rc::new(SchedulerInner {
                id,
                policy,
                max_concurrency,
                lists: RefCell::new(Lists::default()),
                last: RefCell::new(LastPointers::default()),
                perform_count: Cell::new(0),
            }),
        }
    }

    pub fn policy(&self) -> BufferPolicy {
        self.inner.policy
    }

    pub fn max_concurrency(&self) -> usize {
        self.inner.max_concurrency
    }

    /// Instances admitted and not yet pruned by a flush.
    pub fn num_active(&self) -> usize {
        self.inner.lists.borrow().active.len()
    }

    pub fn num_queued(&self) -> usize {
        self.inner.lists.borrow().queued.len()
    }

    pub fn perform_count(&self) -> u64 {
        self.inner.perform_count.get()
    }

    pub(crate) fn last(&self) -> LastPointers {
        self.inner.last.borrow().clone()
    }

    /// Queue `instance` and admit what the policy allows.
    pub(crate) fn schedule(&self, instance: AnyInstance, core: Rc<TaskCore>) {
        self.inner.perform_count.set(self.inner.perform_count.get() + 1);
        core.perform_count.set(core.perform_count.get() + 1);
        core.num_queued.set(core.num_queued.get() + 1);

        self.inner.last.borrow_mut().record_performed(&instance);
        core.last.borrow_mut().record_performed(&instance);
        core.reporter
            .report(Lifecycle::Performed, &core.name, instance.id());

        let scheduler = Rc::downgrade(&self.inner);
        let finished = instance.downgrade();
        let owner = core.clone();
        instance.on_finalize(Box::new(move || {
            if let (Some(inner), Some(instance)) = (scheduler.upgrade(), finished.upgrade()) {
                Scheduler { inner }.instance_finished(&AnyInstance(instance), &owner);
            }
        }));

        self.inner
            .lists
            .borrow_mut()
            .queued
            .push_back(Entry { instance, core });
        self.flush();
    }

    pub(crate) fn flush(&self) {
        let generation = next_id();
        let span = trace_span!("scheduler_flush", scheduler = self.inner.id, generation);
        let _entered = span.enter();

        let policy = self.inner.policy;
        let (withdrawn, dropped, preempted, admitted, mut touched) = {
            let mut lists = self.inner.lists.borrow_mut();
            let Lists { active, queued } = &mut *lists;
            let mut touched = Vec::new();

            active.retain(|entry| {
                let finished = entry.instance.is_finished();
                if finished {
                    touched.push(entry.core.clone());
                }
                !finished
            });

            // Canceled by hand while waiting, they never got a slot.
            let mut withdrawn = Vec::new();
            queued.retain(|entry| {
                let finished = entry.instance.is_finished();
                if finished {
                    withdrawn.push(entry.clone());
                }
                !finished
            });

            let admission = policy.admit(
                active.as_slice(),
                queued.make_contiguous(),
                self.inner.max_concurrency,
            );
            active.extend(queued.drain(..admission.promote));
            let dropped: Vec<Entry> = queued.drain(..admission.cancel_queued).collect();
            let preempted: Vec<Entry> =
                active.iter().take(admission.cancel_active).cloned().collect();
            let admitted: Vec<Entry> = active
                .iter()
                .filter(|entry| !entry.instance.has_started())
                .cloned()
                .collect();

            touched.extend(
                active
                    .iter()
                    .chain(queued.iter())
                    .map(|entry| entry.core.clone()),
            );
            (withdrawn, dropped, preempted, admitted, touched)
        };

        for entry in withdrawn.iter().chain(dropped.iter()) {
            entry.core.num_queued.set(entry.core.num_queued.get().saturating_sub(1));
            entry.instance.cancel_with(policy.cancel_reason());
            self.record_finished(entry);
            touched.push(entry.core.clone());
        }

        for entry in preempted {
            entry.instance.cancel_with(policy.cancel_reason());
        }

        for entry in admitted {
            self.start_instance(entry);
        }

        flush_task_counts(&touched, generation);
    }

    fn start_instance(&self, entry: Entry) {
        let Entry { instance, core } = entry;
        core.num_queued.set(core.num_queued.get().saturating_sub(1));
        core.num_running.set(core.num_running.get() + 1);

        self.inner.last.borrow_mut().record_started(&instance);
        core.last.borrow_mut().record_started(&instance);

        instance.start();
    }

    /// Finalize hook of every scheduled instance.
    ///
    /// Instances that never started are accounted for by the flush that
    /// removes them from the queue.
    fn instance_finished(&self, instance: &AnyInstance, core: &Rc<TaskCore>) {
        if instance.has_started() {
            core.num_running.set(core.num_running.get().saturating_sub(1));
            self.record_finished(&Entry {
                instance: instance.clone(),
                core: core.clone(),
            });
        }

        let scheduler = Rc::downgrade(&self.inner);
        defer(move || {
            if let Some(inner) = scheduler.upgrade() {
                Scheduler { inner }.flush();
            }
        });
    }

    fn record_finished(&self, entry: &Entry) {
        let (latest, latest_of_task) = {
            let lists = self.inner.lists.borrow();
            let running = |candidate: &&Entry| {
                candidate.instance.has_started()
                    && candidate.instance.is_running()
                    && !candidate.instance.same(&entry.instance)
            };
            let latest = lists
                .active
                .iter()
                .rev()
                .find(running)
                .map(|e| e.instance.clone());
            let latest_of_task = lists
                .active
                .iter()
                .rev()
                .filter(|e| Rc::ptr_eq(&e.core, &entry.core))
                .find(running)
                .map(|e| e.instance.clone());
            (latest, latest_of_task)
        };

        self.inner
            .last
            .borrow_mut()
            .record_finished(&entry.instance, latest);
        entry
            .core
            .last
            .borrow_mut()
            .record_finished(&entry.instance, latest_of_task);
    }

    /// Cancel every queued and active instance, optionally only those of one task.
    ///
    /// Queued instances are removed without ever starting; active ones unwind
    /// in place and leave through the usual finalize path.
    pub(crate) fn cancel_all(&self, reason: &str, task_id: Option<u64>) {
        let matches = |entry: &Entry| task_id.map_or(true, |id| entry.core.id == id);

        let (dropped, active) = {
            let mut lists = self.inner.lists.borrow_mut();
            let mut dropped = Vec::new();
            lists.queued.retain(|entry| {
                if matches(entry) {
                    dropped.push(entry.clone());
                    false
                } else {
                    true
                }
            });
            let active: Vec<Entry> = lists
                .active
                .iter()
                .filter(|entry| matches(*entry))
                .cloned()
                .collect();
            (dropped, active)
        };

        debug!(
            "scheduler {} canceling {} queued and {} active instances",
            self.inner.id,
            dropped.len(),
            active.len()
        );

        let mut touched = Vec::with_capacity(dropped.len() + active.len());
        for entry in &dropped {
            entry.core.num_queued.set(entry.core.num_queued.get().saturating_sub(1));
            entry.instance.cancel_with(reason);
            self.record_finished(entry);
            touched.push(entry.core.clone());
        }
        for entry in &active {
            entry.instance.cancel_with(reason);
            touched.push(entry.core.clone());
        }

        flush_task_counts(&touched, next_id());
    }
}

impl std::fmt::Debug for Scheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Scheduler")
            .field("id", &self.inner.id)
            .field("policy", &self.inner.policy)
            .field("max_concurrency", &self.inner.max_concurrency)
            .finish()
    }
}

/// Push each touched task's counts up its group chain, once per generation.
fn flush_task_counts(touched: &[Rc<TaskCore>], generation: u64) {
    for core in touched {
        if core.seen.replace(generation) == generation {
            continue;
        }
        if let Some(group) = &core.group {
            group.record_member(core.id, core.num_running.get(), core.num_queued.get());
        }
    }
}

/// A lazily created scheduler, shared by every task wired to it.
#[derive(Clone)]
pub(crate) struct SchedulerSlot {
    scheduler: Rc<RefCell<Option<Scheduler>>>,
    modifiers: Rc<Cell<Modifiers>>,
}

impl SchedulerSlot {
    pub(crate) fn new(modifiers: Modifiers) -> Self {
        SchedulerSlot {
            scheduler: Rc::new(RefCell::new(None)),
            modifiers: Rc::new(Cell::new(modifiers)),
        }
    }

    pub(crate) fn modifiers(&self) -> Modifiers {
        self.modifiers.get()
    }

    pub(crate) fn set_modifiers(&self, modifiers: Modifiers) {
        self.modifiers.set(modifiers);
    }

    pub(crate) fn is_created(&self) -> bool {
        self.scheduler.borrow().is_some()
    }

    pub(crate) fn get(&self) -> Option<Scheduler> {
        self.scheduler.borrow().clone()
    }

    pub(crate) fn get_or_create(&self) -> Scheduler {
        let modifiers = self.modifiers.get();
        self.scheduler
            .borrow_mut()
            .get_or_insert_with(|| {
                Scheduler::new(modifiers.policy, modifiers.effective_max_concurrency())
            })
            .clone()
    }
}
