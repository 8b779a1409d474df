//! # Buffer policies
//!
//! A buffer policy is consulted by the scheduler on every admission event.
//! Given the active list, the queued list and the concurrency cap it decides
//! which queued instances become active and which instances are canceled.
//!
//! ## Variants
//! - `Enqueue`: never cancels, promotes the oldest queued instances until the cap is reached.
//! - `Drop`: like `Enqueue`, but whatever does not fit is dropped instead of queued.
//! - `Restartable`: a new instance preempts the oldest active ones.
//! - `KeepLatest`: like `Drop`, but the newest queued instance is kept as the next one to run.
//!
//! ## Invariants
//! - Policies are pure: the decision depends only on list lengths and the cap.
//! - Promotion always takes the oldest queued instances first.
//! - Except for `Restartable`, the active list never grows past the cap.

/// Decision of a policy for one flush.
///
/// The scheduler applies it in field order: promote from the front of the
/// queue, cancel from the front of what remains queued, then cancel from the
/// front (oldest) of the active list.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Admission {
    /// Queued instances moved to the active list.
    pub promote: usize,
    /// Queued instances canceled after promotion.
    pub cancel_queued: usize,
    /// Active instances canceled after promotion.
    pub cancel_active: usize,
}

/// Policy controlling what happens when a task is performed while busy.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BufferPolicy {
    /// Queue the instance (FIFO order).
    ///
    /// Use when:
    /// - All invocations must execute
    /// - Order matters
    Enqueue,

    /// Drop the instance if the task is already at its cap.
    ///
    /// Use when:
    /// - Redundant work should be avoided
    /// - Example: a submit button pressed twice
    Drop,

    /// Cancel the running instance and start the new one immediately.
    ///
    /// Use when:
    /// - A new invocation invalidates the old one
    /// - Example: search-as-you-type
    Restartable,

    /// Drop all but the latest pending instance.
    ///
    /// Use when:
    /// - Only the newest request matters, but it must not be lost
    /// - Example: autosave
    KeepLatest,
}

impl Default for BufferPolicy {
    /// Returns [`BufferPolicy::Enqueue`].
    fn default() -> Self {
        BufferPolicy::Enqueue
    }
}

impl BufferPolicy {
    /// Decide admission for the current lists under `max_concurrency`.
    pub fn admit<I>(&self, active: &[I], queued: &[I], max_concurrency: usize) -> Admission {
        let open_slots = max_concurrency.saturating_sub(active.len());
        let saturate = open_slots.min(queued.len());
        let left_queued = queued.len() - saturate;

        match self {
            BufferPolicy::Enqueue => Admission {
                promote: saturate,
                ..Admission::default()
            },
            BufferPolicy::Drop => Admission {
                promote: saturate,
                cancel_queued: left_queued,
                cancel_active: 0,
            },
            BufferPolicy::KeepLatest => Admission {
                promote: saturate,
                cancel_queued: left_queued.saturating_sub(1),
                cancel_active: 0,
            },
            BufferPolicy::Restartable => {
                let total = active.len() + queued.len();
                Admission {
                    promote: queued.len(),
                    cancel_queued: 0,
                    cancel_active: total.saturating_sub(max_concurrency),
                }
            }
        }
    }

    /// Why an instance canceled by this policy was canceled.
    pub fn cancel_reason(&self) -> &'static str {
        match self {
            BufferPolicy::Enqueue => "it belongs to an 'enqueue' Task that was rescheduled",
            BufferPolicy::Drop => "it belongs to a 'drop' Task that was already running",
            BufferPolicy::Restartable => {
                "it belongs to a 'restartable' Task that was .perform()ed again"
            }
            BufferPolicy::KeepLatest => {
                "it belongs to a 'keepLatest' Task that was already running"
            }
        }
    }
}

/// Policy and cap as configured by the task modifiers.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub(crate) struct Modifiers {
    pub(crate) policy: BufferPolicy,
    pub(crate) has_set_policy: bool,
    pub(crate) max_concurrency: Option<usize>,
}

impl Modifiers {
    pub(crate) fn set_policy(&mut self, policy: BufferPolicy) {
        self.policy = policy;
        self.has_set_policy = true;
    }

    pub(crate) fn has_used_modifier(&self) -> bool {
        self.has_set_policy || self.max_concurrency.is_some()
    }

    /// Any explicit policy without an explicit cap means one at a time.
    pub(crate) fn effective_max_concurrency(&self) -> usize {
        match self.max_concurrency {
            Some(n) => n,
            None if self.has_set_policy => 1,
            None => usize::MAX,
        }
    }
}
