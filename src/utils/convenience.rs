use crate::prelude::*;

use std::sync::atomic::{AtomicU64, Ordering};

static NEXT_ID: AtomicU64 = AtomicU64::new(1);

pub mod functions {
    use super::*;

    /// Unique id for tasks, instances, schedulers and flush generations.
    #[inline(always)]
    pub fn next_id() -> u64 {
        NEXT_ID.fetch_add(1, Ordering::Relaxed)
    }

    #[inline(always)]
    ///convert cleanup of impl Dispose to a `Disposer`.
    pub fn create_disposer(disposer: impl Dispose + 'static) -> Disposer {
        Box::new(disposer) as Disposer
    }

    #[inline(always)]
    ///Create a `Disposer` from a closure.
    pub fn create_fn_disposer(f: impl FnOnce() + 'static) -> Disposer {
        create_disposer(FnDisposer::new(f))
    }

    #[inline(always)]
    ///Create a `Disposer` from a closure that can fail.
    pub fn create_try_fn_disposer(f: impl FnOnce() -> AnyResult<()> + 'static) -> Disposer {
        create_disposer(TryFnDisposer::new(f))
    }

    /// A custom suspension point and the handle that releases it.
    ///
    /// The body that yields the `Yieldable` resumes with `()` once the
    /// `Signal` fires.
    pub fn create_signal() -> (Signal, Yieldable) {
        let slot = std::rc::Rc::new(std::cell::RefCell::new(SignalState::Idle));
        let handler_slot = slot.clone();
        let yieldable = Yieldable::custom(move |resumer: Resumer| -> AnyResult<Option<Disposer>> {
            let mut state = handler_slot.borrow_mut();
            match std::mem::replace(&mut *state, SignalState::Idle) {
                SignalState::Fired => {
                    drop(state);
                    resumer.resume(());
                }
                _ => *state = SignalState::Waiting(resumer),
            }
            Ok(None)
        });
        (Signal { slot }, yieldable)
    }

    enum SignalState {
        Idle,
        Waiting(Resumer),
        Fired,
    }

    /// The firing side of [`create_signal`].
    pub struct Signal {
        slot: std::rc::Rc<std::cell::RefCell<SignalState>>,
    }

    impl Signal {
        /// Resume the suspended body, or let it pass straight through if it
        /// has not suspended yet. Firing twice has no further effect.
        pub fn fire(&self) {
            let waiting = std::mem::replace(&mut *self.slot.borrow_mut(), SignalState::Fired);
            if let SignalState::Waiting(resumer) = waiting {
                resumer.resume(());
            }
        }
    }
}
