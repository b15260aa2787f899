//! Reactive engine seam - the capability the binding consumes.
//!
//! The observable engine itself (dependency tracking, write batching,
//! invalidation scheduling) lives outside this crate. The binding only
//! needs three things from it:
//! - create a reaction whose callback fires when tracked reads change
//! - run a function inside that reaction's tracking scope
//! - a global suspend/resume-tracking toggle (used by static rendering)
//!
//! One engine is installed per thread with [`set_engine`] and consumed by
//! every observer component on that thread. The [`testkit`](crate::testkit)
//! module ships a reference implementation.

use std::cell::RefCell;
use std::rc::Rc;

// =============================================================================
// Capability traits
// =============================================================================

/// Tracked computation owned by the engine.
///
/// The engine re-subscribes the reaction to exactly the observable reads
/// performed by the latest [`track`](EngineReaction::track) run, and invokes
/// the invalidation callback at most once per cycle after any of those
/// dependencies change.
pub trait EngineReaction {
    /// Run `body` inside this reaction's tracking scope.
    ///
    /// Reads recorded during the run replace the previous dependency set.
    /// Must be a no-op on a disposed reaction.
    fn track(&self, body: &mut dyn FnMut());

    /// Unsubscribe from all dependencies. Idempotent.
    fn dispose(&self);

    /// Whether [`dispose`](EngineReaction::dispose) has run.
    fn is_disposed(&self) -> bool;
}

/// The observable engine capability.
pub trait ReactiveEngine {
    /// Create a reaction whose `invalidate` callback fires when any
    /// dependency recorded by its latest tracked run changes.
    ///
    /// `invalidate` signals staleness only - re-execution is the caller's
    /// decision.
    fn create_reaction(&self, invalidate: Rc<dyn Fn()>) -> Rc<dyn EngineReaction>;

    /// Stop recording reads globally until [`resume_tracking`] is called.
    ///
    /// Suspensions nest; the engine resumes tracking once every suspend has
    /// been matched by a resume.
    ///
    /// [`resume_tracking`]: ReactiveEngine::resume_tracking
    fn suspend_tracking(&self);

    /// Undo one [`suspend_tracking`](ReactiveEngine::suspend_tracking) call.
    fn resume_tracking(&self);
}

// =============================================================================
// Installed engine
// =============================================================================

thread_local! {
    static ENGINE: RefCell<Option<Rc<dyn ReactiveEngine>>> = const { RefCell::new(None) };
}

/// Install the engine observer components on this thread will use.
///
/// Replaces any previously installed engine. Reactions created against the
/// old engine keep working until disposed; only new reactions bind to the
/// new engine.
pub fn set_engine(engine: Rc<dyn ReactiveEngine>) {
    ENGINE.with(|slot| {
        *slot.borrow_mut() = Some(engine);
    });
}

/// The currently installed engine, if any.
pub fn engine() -> Option<Rc<dyn ReactiveEngine>> {
    ENGINE.with(|slot| slot.borrow().clone())
}

/// Remove the installed engine (for tests).
pub fn reset_engine() {
    ENGINE.with(|slot| {
        *slot.borrow_mut() = None;
    });
}

/// Run `f` with read tracking suspended on the installed engine.
///
/// Used by static rendering so a plain render pass does not leak
/// dependencies into an enclosing tracked scope. A missing engine means
/// nothing is tracking; `f` just runs.
pub fn with_tracking_suspended<R>(f: impl FnOnce() -> R) -> R {
    match engine() {
        Some(engine) => {
            engine.suspend_tracking();
            let result = f();
            engine.resume_tracking();
            result
        }
        None => f(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    struct NoopReaction;

    impl EngineReaction for NoopReaction {
        fn track(&self, body: &mut dyn FnMut()) {
            body();
        }
        fn dispose(&self) {}
        fn is_disposed(&self) -> bool {
            false
        }
    }

    struct CountingEngine {
        suspends: Cell<u32>,
        resumes: Cell<u32>,
    }

    impl ReactiveEngine for Rc<CountingEngine> {
        fn create_reaction(&self, _invalidate: Rc<dyn Fn()>) -> Rc<dyn EngineReaction> {
            Rc::new(NoopReaction)
        }
        fn suspend_tracking(&self) {
            self.suspends.set(self.suspends.get() + 1);
        }
        fn resume_tracking(&self) {
            self.resumes.set(self.resumes.get() + 1);
        }
    }

    #[test]
    fn test_install_and_reset() {
        reset_engine();
        assert!(engine().is_none());

        let counting = Rc::new(CountingEngine { suspends: Cell::new(0), resumes: Cell::new(0) });
        set_engine(Rc::new(counting.clone()));
        assert!(engine().is_some());

        reset_engine();
        assert!(engine().is_none());
    }

    #[test]
    fn test_suspension_brackets_the_call() {
        reset_engine();
        let counting = Rc::new(CountingEngine { suspends: Cell::new(0), resumes: Cell::new(0) });
        set_engine(Rc::new(counting.clone()));

        let out = with_tracking_suspended(|| 7);
        assert_eq!(out, 7);
        assert_eq!(counting.suspends.get(), 1);
        assert_eq!(counting.resumes.get(), 1);

        reset_engine();
    }

    #[test]
    fn test_suspension_without_engine_is_plain_call() {
        reset_engine();
        assert_eq!(with_tracking_suspended(|| 3), 3);
    }
}
