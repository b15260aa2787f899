//! Reference observable engine - dependency-tracking cells.
//!
//! Semantics match what the binding's adapter expects from a real engine:
//!
//! 1. Reads performed during a tracked run replace the reaction's previous
//!    dependency set (stale subscriptions are generation-checked away).
//! 2. A write that does not change the value (by `PartialEq`) notifies
//!    nobody.
//! 3. After a change, each dependent reaction's invalidation callback fires
//!    at most once until its next tracked run.
//! 4. Disposed reactions never run their body and never receive callbacks.
//! 5. Suspensions nest; while suspended, reads record nothing.

use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};

use crate::engine::{EngineReaction, ReactiveEngine};

// =============================================================================
// Engine state
// =============================================================================

struct ReactionState {
    invalidate: RefCell<Option<Rc<dyn Fn()>>>,
    disposed: Cell<bool>,
    invalidated: Cell<bool>,
    generation: Cell<u64>,
}

struct EngineState {
    stack: RefCell<Vec<Rc<ReactionState>>>,
    suspended: Cell<u32>,
}

/// Minimal tracking engine for tests.
#[derive(Clone)]
pub struct TestEngine {
    state: Rc<EngineState>,
}

impl Default for TestEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl TestEngine {
    /// Fresh engine with no reactions and no suspension.
    pub fn new() -> Self {
        Self {
            state: Rc::new(EngineState {
                stack: RefCell::new(Vec::new()),
                suspended: Cell::new(0),
            }),
        }
    }

    /// Install this engine for observer components on the current thread.
    pub fn install(&self) {
        crate::engine::set_engine(Rc::new(self.clone()));
    }

    /// Create an observable cell tracked by this engine.
    pub fn cell<T: Clone + PartialEq + 'static>(&self, initial: T) -> ObservableCell<T> {
        ObservableCell {
            inner: Rc::new(CellInner {
                engine: self.state.clone(),
                value: RefCell::new(initial),
                subscribers: RefCell::new(Vec::new()),
            }),
        }
    }
}

// =============================================================================
// Reactions
// =============================================================================

struct TestReaction {
    state: Rc<ReactionState>,
    engine: Rc<EngineState>,
}

impl EngineReaction for TestReaction {
    fn track(&self, body: &mut dyn FnMut()) {
        if self.state.disposed.get() {
            return;
        }
        self.state.invalidated.set(false);
        self.state.generation.set(self.state.generation.get() + 1);

        self.engine.stack.borrow_mut().push(self.state.clone());
        body();
        self.engine.stack.borrow_mut().pop();
    }

    fn dispose(&self) {
        if self.state.disposed.replace(true) {
            return;
        }
        self.state.invalidate.borrow_mut().take();
    }

    fn is_disposed(&self) -> bool {
        self.state.disposed.get()
    }
}

impl ReactiveEngine for TestEngine {
    fn create_reaction(&self, invalidate: Rc<dyn Fn()>) -> Rc<dyn EngineReaction> {
        Rc::new(TestReaction {
            state: Rc::new(ReactionState {
                invalidate: RefCell::new(Some(invalidate)),
                disposed: Cell::new(false),
                invalidated: Cell::new(false),
                generation: Cell::new(0),
            }),
            engine: self.state.clone(),
        })
    }

    fn suspend_tracking(&self) {
        self.state.suspended.set(self.state.suspended.get() + 1);
    }

    fn resume_tracking(&self) {
        let current = self.state.suspended.get();
        self.state.suspended.set(current.saturating_sub(1));
    }
}

// =============================================================================
// Observable cells
// =============================================================================

struct CellInner<T> {
    engine: Rc<EngineState>,
    value: RefCell<T>,
    subscribers: RefCell<Vec<(Weak<ReactionState>, u64)>>,
}

/// Shared observable value; reads are tracked, writes notify dependents.
///
/// Clones share the same underlying cell.
pub struct ObservableCell<T: Clone + PartialEq + 'static> {
    inner: Rc<CellInner<T>>,
}

impl<T: Clone + PartialEq + 'static> Clone for ObservableCell<T> {
    fn clone(&self) -> Self {
        Self { inner: self.inner.clone() }
    }
}

impl<T: Clone + PartialEq + 'static> ObservableCell<T> {
    /// Read the value; records a dependency when a reaction is tracking.
    pub fn get(&self) -> T {
        let engine = &self.inner.engine;
        if engine.suspended.get() == 0 {
            if let Some(current) = engine.stack.borrow().last() {
                self.subscribe(current);
            }
        }
        self.inner.value.borrow().clone()
    }

    /// Write the value; equal writes are a no-op, changed writes notify
    /// every current dependent once.
    pub fn set(&self, value: T) {
        {
            let mut slot = self.inner.value.borrow_mut();
            if *slot == value {
                return;
            }
            *slot = value;
        }
        self.notify();
    }

    fn subscribe(&self, reaction: &Rc<ReactionState>) {
        let generation = reaction.generation.get();
        let mut subscribers = self.inner.subscribers.borrow_mut();
        let already = subscribers.iter().any(|(weak, r#gen)| {
            *r#gen == generation
                && weak.upgrade().is_some_and(|existing| Rc::ptr_eq(&existing, reaction))
        });
        if !already {
            subscribers.push((Rc::downgrade(reaction), generation));
        }
    }

    fn notify(&self) {
        // Snapshot, then prune: callbacks may re-enter and subscribe.
        let snapshot: Vec<(Weak<ReactionState>, u64)> =
            self.inner.subscribers.borrow().clone();

        for (weak, generation) in &snapshot {
            let Some(reaction) = weak.upgrade() else { continue };
            // Stale generation = the reaction no longer reads this cell.
            if reaction.generation.get() != *generation {
                continue;
            }
            if reaction.disposed.get() || reaction.invalidated.get() {
                continue;
            }
            reaction.invalidated.set(true);
            let callback = reaction.invalidate.borrow().clone();
            if let Some(callback) = callback {
                callback();
            }
        }

        self.inner.subscribers.borrow_mut().retain(|(weak, generation)| {
            weak.upgrade()
                .is_some_and(|reaction| reaction.generation.get() == *generation)
        });
    }

    /// Number of live subscriptions (for leak tests).
    pub fn subscriber_count(&self) -> usize {
        self.inner
            .subscribers
            .borrow()
            .iter()
            .filter(|(weak, generation)| {
                weak.upgrade().is_some_and(|reaction| {
                    !reaction.disposed.get() && reaction.generation.get() == *generation
                })
            })
            .count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tracked_read_subscribes() {
        let engine = TestEngine::new();
        let cell = engine.cell(1i32);

        let hits = Rc::new(Cell::new(0));
        let hits_in = hits.clone();
        let reaction = engine.create_reaction(Rc::new(move || hits_in.set(hits_in.get() + 1)));

        let read = cell.clone();
        reaction.track(&mut || {
            read.get();
        });
        assert_eq!(cell.subscriber_count(), 1);

        cell.set(2);
        assert_eq!(hits.get(), 1);
    }

    #[test]
    fn test_equal_write_is_silent() {
        let engine = TestEngine::new();
        let cell = engine.cell(5i32);

        let hits = Rc::new(Cell::new(0));
        let hits_in = hits.clone();
        let reaction = engine.create_reaction(Rc::new(move || hits_in.set(hits_in.get() + 1)));
        let read = cell.clone();
        reaction.track(&mut || {
            read.get();
        });

        cell.set(5);
        assert_eq!(hits.get(), 0);
    }

    #[test]
    fn test_at_most_one_invalidation_per_cycle() {
        let engine = TestEngine::new();
        let cell = engine.cell(0i32);

        let hits = Rc::new(Cell::new(0));
        let hits_in = hits.clone();
        let reaction = engine.create_reaction(Rc::new(move || hits_in.set(hits_in.get() + 1)));
        let read = cell.clone();
        reaction.track(&mut || {
            read.get();
        });

        cell.set(1);
        cell.set(2);
        assert_eq!(hits.get(), 1);

        reaction.track(&mut || {
            read.get();
        });
        cell.set(3);
        assert_eq!(hits.get(), 2);
    }

    #[test]
    fn test_retrack_replaces_dependency_set() {
        let engine = TestEngine::new();
        let a = engine.cell(0i32);
        let b = engine.cell(0i32);

        let hits = Rc::new(Cell::new(0));
        let hits_in = hits.clone();
        let reaction = engine.create_reaction(Rc::new(move || hits_in.set(hits_in.get() + 1)));

        let read_a = a.clone();
        reaction.track(&mut || {
            read_a.get();
        });

        // Second run reads only b.
        let read_b = b.clone();
        reaction.track(&mut || {
            read_b.get();
        });

        a.set(1);
        assert_eq!(hits.get(), 0, "stale subscription must not fire");
        b.set(1);
        assert_eq!(hits.get(), 1);
    }

    #[test]
    fn test_disposed_reaction_is_silent_and_inert() {
        let engine = TestEngine::new();
        let cell = engine.cell(0i32);

        let hits = Rc::new(Cell::new(0));
        let hits_in = hits.clone();
        let reaction = engine.create_reaction(Rc::new(move || hits_in.set(hits_in.get() + 1)));
        let read = cell.clone();
        reaction.track(&mut || {
            read.get();
        });

        reaction.dispose();
        cell.set(1);
        assert_eq!(hits.get(), 0);

        let mut ran = false;
        reaction.track(&mut || {
            ran = true;
        });
        assert!(!ran, "disposed reaction never re-runs its body");
    }

    #[test]
    fn test_suspension_skips_subscription() {
        let engine = TestEngine::new();
        let cell = engine.cell(0i32);

        let reaction = engine.create_reaction(Rc::new(|| {}));
        let read = cell.clone();
        let suspend_engine = engine.clone();
        reaction.track(&mut || {
            suspend_engine.suspend_tracking();
            read.get();
            suspend_engine.resume_tracking();
        });

        assert_eq!(cell.subscriber_count(), 0);
    }
}
