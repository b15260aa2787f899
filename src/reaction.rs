//! Reaction adapter - a render function backed by an engine reaction.
//!
//! The adapter is the bridge between "this component read these observables"
//! and "this component should re-render". It runs the render inside the
//! engine's tracking scope, caches the produced tree, and forwards
//! invalidations to a callback WITHOUT re-running anything itself: tracking
//! is decoupled from scheduling, and the lifecycle coordinator decides when
//! (and whether) a re-render actually happens.
//!
//! Disposal is idempotent and final: a disposed adapter never re-invokes its
//! render and rejects render requests with
//! [`ObserveError::DisposedReaction`].

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use bitflags::bitflags;
use tracing::debug;

use crate::engine::{self, EngineReaction};
use crate::error::ObserveError;
use crate::types::RenderError;

bitflags! {
    /// Packed adapter state.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    struct ReactionFlags: u8 {
        /// Torn down; render requests are rejected.
        const DISPOSED  = 1 << 0;
        /// Invalidation forwarded, no render completed since.
        const SCHEDULED = 1 << 1;
    }
}

/// Render function the adapter owns and re-runs under tracking.
pub type TrackedRender<V> = Box<dyn Fn() -> Result<V, RenderError>>;

// =============================================================================
// Adapter
// =============================================================================

/// A component render wrapped in an engine reaction.
pub struct ReactionAdapter<V: Clone + 'static> {
    name: Rc<str>,
    reaction: Rc<dyn EngineReaction>,
    render_fn: TrackedRender<V>,
    render_tree: RefCell<Option<V>>,
    flags: Rc<Cell<ReactionFlags>>,
}

impl<V: Clone + 'static> ReactionAdapter<V> {
    /// Wrap `render_fn` in a new engine reaction.
    ///
    /// `on_invalidate` fires at most once per invalidation cycle: after a
    /// dependency change it is forwarded a single time, and not again until
    /// the next successful [`render`](ReactionAdapter::render) re-arms it.
    /// The adapter never re-renders on its own.
    ///
    /// # Errors
    ///
    /// [`ObserveError::EngineMissing`] when no engine is installed.
    pub fn new(
        name: Rc<str>,
        render_fn: TrackedRender<V>,
        on_invalidate: Rc<dyn Fn()>,
    ) -> Result<Self, ObserveError> {
        let engine = engine::engine().ok_or(ObserveError::EngineMissing)?;

        let flags = Rc::new(Cell::new(ReactionFlags::empty()));
        let invalidate_flags = flags.clone();
        let reaction = engine.create_reaction(Rc::new(move || {
            let current = invalidate_flags.get();
            if current.intersects(ReactionFlags::DISPOSED | ReactionFlags::SCHEDULED) {
                return;
            }
            invalidate_flags.set(current | ReactionFlags::SCHEDULED);
            on_invalidate();
        }));

        debug!(component = %name, "reaction created");
        Ok(Self { name, reaction, render_fn, render_tree: RefCell::new(None), flags })
    }

    /// Run the render inside the tracking scope and cache the tree.
    ///
    /// A failed render disposes the adapter BEFORE the error is returned, so
    /// no orphaned subscription survives it; the error itself passes through
    /// unchanged.
    ///
    /// # Errors
    ///
    /// [`ObserveError::DisposedReaction`] if the adapter is disposed, or
    /// whatever the render itself produced.
    pub fn render(&self) -> Result<V, RenderError> {
        if self.is_disposed() {
            return Err(Box::new(ObserveError::DisposedReaction));
        }

        let mut outcome: Option<Result<V, RenderError>> = None;
        self.reaction.track(&mut || {
            outcome = Some((self.render_fn)());
        });

        // track() ran synchronously; a vanished outcome means the engine
        // skipped the body, which only happens for disposed reactions.
        let outcome =
            outcome.ok_or_else(|| Box::new(ObserveError::DisposedReaction) as RenderError)?;

        match outcome {
            Ok(tree) => {
                self.flags.set(self.flags.get() - ReactionFlags::SCHEDULED);
                *self.render_tree.borrow_mut() = Some(tree.clone());
                Ok(tree)
            }
            Err(error) => {
                self.dispose();
                Err(error)
            }
        }
    }

    /// Last successfully produced tree, if any.
    pub fn render_tree(&self) -> Option<V> {
        self.render_tree.borrow().clone()
    }

    /// Unsubscribe from the engine. Idempotent.
    pub fn dispose(&self) {
        let current = self.flags.get();
        if current.contains(ReactionFlags::DISPOSED) {
            return;
        }
        self.flags.set(current | ReactionFlags::DISPOSED);
        self.reaction.dispose();
        self.render_tree.borrow_mut().take();
        debug!(component = %self.name, "reaction disposed");
    }

    /// Whether the adapter is torn down.
    pub fn is_disposed(&self) -> bool {
        self.flags.get().contains(ReactionFlags::DISPOSED) || self.reaction.is_disposed()
    }

    /// Whether an invalidation was forwarded and no render completed since.
    pub fn is_scheduled(&self) -> bool {
        self.flags.get().contains(ReactionFlags::SCHEDULED)
    }
}

impl<V: Clone + 'static> Drop for ReactionAdapter<V> {
    fn drop(&mut self) {
        self.dispose();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::{reset_engine, set_engine};
    use crate::testkit::TestEngine;

    fn install() -> TestEngine {
        reset_engine();
        let engine = TestEngine::new();
        set_engine(Rc::new(engine.clone()));
        engine
    }

    #[test]
    fn test_render_tracks_and_caches() {
        let engine = install();
        let cell = engine.cell(1i32);

        let read = cell.clone();
        let adapter = ReactionAdapter::new(
            Rc::from("Probe"),
            Box::new(move || Ok(read.get().to_string())),
            Rc::new(|| {}),
        )
        .unwrap();

        assert_eq!(adapter.render().unwrap(), "1");
        assert_eq!(adapter.render_tree(), Some("1".to_string()));
    }

    #[test]
    fn test_invalidation_fires_once_per_cycle() {
        let engine = install();
        let cell = engine.cell(0i32);

        let hits = Rc::new(Cell::new(0));
        let hits_in = hits.clone();
        let read = cell.clone();
        let adapter = ReactionAdapter::new(
            Rc::from("Probe"),
            Box::new(move || Ok(read.get())),
            Rc::new(move || hits_in.set(hits_in.get() + 1)),
        )
        .unwrap();
        adapter.render().unwrap();

        cell.set(1);
        cell.set(2);
        cell.set(3);
        assert_eq!(hits.get(), 1, "invalidations before the next render coalesce");

        adapter.render().unwrap();
        cell.set(4);
        assert_eq!(hits.get(), 2, "a successful render re-arms the callback");
    }

    #[test]
    fn test_equal_write_does_not_invalidate() {
        let engine = install();
        let cell = engine.cell(5i32);

        let hits = Rc::new(Cell::new(0));
        let hits_in = hits.clone();
        let read = cell.clone();
        let adapter = ReactionAdapter::new(
            Rc::from("Probe"),
            Box::new(move || Ok(read.get())),
            Rc::new(move || hits_in.set(hits_in.get() + 1)),
        )
        .unwrap();
        adapter.render().unwrap();

        cell.set(5);
        assert_eq!(hits.get(), 0);
    }

    #[test]
    fn test_dispose_is_idempotent_and_final() {
        let engine = install();
        let cell = engine.cell(1i32);

        let read = cell.clone();
        let adapter = ReactionAdapter::new(
            Rc::from("Probe"),
            Box::new(move || Ok(read.get())),
            Rc::new(|| {}),
        )
        .unwrap();
        adapter.render().unwrap();

        adapter.dispose();
        adapter.dispose();
        assert!(adapter.is_disposed());
        assert!(adapter.render_tree().is_none());

        let err = adapter.render().unwrap_err();
        assert!(err.to_string().contains("disposed"));
    }

    #[test]
    fn test_invalidation_after_dispose_is_dropped() {
        let engine = install();
        let cell = engine.cell(1i32);

        let hits = Rc::new(Cell::new(0));
        let hits_in = hits.clone();
        let read = cell.clone();
        let adapter = ReactionAdapter::new(
            Rc::from("Probe"),
            Box::new(move || Ok(read.get())),
            Rc::new(move || hits_in.set(hits_in.get() + 1)),
        )
        .unwrap();
        adapter.render().unwrap();
        adapter.dispose();

        cell.set(2);
        assert_eq!(hits.get(), 0);
    }

    #[test]
    fn test_failed_render_disposes_first() {
        let _engine = install();

        let attempts = Rc::new(Cell::new(0));
        let attempts_in = attempts.clone();
        let adapter: ReactionAdapter<i32> = ReactionAdapter::new(
            Rc::from("Broken"),
            Box::new(move || {
                attempts_in.set(attempts_in.get() + 1);
                Err("render exploded".into())
            }),
            Rc::new(|| {}),
        )
        .unwrap();

        let err = adapter.render().unwrap_err();
        assert_eq!(err.to_string(), "render exploded");
        assert!(adapter.is_disposed());
        assert_eq!(attempts.get(), 1);
    }

    #[test]
    fn test_missing_engine_fails_fast() {
        reset_engine();
        let result: Result<ReactionAdapter<i32>, _> =
            ReactionAdapter::new(Rc::from("Probe"), Box::new(|| Ok(0)), Rc::new(|| {}));
        assert!(matches!(result, Err(ObserveError::EngineMissing)));
    }
}
