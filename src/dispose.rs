//! Disposer registry - per-instance teardown callbacks.
//!
//! Every component instance owns one registry. Disposers accumulate during
//! the instance's life and are drained exactly once at unmount, in
//! registration order. Draining is idempotent; registering after the drain
//! is a hard error ([`ObserveError::RegistryClosed`]), never a silent
//! inconsistency.

use std::cell::{Cell, RefCell};

use crate::error::ObserveError;
use crate::host::RenderCtx;
use crate::types::Disposer;

// =============================================================================
// Registry
// =============================================================================

/// Ordered, append-only list of teardown callbacks.
#[derive(Default)]
pub struct DisposerRegistry {
    items: RefCell<Vec<Disposer>>,
    drained: Cell<bool>,
}

impl DisposerRegistry {
    /// Empty, open registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a disposer.
    ///
    /// # Errors
    ///
    /// [`ObserveError::RegistryClosed`] once the registry has drained.
    pub fn register(&self, disposer: Disposer) -> Result<(), ObserveError> {
        if self.drained.get() {
            return Err(ObserveError::RegistryClosed);
        }
        self.items.borrow_mut().push(disposer);
        Ok(())
    }

    /// Append several disposers, preserving the iterator's order.
    ///
    /// # Errors
    ///
    /// [`ObserveError::RegistryClosed`] once the registry has drained; no
    /// disposer from `disposers` is registered in that case.
    pub fn register_all(
        &self,
        disposers: impl IntoIterator<Item = Disposer>,
    ) -> Result<(), ObserveError> {
        if self.drained.get() {
            return Err(ObserveError::RegistryClosed);
        }
        self.items.borrow_mut().extend(disposers);
        Ok(())
    }

    /// Invoke every registered disposer exactly once, in registration order.
    ///
    /// A second drain is a no-op. The registry is marked drained BEFORE any
    /// disposer runs, so a panicking disposer aborts the remaining drains
    /// (the panic propagates) without reopening the registry.
    pub fn drain(&self) {
        if self.drained.get() {
            return;
        }
        self.drained.set(true);
        let items = self.items.take();
        for disposer in items {
            disposer();
        }
    }

    /// Whether [`drain`](DisposerRegistry::drain) has run.
    pub fn is_drained(&self) -> bool {
        self.drained.get()
    }

    /// Number of pending disposers.
    pub fn len(&self) -> usize {
        self.items.borrow().len()
    }

    /// Whether no disposers are pending.
    pub fn is_empty(&self) -> bool {
        self.items.borrow().is_empty()
    }
}

// =============================================================================
// Instance helpers
// =============================================================================

/// Run `disposer` when the instance behind `ctx` unmounts.
///
/// # Errors
///
/// [`ObserveError::RegistryClosed`] when the instance already tore down.
pub fn dispose_on_unmount<V: Clone + 'static>(
    ctx: &RenderCtx<V>,
    disposer: Disposer,
) -> Result<(), ObserveError> {
    ctx.disposers().register(disposer)
}

/// Register several unmount disposers at once, preserving order.
///
/// # Errors
///
/// [`ObserveError::RegistryClosed`] when the instance already tore down.
pub fn dispose_on_unmount_all<V: Clone + 'static>(
    ctx: &RenderCtx<V>,
    disposers: impl IntoIterator<Item = Disposer>,
) -> Result<(), ObserveError> {
    ctx.disposers().register_all(disposers)
}
