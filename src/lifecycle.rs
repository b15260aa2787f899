//! Lifecycle phases - per-instance coalescing state machine.
//!
//! Each observed instance moves through four phases:
//!
//! ```text
//! Unmounted -> MountedClean <-> MountedPendingUpdate
//!                   \______________/
//!                          |
//!                       Disposed
//! ```
//!
//! The machine enforces at-most-one pending update: the first invalidation
//! after a clean render asks the host to schedule a re-render, every further
//! invalidation before that re-render lands is collapsed, and anything
//! arriving after disposal is ignored. Disposal wins over a pending update -
//! an unmount while an update is queued simply abandons it.

use std::cell::Cell;

// =============================================================================
// Phases
// =============================================================================

/// Lifecycle phase of one observed component instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Created, first render not yet tracked.
    Unmounted,
    /// Rendered and up to date with its dependencies.
    MountedClean,
    /// Invalidated; one host update is scheduled and not yet executed.
    MountedPendingUpdate,
    /// Torn down; every event is ignored from here on.
    Disposed,
}

/// What the coordinator should do with an invalidation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InvalidateOutcome {
    /// First invalidation since the last render: schedule a host update.
    Schedule,
    /// An update is already pending: coalesce, schedule nothing.
    Coalesced,
    /// The instance is disposed or never mounted: drop the signal.
    Ignored,
}

// =============================================================================
// State machine
// =============================================================================

/// Phase cell for one instance.
#[derive(Debug)]
pub struct LifecycleState {
    phase: Cell<Phase>,
}

impl Default for LifecycleState {
    fn default() -> Self {
        Self::new()
    }
}

impl LifecycleState {
    /// New instance in [`Phase::Unmounted`].
    pub fn new() -> Self {
        Self { phase: Cell::new(Phase::Unmounted) }
    }

    /// Current phase.
    pub fn phase(&self) -> Phase {
        self.phase.get()
    }

    /// First mount: `Unmounted -> MountedClean`.
    ///
    /// Any other starting phase is left untouched.
    pub fn mount(&self) {
        if self.phase.get() == Phase::Unmounted {
            self.phase.set(Phase::MountedClean);
        }
    }

    /// An invalidation arrived from the reaction.
    pub fn invalidate(&self) -> InvalidateOutcome {
        match self.phase.get() {
            Phase::MountedClean => {
                self.phase.set(Phase::MountedPendingUpdate);
                InvalidateOutcome::Schedule
            }
            Phase::MountedPendingUpdate => InvalidateOutcome::Coalesced,
            Phase::Unmounted | Phase::Disposed => InvalidateOutcome::Ignored,
        }
    }

    /// A tracked render completed and cached a fresh tree.
    pub fn rendered(&self) {
        match self.phase.get() {
            Phase::MountedClean | Phase::MountedPendingUpdate => {
                self.phase.set(Phase::MountedClean);
            }
            Phase::Unmounted | Phase::Disposed => {}
        }
    }

    /// Whether an update is scheduled and not yet executed.
    pub fn is_update_pending(&self) -> bool {
        self.phase.get() == Phase::MountedPendingUpdate
    }

    /// Tear down. Returns true on the first call only.
    ///
    /// A pending update is abandoned here; disposal takes priority.
    pub fn dispose(&self) -> bool {
        if self.phase.get() == Phase::Disposed {
            return false;
        }
        self.phase.set(Phase::Disposed);
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mount_transitions_once() {
        let state = LifecycleState::new();
        assert_eq!(state.phase(), Phase::Unmounted);

        state.mount();
        assert_eq!(state.phase(), Phase::MountedClean);

        // Mount again changes nothing.
        state.mount();
        assert_eq!(state.phase(), Phase::MountedClean);
    }

    #[test]
    fn test_invalidations_coalesce() {
        let state = LifecycleState::new();
        state.mount();

        assert_eq!(state.invalidate(), InvalidateOutcome::Schedule);
        assert_eq!(state.invalidate(), InvalidateOutcome::Coalesced);
        assert_eq!(state.invalidate(), InvalidateOutcome::Coalesced);
        assert!(state.is_update_pending());

        state.rendered();
        assert_eq!(state.phase(), Phase::MountedClean);

        // A fresh invalidation schedules again.
        assert_eq!(state.invalidate(), InvalidateOutcome::Schedule);
    }

    #[test]
    fn test_disposed_ignores_everything() {
        let state = LifecycleState::new();
        state.mount();
        state.invalidate();

        assert!(state.dispose());
        assert!(!state.dispose());

        assert_eq!(state.invalidate(), InvalidateOutcome::Ignored);
        state.rendered();
        assert_eq!(state.phase(), Phase::Disposed);
    }

    #[test]
    fn test_dispose_abandons_pending_update() {
        let state = LifecycleState::new();
        state.mount();
        assert_eq!(state.invalidate(), InvalidateOutcome::Schedule);

        state.dispose();
        assert!(!state.is_update_pending());
        assert_eq!(state.phase(), Phase::Disposed);
    }

    #[test]
    fn test_invalidate_before_mount_is_ignored() {
        let state = LifecycleState::new();
        assert_eq!(state.invalidate(), InvalidateOutcome::Ignored);
    }
}
