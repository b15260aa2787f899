//! Static rendering mode - one non-reactive render pass.
//!
//! When enabled, observer components never create reactions: they render
//! once, untracked, and subsequent observable writes do not reach them.
//! This is the mode for non-interactive output generation (server-side
//! rendering, snapshots), where nothing will ever flush an update.
//!
//! The flag is thread-local and read at render time, so flipping it affects
//! components mounted afterwards (and re-renders the host drives itself),
//! never reactions that already exist.

use std::cell::Cell;

thread_local! {
    static STATIC_RENDERING: Cell<bool> = const { Cell::new(false) };
}

/// Enable or disable static rendering on this thread.
pub fn use_static_rendering(enabled: bool) {
    STATIC_RENDERING.with(|flag| flag.set(enabled));
}

/// Whether static rendering is active.
pub fn is_static_rendering() -> bool {
    STATIC_RENDERING.with(|flag| flag.get())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flag_round_trip() {
        assert!(!is_static_rendering());
        use_static_rendering(true);
        assert!(is_static_rendering());
        use_static_rendering(false);
        assert!(!is_static_rendering());
    }
}
