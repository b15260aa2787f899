//! Render reports - process-wide render/destroy event channel.
//!
//! Every successful tracked render broadcasts a [`RenderEvent`] with its
//! duration; every observed teardown broadcasts a destroy event with the
//! instance's total lifetime. A second channel carries render errors, fired
//! after the failing reaction is disposed and before the error propagates
//! to the host.
//!
//! Both channels are lazily used thread-local lists. Subscribing returns a
//! [`Cleanup`] closure; nothing is ever broadcast to a listener after its
//! cleanup ran.

use std::cell::RefCell;
use std::rc::Rc;
use std::time::{Duration, Instant};

use tracing::trace;

use crate::registry::InstanceId;
use crate::types::Cleanup;

// =============================================================================
// Events
// =============================================================================

/// What happened to the subject instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderEventKind {
    /// A tracked render completed successfully.
    Render,
    /// The instance was torn down.
    Destroy,
}

/// Immutable record of one render or destroy transition.
#[derive(Clone)]
pub struct RenderEvent {
    /// Transition kind.
    pub kind: RenderEventKind,
    /// Component name of the subject instance.
    pub component: Rc<str>,
    /// Subject instance (resolvable via [`crate::registry::live_instance`]
    /// while mounted).
    pub instance: InstanceId,
    /// When the transition happened.
    pub at: Instant,
    /// Duration of the render pass (render events only).
    pub render_time: Option<Duration>,
    /// Time since the instance mounted.
    pub total_time: Option<Duration>,
}

type ReportHandler = Rc<dyn Fn(&RenderEvent)>;
type ErrorHandler = Rc<dyn Fn(&(dyn std::error::Error + 'static))>;

thread_local! {
    static REPORT_LISTENERS: RefCell<Vec<(u64, ReportHandler)>> = const { RefCell::new(Vec::new()) };
    static ERROR_LISTENERS: RefCell<Vec<(u64, ErrorHandler)>> = const { RefCell::new(Vec::new()) };
    static NEXT_LISTENER: RefCell<u64> = const { RefCell::new(0) };
}

fn next_listener_id() -> u64 {
    NEXT_LISTENER.with(|next| {
        let mut next = next.borrow_mut();
        let id = *next;
        *next += 1;
        id
    })
}

// =============================================================================
// Subscription
// =============================================================================

/// Listen to render/destroy events. Returns the unsubscribe cleanup.
pub fn on_render_report(handler: impl Fn(&RenderEvent) + 'static) -> Cleanup {
    let id = next_listener_id();
    REPORT_LISTENERS.with(|listeners| {
        listeners.borrow_mut().push((id, Rc::new(handler)));
    });
    Box::new(move || {
        REPORT_LISTENERS.with(|listeners| {
            listeners.borrow_mut().retain(|(listener, _)| *listener != id);
        });
    })
}

/// Listen to render errors. Returns the unsubscribe cleanup.
///
/// Handlers observe the error after the failing reaction was disposed; they
/// cannot stop its propagation to the host.
pub fn on_error(handler: impl Fn(&(dyn std::error::Error + 'static)) + 'static) -> Cleanup {
    let id = next_listener_id();
    ERROR_LISTENERS.with(|listeners| {
        listeners.borrow_mut().push((id, Rc::new(handler)));
    });
    Box::new(move || {
        ERROR_LISTENERS.with(|listeners| {
            listeners.borrow_mut().retain(|(listener, _)| *listener != id);
        });
    })
}

// =============================================================================
// Broadcast
// =============================================================================

/// Broadcast a render event to all listeners.
pub(crate) fn emit_render_event(event: &RenderEvent) {
    trace!(component = %event.component, instance = %event.instance, kind = ?event.kind, "render report");
    // Snapshot so handlers may subscribe/unsubscribe while we iterate.
    let handlers: Vec<ReportHandler> =
        REPORT_LISTENERS.with(|listeners| listeners.borrow().iter().map(|(_, h)| h.clone()).collect());
    for handler in handlers {
        handler(event);
    }
}

/// Broadcast a render error to all listeners.
pub(crate) fn emit_render_error(error: &(dyn std::error::Error + 'static)) {
    let handlers: Vec<ErrorHandler> =
        ERROR_LISTENERS.with(|listeners| listeners.borrow().iter().map(|(_, h)| h.clone()).collect());
    for handler in handlers {
        handler(error);
    }
}

/// Whether any render-report listener is registered.
pub fn has_report_listeners() -> bool {
    REPORT_LISTENERS.with(|listeners| !listeners.borrow().is_empty())
}

/// Clear all listeners (for testing).
pub fn reset_reporting() {
    REPORT_LISTENERS.with(|listeners| listeners.borrow_mut().clear());
    ERROR_LISTENERS.with(|listeners| listeners.borrow_mut().clear());
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::reset_instances;
    use std::cell::RefCell as StdRefCell;

    fn probe_event(kind: RenderEventKind) -> RenderEvent {
        RenderEvent {
            kind,
            component: Rc::from("Probe"),
            instance: crate::registry::register_instance(
                Rc::from("Probe"),
                std::rc::Weak::<i32>::new(),
            ),
            at: Instant::now(),
            render_time: Some(Duration::from_micros(10)),
            total_time: None,
        }
    }

    #[test]
    fn test_listeners_receive_events_until_cleanup() {
        reset_reporting();
        reset_instances();

        let seen = Rc::new(StdRefCell::new(Vec::new()));
        let seen_in = seen.clone();
        let cleanup = on_render_report(move |event| {
            seen_in.borrow_mut().push(event.kind);
        });

        emit_render_event(&probe_event(RenderEventKind::Render));
        emit_render_event(&probe_event(RenderEventKind::Destroy));
        cleanup();
        emit_render_event(&probe_event(RenderEventKind::Render));

        assert_eq!(*seen.borrow(), vec![RenderEventKind::Render, RenderEventKind::Destroy]);
        reset_instances();
    }

    #[test]
    fn test_error_channel_delivers_message() {
        reset_reporting();

        let seen = Rc::new(StdRefCell::new(Vec::new()));
        let seen_in = seen.clone();
        let cleanup = on_error(move |error| {
            seen_in.borrow_mut().push(error.to_string());
        });

        let error: crate::types::RenderError = "boom".into();
        emit_render_error(error.as_ref());
        cleanup();

        assert_eq!(*seen.borrow(), vec!["boom".to_string()]);
    }

    #[test]
    fn test_has_report_listeners() {
        reset_reporting();
        assert!(!has_report_listeners());
        let cleanup = on_render_report(|_| {});
        assert!(has_report_listeners());
        cleanup();
        assert!(!has_report_listeners());
    }
}
