//! Core shared types - cleanup callbacks, store references, render errors.
//!
//! These aliases define the boundary vocabulary of the binding. Everything
//! here is single-threaded (`Rc`, not `Arc`) to match the cooperative
//! execution model of the host view layer.

use std::any::Any;
use std::rc::Rc;

// =============================================================================
// Cleanup / Disposer
// =============================================================================

/// Cleanup function returned by subscription APIs.
///
/// Call it to unsubscribe. Dropping it without calling leaves the
/// subscription in place.
pub type Cleanup = Box<dyn FnOnce()>;

/// Zero-argument teardown callback registered on a component instance.
///
/// Invoked exactly once when the instance unmounts, in registration order.
pub type Disposer = Box<dyn FnOnce()>;

// =============================================================================
// Stores
// =============================================================================

/// Shared reference to an application store.
///
/// Stores are opaque to the binding: consumers look them up by name and
/// downcast to the concrete type. The reference is lookup-only - providing
/// a store never transfers its lifetime to descendants.
pub type StoreRef = Rc<dyn Any>;

// =============================================================================
// Render errors
// =============================================================================

/// Error produced by a component render.
///
/// The binding never reinterprets these: a failed render disposes the
/// reaction tied to it and then propagates the error unchanged to the host
/// library's own error-boundary mechanism.
pub type RenderError = Box<dyn std::error::Error>;
