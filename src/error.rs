//! Error kinds surfaced by the binding itself.
//!
//! Render errors are NOT represented here - they pass through as
//! [`RenderError`](crate::types::RenderError) unchanged. `ObserveError`
//! covers the binding's own failure modes: operations on torn-down state,
//! unresolvable stores, and misconfiguration.

use thiserror::Error;

/// Failure modes of the observer binding.
#[derive(Debug, Error)]
pub enum ObserveError {
    /// An operation was attempted on a reaction that is already torn down.
    ///
    /// A disposed reaction never re-invokes its tracked render; re-render
    /// requests against it are rejected with this error.
    #[error("reaction is disposed; its render is no longer available")]
    DisposedReaction,

    /// A named store was not found in any ancestor provider scope.
    #[error("store `{store}` requested by `{component}` is not supplied by any ancestor provider")]
    MissingStore {
        /// Name the consumer asked for.
        store: String,
        /// Component that requested the injection.
        component: String,
    },

    /// A disposer was registered after the registry was drained.
    #[error("disposer registry is already drained; teardown callbacks can no longer be registered")]
    RegistryClosed,

    /// An observed component rendered with no reactive engine installed.
    ///
    /// Install one with [`set_engine`](crate::engine::set_engine), or enable
    /// static rendering to produce plain non-reactive output.
    #[error("no reactive engine installed; call set_engine() before rendering observer components")]
    EngineMissing,

    /// A container definition rendered without its `children` prop.
    #[error("`{component}` expects a `children` prop")]
    MissingChildren {
        /// Component that required children.
        component: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_store_names_both_sides() {
        let err = ObserveError::MissingStore {
            store: "counter".to_string(),
            component: "TodoList".to_string(),
        };
        let message = err.to_string();
        assert!(message.contains("counter"));
        assert!(message.contains("TodoList"));
    }

    #[test]
    fn test_errors_box_as_render_errors() {
        let boxed: crate::types::RenderError = Box::new(ObserveError::DisposedReaction);
        assert!(boxed.to_string().contains("disposed"));
    }
}
