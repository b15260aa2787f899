//! Host seam - the component contract the binding wraps.
//!
//! The host view library owns reconciliation, scheduling and the tree; the
//! binding owns what happens inside one component's render. The meeting
//! point is [`Definition`] (what a component IS) plus
//! [`MountedInstance`](crate::host::MountedInstance) (one mount of it, the
//! handle the host drives).
//!
//! Definitions are polymorphic over the two component shapes:
//! - function-style: a render closure, re-invoked on every render pass
//! - class-style: a factory producing a stateful body with lifecycle hooks
//!
//! Wrappers (`observer`, `inject`, `provider`) transform definitions into
//! new definitions with the same external contract; marker flags record the
//! applied wrappers so wrapping stays idempotent and introspectable.

mod instance;

pub use instance::{MountedInstance, RenderCtx};
pub(crate) use instance::{ClassBody, InstanceShared};

use std::rc::Rc;

use bitflags::bitflags;

use crate::props::Props;
use crate::types::RenderError;

bitflags! {
    /// Wrapper markers carried by a definition.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct DefinitionFlags: u8 {
        /// Render path is tracked (`observer` applied).
        const OBSERVED = 1 << 0;
        /// Props are resolved against ancestor stores (`inject` applied).
        const INJECTED = 1 << 1;
        /// Extends the store scope for its subtree.
        const PROVIDER = 1 << 2;
    }
}

// =============================================================================
// Component shapes
// =============================================================================

/// Function-style render: props and instance context in, view tree out.
pub type RenderFn<V> = Rc<dyn Fn(&Props, &RenderCtx<V>) -> Result<V, RenderError>>;

/// Factory producing one class-style body per mount.
pub type ClassFactory<V> = Rc<dyn Fn() -> Box<dyn ClassComponent<V>>>;

/// Class-style component body: render plus lifecycle hooks.
///
/// Hooks default to no-ops; a body only implements what it needs. The host
/// calls `did_mount` after the first render, `will_unmount` during teardown
/// and `did_catch` when a descendant's render failed and this body is the
/// nearest one with [`handles_errors`](ClassComponent::handles_errors) true.
pub trait ClassComponent<V: Clone + 'static> {
    /// Produce the view tree for the current props.
    fn render(&mut self, props: &Props, ctx: &RenderCtx<V>) -> Result<V, RenderError>;

    /// First render committed.
    fn did_mount(&mut self) {}

    /// Instance is about to be torn down.
    fn will_unmount(&mut self) {}

    /// A descendant render error reached this boundary.
    fn did_catch(&mut self, _error: &(dyn std::error::Error + 'static)) {}

    /// Whether this body acts as an error boundary.
    fn handles_errors(&self) -> bool {
        false
    }
}

/// The two component shapes a definition can take.
pub enum DefinitionShape<V: Clone + 'static> {
    /// Stateless render closure.
    Function(RenderFn<V>),
    /// Stateful body factory.
    Class(ClassFactory<V>),
}

impl<V: Clone + 'static> Clone for DefinitionShape<V> {
    fn clone(&self) -> Self {
        match self {
            DefinitionShape::Function(render) => DefinitionShape::Function(render.clone()),
            DefinitionShape::Class(factory) => DefinitionShape::Class(factory.clone()),
        }
    }
}

// =============================================================================
// Definitions
// =============================================================================

/// A component definition: identity, shape, and wrapper markers.
///
/// `V` is the host's opaque view-tree type; the binding only clones and
/// caches it.
pub struct Definition<V: Clone + 'static> {
    name: Rc<str>,
    flags: DefinitionFlags,
    shape: DefinitionShape<V>,
    inner: Option<Rc<Definition<V>>>,
}

impl<V: Clone + 'static> Clone for Definition<V> {
    fn clone(&self) -> Self {
        Self {
            name: self.name.clone(),
            flags: self.flags,
            shape: self.shape.clone(),
            inner: self.inner.clone(),
        }
    }
}

impl<V: Clone + 'static> Definition<V> {
    /// Function-style definition.
    pub fn function(
        name: impl Into<Rc<str>>,
        render: impl Fn(&Props, &RenderCtx<V>) -> Result<V, RenderError> + 'static,
    ) -> Self {
        Self {
            name: name.into(),
            flags: DefinitionFlags::empty(),
            shape: DefinitionShape::Function(Rc::new(render)),
            inner: None,
        }
    }

    /// Class-style definition.
    pub fn class(
        name: impl Into<Rc<str>>,
        factory: impl Fn() -> Box<dyn ClassComponent<V>> + 'static,
    ) -> Self {
        Self {
            name: name.into(),
            flags: DefinitionFlags::empty(),
            shape: DefinitionShape::Class(Rc::new(factory)),
            inner: None,
        }
    }

    /// Component name (used in errors, reports and traces).
    pub fn name(&self) -> Rc<str> {
        self.name.clone()
    }

    /// Applied wrapper markers.
    pub fn flags(&self) -> DefinitionFlags {
        self.flags
    }

    /// Whether `observer` was applied.
    pub fn is_observed(&self) -> bool {
        self.flags.contains(DefinitionFlags::OBSERVED)
    }

    /// The definition a wrapper was applied to, if any.
    ///
    /// Walks one level: `inject(observer(def))` exposes `observer(def)`.
    pub fn wrapped_component(&self) -> Option<&Definition<V>> {
        self.inner.as_deref()
    }

    /// Component shape (wrappers dispatch on this at wrap time).
    pub fn shape(&self) -> &DefinitionShape<V> {
        &self.shape
    }

    pub(crate) fn from_parts(
        name: Rc<str>,
        flags: DefinitionFlags,
        shape: DefinitionShape<V>,
        inner: Option<Rc<Definition<V>>>,
    ) -> Self {
        Self { name, flags, shape, inner }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_function_definition_renders() {
        let def: Definition<String> =
            Definition::function("Plain", |props, _ctx| {
                Ok(format!("n={}", props.get_value::<i32>("n").copied().unwrap_or(0)))
            });
        assert_eq!(def.name().as_ref(), "Plain");
        assert!(matches!(def.shape(), DefinitionShape::Function(_)));
        assert!(def.flags().is_empty());
    }

    #[test]
    fn test_flags_compose() {
        let flags = DefinitionFlags::OBSERVED | DefinitionFlags::INJECTED;
        assert!(flags.contains(DefinitionFlags::OBSERVED));
        assert!(!flags.contains(DefinitionFlags::PROVIDER));
    }
}
