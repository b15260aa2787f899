//! Mounted instances - the per-mount handle the host drives.
//!
//! The host creates one [`MountedInstance`] per mount, renders through it,
//! forwards context updates and error-boundary deliveries, and unmounts it
//! exactly once. Everything per-mount the binding needs (the observer state
//! cell, the disposer registry, the resolved store scope, the introspection
//! probe) hangs off the shared instance state reachable from [`RenderCtx`].

use std::any::Any;
use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};
use std::time::Instant;

use tracing::debug;

use crate::dispose::DisposerRegistry;
use crate::error::ObserveError;
use crate::host::{ClassComponent, Definition, DefinitionShape};
use crate::observer::ObserverCell;
use crate::props::Props;
use crate::registry::{self, InstanceId};
use crate::stores::{StoreMap, StoreScope};
use crate::types::RenderError;

pub(crate) type ClassBody<V> = Rc<RefCell<Box<dyn ClassComponent<V>>>>;

/// Render dispatch resolved once at mount, never per render.
enum InstanceBody<V: Clone + 'static> {
    Function(crate::host::RenderFn<V>),
    Class(ClassBody<V>),
}

// =============================================================================
// Shared per-mount state
// =============================================================================

pub(crate) struct InstanceShared<V: Clone + 'static> {
    id: InstanceId,
    name: Rc<str>,
    mounted_at: Instant,
    scheduler: Rc<dyn Fn()>,
    stores: RefCell<Rc<StoreScope>>,
    provided: RefCell<Option<Rc<StoreScope>>>,
    provided_map: RefCell<Option<StoreMap>>,
    observer_cell: RefCell<Option<Rc<ObserverCell<V>>>>,
    injected_body: RefCell<Option<ClassBody<V>>>,
    wrapped_probe: RefCell<Option<Rc<dyn Any>>>,
    disposers: Rc<DisposerRegistry>,
    tracking_active: Cell<bool>,
    unmounted: Cell<bool>,
}

impl<V: Clone + 'static> InstanceShared<V> {
    pub(crate) fn id(&self) -> InstanceId {
        self.id
    }

    pub(crate) fn name(&self) -> Rc<str> {
        self.name.clone()
    }

    pub(crate) fn mounted_at(&self) -> Instant {
        self.mounted_at
    }

    pub(crate) fn scheduler(&self) -> Rc<dyn Fn()> {
        self.scheduler.clone()
    }

    pub(crate) fn observer_cell(&self) -> Option<Rc<ObserverCell<V>>> {
        self.observer_cell.borrow().clone()
    }

    pub(crate) fn set_observer_cell(&self, cell: Rc<ObserverCell<V>>) {
        *self.observer_cell.borrow_mut() = Some(cell);
    }

    pub(crate) fn injected_body(&self) -> Option<ClassBody<V>> {
        self.injected_body.borrow().clone()
    }

    pub(crate) fn set_injected_body(&self, body: ClassBody<V>) {
        *self.injected_body.borrow_mut() = Some(body);
    }

    pub(crate) fn set_wrapped_probe(&self, probe: Rc<dyn Any>) {
        *self.wrapped_probe.borrow_mut() = Some(probe);
    }

    pub(crate) fn provided_map(&self) -> Option<StoreMap> {
        self.provided_map.borrow().clone()
    }

    pub(crate) fn tracking_active(&self) -> bool {
        self.tracking_active.get()
    }

    pub(crate) fn set_tracking_active(&self, active: bool) {
        self.tracking_active.set(active);
    }

    pub(crate) fn is_unmounted(&self) -> bool {
        self.unmounted.get()
    }
}

// =============================================================================
// Render context
// =============================================================================

/// Per-instance context handed to every render.
///
/// Cheap to clone; all clones observe the same mount.
pub struct RenderCtx<V: Clone + 'static> {
    shared: Rc<InstanceShared<V>>,
}

impl<V: Clone + 'static> Clone for RenderCtx<V> {
    fn clone(&self) -> Self {
        Self { shared: self.shared.clone() }
    }
}

impl<V: Clone + 'static> RenderCtx<V> {
    /// Component name of this mount.
    pub fn component_name(&self) -> Rc<str> {
        self.shared.name()
    }

    /// Registry id of this mount.
    pub fn instance_id(&self) -> InstanceId {
        self.shared.id()
    }

    /// Ancestor store scope visible to this instance.
    pub fn stores(&self) -> Rc<StoreScope> {
        self.shared.stores.borrow().clone()
    }

    /// Expose `stores` to this instance's subtree.
    ///
    /// Used by provider definitions; descendants see the extended scope on
    /// their next render pass.
    pub fn provide(&self, stores: StoreMap) {
        let extended = self.stores().extend(stores.clone());
        *self.shared.provided.borrow_mut() = Some(extended);
        *self.shared.provided_map.borrow_mut() = Some(stores);
    }

    /// Ask the host to schedule a re-render of this instance.
    pub fn request_render(&self) {
        (self.shared.scheduler)();
    }

    /// This instance's disposer registry.
    pub fn disposers(&self) -> Rc<DisposerRegistry> {
        self.shared.disposers.clone()
    }

    pub(crate) fn shared(&self) -> &Rc<InstanceShared<V>> {
        &self.shared
    }
}

// =============================================================================
// Mounted instance
// =============================================================================

/// One mount of a definition; the handle the host retains and drives.
pub struct MountedInstance<V: Clone + 'static> {
    def: Definition<V>,
    shared: Rc<InstanceShared<V>>,
    body: InstanceBody<V>,
}

impl<V: Clone + 'static> MountedInstance<V> {
    /// Mount `def` with the host's re-render scheduler and the store scope
    /// inherited from the parent.
    ///
    /// Class-style bodies are instantiated here; the first render and the
    /// `did_mount` notification remain the host's moves.
    pub fn mount(
        def: Definition<V>,
        scheduler: Rc<dyn Fn()>,
        stores: Rc<StoreScope>,
    ) -> Rc<Self> {
        let name = def.name();
        let body = match def.shape() {
            DefinitionShape::Class(factory) => {
                InstanceBody::Class(Rc::new(RefCell::new(factory())))
            }
            DefinitionShape::Function(render) => InstanceBody::Function(render.clone()),
        };

        let instance = Rc::new_cyclic(|weak: &Weak<MountedInstance<V>>| {
            let weak_any: Weak<dyn Any> = weak.clone();
            let id = registry::register_instance(name.clone(), weak_any);
            let shared = Rc::new(InstanceShared {
                id,
                name: name.clone(),
                mounted_at: Instant::now(),
                scheduler,
                stores: RefCell::new(stores),
                provided: RefCell::new(None),
                provided_map: RefCell::new(None),
                observer_cell: RefCell::new(None),
                injected_body: RefCell::new(None),
                wrapped_probe: RefCell::new(None),
                disposers: Rc::new(DisposerRegistry::new()),
                tracking_active: Cell::new(false),
                unmounted: Cell::new(false),
            });
            MountedInstance { def, shared, body }
        });

        debug!(component = %name, instance = %instance.id(), "mounted");
        instance
    }

    /// Registry id of this mount.
    pub fn id(&self) -> InstanceId {
        self.shared.id()
    }

    /// Component name.
    pub fn name(&self) -> Rc<str> {
        self.shared.name()
    }

    /// The definition this instance was mounted from.
    pub fn definition(&self) -> &Definition<V> {
        &self.def
    }

    /// Context handed to renders of this instance.
    pub fn ctx(&self) -> RenderCtx<V> {
        RenderCtx { shared: self.shared.clone() }
    }

    /// Run one render pass with `props`.
    ///
    /// # Errors
    ///
    /// [`ObserveError::DisposedReaction`] after unmount, otherwise whatever
    /// the component's render produced.
    pub fn render(&self, props: &Props) -> Result<V, RenderError> {
        if self.shared.is_unmounted() {
            return Err(Box::new(ObserveError::DisposedReaction));
        }
        let ctx = self.ctx();
        match &self.body {
            InstanceBody::Function(render) => render(props, &ctx),
            InstanceBody::Class(body) => {
                let result = body.borrow_mut().render(props, &ctx);
                result
            }
        }
    }

    fn class_body(&self) -> Option<&ClassBody<V>> {
        match &self.body {
            InstanceBody::Class(body) => Some(body),
            InstanceBody::Function(_) => None,
        }
    }

    /// First render committed; deliver `did_mount` to a class body.
    pub fn notify_mounted(&self) {
        if let Some(body) = self.class_body() {
            body.borrow_mut().did_mount();
        }
    }

    /// Whether this instance (directly or through injection) is an error
    /// boundary.
    pub fn handles_errors(&self) -> bool {
        if let Some(body) = self.class_body() {
            return body.borrow().handles_errors();
        }
        if let Some(body) = self.shared.injected_body() {
            return body.borrow().handles_errors();
        }
        false
    }

    /// Deliver a descendant render error to this instance's boundary hook.
    pub fn deliver_error(&self, error: &(dyn std::error::Error + 'static)) {
        if let Some(body) = self.class_body() {
            body.borrow_mut().did_catch(error);
        } else if let Some(body) = self.shared.injected_body() {
            body.borrow_mut().did_catch(error);
        }
    }

    /// Replace the ancestor store scope (visible on the next render pass).
    pub fn update_stores(&self, stores: Rc<StoreScope>) {
        *self.shared.stores.borrow_mut() = stores;
    }

    /// Store scope for this instance's children.
    ///
    /// The provided scope when this instance is a provider, the inherited
    /// scope otherwise.
    pub fn child_stores(&self) -> Rc<StoreScope> {
        match self.shared.provided.borrow().as_ref() {
            Some(provided) => provided.clone(),
            None => self.shared.stores.borrow().clone(),
        }
    }

    /// Live wrapped inner instance, for introspection and tests.
    ///
    /// None before mount-side creation and after unmount.
    pub fn wrapped_instance(&self) -> Option<Rc<dyn Any>> {
        self.shared.wrapped_probe.borrow().clone()
    }

    /// Whether [`unmount`](MountedInstance::unmount) has run.
    pub fn is_unmounted(&self) -> bool {
        self.shared.is_unmounted()
    }

    /// Tear the instance down. Idempotent.
    ///
    /// Order: class `will_unmount` hooks, reaction disposal (with the
    /// destroy report), disposer drain in registration order, registry
    /// removal. A pending scheduled update is abandoned - disposal takes
    /// priority, and the disposed reaction ignores any in-flight callback.
    pub fn unmount(&self) {
        if self.shared.unmounted.replace(true) {
            return;
        }
        debug!(component = %self.name(), instance = %self.id(), "unmounting");

        if let Some(body) = self.class_body() {
            body.borrow_mut().will_unmount();
        }
        let injected = self.shared.injected_body.borrow_mut().take();
        if let Some(body) = injected {
            body.borrow_mut().will_unmount();
        }

        // End the slot borrow before teardown: report listeners run inside.
        let cell = self.shared.observer_cell.borrow_mut().take();
        if let Some(cell) = cell {
            cell.teardown(&self.shared);
        }

        self.shared.disposers.drain();
        self.shared.wrapped_probe.borrow_mut().take();
        registry::unregister_instance(self.id());
    }
}

impl<V: Clone + 'static> Drop for MountedInstance<V> {
    fn drop(&mut self) {
        // A dropped-but-never-unmounted instance must still release its
        // subscription and registry entry.
        self.unmount();
    }
}
