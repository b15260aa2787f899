//! Observer wrapper - tracked renders with coalesced re-render scheduling.
//!
//! `observer(def)` returns a definition with the same external contract
//! whose render path runs inside a reaction. The wrapper picks its strategy
//! at wrap time, never per render:
//! - function-style: the render closure is wrapped; per-mount state (the
//!   reaction adapter, the lifecycle phase cell, the last props) lives in a
//!   hidden observer cell attached to the instance context
//! - class-style: the factory is wrapped so each body becomes an
//!   [`ObservedClass`] whose render is tracked and whose unmount and
//!   error-boundary hooks dispose the adapter before delegating
//!
//! The lifecycle coordination happens here: invalidations from the adapter
//! feed the per-instance [`LifecycleState`], the first one schedules a host
//! update, the rest coalesce, and a successful render re-arms everything
//! and broadcasts a render report.

use std::cell::RefCell;
use std::rc::Rc;
use std::time::Instant;

use tracing::{trace, warn};

use crate::host::{
    ClassComponent, ClassFactory, Definition, DefinitionFlags, DefinitionShape, InstanceShared,
    RenderCtx, RenderFn,
};
use crate::lifecycle::{InvalidateOutcome, LifecycleState};
use crate::mode::is_static_rendering;
use crate::props::{props_equal, Props};
use crate::reaction::ReactionAdapter;
use crate::report::{emit_render_error, emit_render_event, RenderEvent, RenderEventKind};
use crate::types::RenderError;

// =============================================================================
// Options
// =============================================================================

/// Per-wrapper configuration.
#[derive(Debug, Clone, Copy, Default)]
pub struct ObserverOptions {
    /// Compare props by value (`PartialEq`) instead of by identity when
    /// deciding whether a clean render pass can reuse the cached tree.
    pub deep_props: bool,
}

// =============================================================================
// Per-mount observer state
// =============================================================================

/// Current props slot the tracked render reads from.
struct RenderSlot {
    props: RefCell<Props>,
}

/// Hidden per-mount cell: adapter, phase machine, memo state.
pub(crate) struct ObserverCell<V: Clone + 'static> {
    adapter: ReactionAdapter<V>,
    lifecycle: Rc<LifecycleState>,
    options: ObserverOptions,
    last_props: RefCell<Option<Props>>,
    slot: Rc<RenderSlot>,
}

impl<V: Clone + 'static> ObserverCell<V> {
    /// Dispose the reaction without the destroy report (error-boundary and
    /// unmount hooks; the report is the teardown path's job).
    pub(crate) fn dispose_adapter(&self) {
        self.adapter.dispose();
    }

    /// Full teardown: phase to `Disposed`, adapter disposed, destroy report.
    pub(crate) fn teardown(&self, shared: &Rc<InstanceShared<V>>) {
        if self.lifecycle.dispose() {
            self.adapter.dispose();
            emit_render_event(&RenderEvent {
                kind: RenderEventKind::Destroy,
                component: shared.name(),
                instance: shared.id(),
                at: Instant::now(),
                render_time: None,
                total_time: Some(shared.mounted_at().elapsed()),
            });
        }
    }
}

// =============================================================================
// Tracked render path
// =============================================================================

/// Run one observed render pass for the instance behind `ctx`.
///
/// `target` is the unwrapped render, fixed at wrap time.
fn observed_render<V: Clone + 'static>(
    ctx: &RenderCtx<V>,
    props: &Props,
    name: &Rc<str>,
    options: ObserverOptions,
    target: &RenderFn<V>,
) -> Result<V, RenderError> {
    // Static rendering: one plain pass, no reaction, reads suspended so an
    // enclosing tracked scope does not pick them up.
    if is_static_rendering() {
        return crate::engine::with_tracking_suspended(|| target(props, ctx));
    }

    let shared = ctx.shared().clone();

    // Nested observed render inside the same instance's tracked frame
    // (observer composed with inject composed with observer): the outer
    // reaction already records these reads; a second adapter would
    // double-track every dependency.
    if shared.tracking_active() {
        return target(props, ctx);
    }

    let (cell, first_render) = match shared.observer_cell() {
        Some(cell) => (cell, false),
        None => {
            let lifecycle = Rc::new(LifecycleState::new());
            lifecycle.mount();

            let scheduler = shared.scheduler();
            let invalidate_lifecycle = lifecycle.clone();
            let invalidate_name = name.clone();
            let on_invalidate = Rc::new(move || match invalidate_lifecycle.invalidate() {
                InvalidateOutcome::Schedule => {
                    trace!(component = %invalidate_name, "invalidated; scheduling update");
                    scheduler();
                }
                InvalidateOutcome::Coalesced | InvalidateOutcome::Ignored => {}
            });

            let slot = Rc::new(RenderSlot { props: RefCell::new(props.clone()) });
            let tracked_target = target.clone();
            let tracked_slot = slot.clone();
            let tracked_ctx = ctx.clone();
            let adapter = ReactionAdapter::new(
                name.clone(),
                Box::new(move || {
                    let current = tracked_slot.props.borrow().clone();
                    tracked_target(&current, &tracked_ctx)
                }),
                on_invalidate,
            )
            .map_err(|error| Box::new(error) as RenderError)?;

            let cell = Rc::new(ObserverCell {
                adapter,
                lifecycle,
                options,
                last_props: RefCell::new(None),
                slot,
            });
            shared.set_observer_cell(cell.clone());
            (cell, true)
        }
    };

    // A clean instance re-rendered with unchanged props reuses the cached
    // tree - the host asked, but nothing this component read has changed.
    if !first_render && !cell.lifecycle.is_update_pending() {
        let unchanged = cell
            .last_props
            .borrow()
            .as_ref()
            .is_some_and(|previous| props_equal(previous, props, cell.options.deep_props));
        if unchanged {
            if let Some(tree) = cell.adapter.render_tree() {
                trace!(component = %name, "props unchanged; reusing cached tree");
                return Ok(tree);
            }
        }
    }

    *cell.slot.props.borrow_mut() = props.clone();

    shared.set_tracking_active(true);
    let started = Instant::now();
    let result = cell.adapter.render();
    shared.set_tracking_active(false);

    match result {
        Ok(tree) => {
            cell.lifecycle.rendered();
            *cell.last_props.borrow_mut() = Some(props.clone());
            emit_render_event(&RenderEvent {
                kind: RenderEventKind::Render,
                component: name.clone(),
                instance: shared.id(),
                at: Instant::now(),
                render_time: Some(started.elapsed()),
                total_time: Some(shared.mounted_at().elapsed()),
            });
            Ok(tree)
        }
        Err(error) => {
            // The adapter already disposed itself; no orphaned subscription
            // survives the failed render. Report, then propagate unchanged.
            warn!(component = %name, error = %error, "render failed; reaction disposed");
            emit_render_error(error.as_ref());
            Err(error)
        }
    }
}

// =============================================================================
// Class strategy
// =============================================================================

/// Class body wrapper: tracked render, adapter-aware lifecycle hooks.
struct ObservedClass<V: Clone + 'static> {
    name: Rc<str>,
    options: ObserverOptions,
    body: Rc<RefCell<Box<dyn ClassComponent<V>>>>,
    target: RenderFn<V>,
    shared: RefCell<Option<Rc<InstanceShared<V>>>>,
}

impl<V: Clone + 'static> ObservedClass<V> {
    fn new(name: Rc<str>, options: ObserverOptions, inner: Box<dyn ClassComponent<V>>) -> Self {
        let body = Rc::new(RefCell::new(inner));
        let target_body = body.clone();
        let target: RenderFn<V> = Rc::new(move |props, ctx| {
            let result = target_body.borrow_mut().render(props, ctx);
            result
        });
        Self { name, options, body, target, shared: RefCell::new(None) }
    }

    fn dispose_adapter(&self) {
        if let Some(shared) = self.shared.borrow().as_ref() {
            if let Some(cell) = shared.observer_cell() {
                cell.dispose_adapter();
            }
        }
    }
}

impl<V: Clone + 'static> ClassComponent<V> for ObservedClass<V> {
    fn render(&mut self, props: &Props, ctx: &RenderCtx<V>) -> Result<V, RenderError> {
        *self.shared.borrow_mut() = Some(ctx.shared().clone());
        observed_render(ctx, props, &self.name, self.options, &self.target)
    }

    fn did_mount(&mut self) {
        self.body.borrow_mut().did_mount();
    }

    fn will_unmount(&mut self) {
        // Adapter first: the body's own teardown must not retrigger it.
        self.dispose_adapter();
        self.body.borrow_mut().will_unmount();
    }

    fn did_catch(&mut self, error: &(dyn std::error::Error + 'static)) {
        self.dispose_adapter();
        self.body.borrow_mut().did_catch(error);
    }

    fn handles_errors(&self) -> bool {
        self.body.borrow().handles_errors()
    }
}

// =============================================================================
// Wrapping
// =============================================================================

/// Make a definition's render path tracked.
///
/// Wrapping an already-observed definition is a no-op.
pub fn observer<V: Clone + 'static>(def: Definition<V>) -> Definition<V> {
    observer_with(def, ObserverOptions::default())
}

/// [`observer`] with explicit options.
pub fn observer_with<V: Clone + 'static>(
    def: Definition<V>,
    options: ObserverOptions,
) -> Definition<V> {
    if def.is_observed() {
        return def;
    }

    let name = def.name();
    let flags = def.flags() | DefinitionFlags::OBSERVED;

    match def.shape().clone() {
        DefinitionShape::Function(render) => {
            let observed_name = name.clone();
            let wrapped: RenderFn<V> = Rc::new(move |props, ctx| {
                observed_render(ctx, props, &observed_name, options, &render)
            });
            Definition::from_parts(
                name,
                flags,
                DefinitionShape::Function(wrapped),
                Some(Rc::new(def)),
            )
        }
        DefinitionShape::Class(factory) => {
            let observed_name = name.clone();
            let wrapped: ClassFactory<V> = Rc::new(move || {
                Box::new(ObservedClass::new(observed_name.clone(), options, factory()))
            });
            Definition::from_parts(
                name,
                flags,
                DefinitionShape::Class(wrapped),
                Some(Rc::new(def)),
            )
        }
    }
}

/// Render-prop observer: an inline tracked region.
///
/// The closure is the whole component; observables it reads re-render just
/// this definition, not the enclosing one.
pub fn observer_render<V: Clone + 'static>(
    render: impl Fn() -> Result<V, RenderError> + 'static,
) -> Definition<V> {
    observer(Definition::function("Observer", move |_props, _ctx| render()))
}
