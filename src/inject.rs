//! Store injection - providers and store-to-props resolution.
//!
//! A provider extends the store scope for its subtree; `inject` produces a
//! definition whose render first resolves named stores from the ancestor
//! scope (or runs a mapper over the whole store set) and merges them into
//! props before delegating. Explicit props always win over injected ones.
//!
//! Injection is independent of reactivity and commutes with `observer`:
//! `observer(inject(..)(def))` and `inject(..)(observer(def))` both produce
//! a component whose render is store-resolved and tracked.

use std::any::Any;
use std::rc::Rc;

use tracing::warn;

use crate::error::ObserveError;
use crate::host::{
    ClassBody, Definition, DefinitionFlags, DefinitionShape, RenderCtx, RenderFn,
};
use crate::props::{Props, PropValue, CHILDREN};
use crate::stores::StoreMap;
use crate::types::RenderError;

// =============================================================================
// Provider
// =============================================================================

/// Prop key a provider accepts its store map under, overriding the map it
/// was created with.
pub const STORES: &str = "stores";

/// Definition that exposes `stores` to every descendant.
///
/// Renders to its `children` prop unchanged. The store set is fixed for the
/// life of the mount: passing a different `stores` prop identity on a later
/// render is refused - the original set is kept and a warning is logged,
/// because mounted consumers hold resolved references that must stay valid.
pub fn provider<V: Clone + 'static>(stores: StoreMap) -> Definition<V> {
    let render = move |props: &Props, ctx: &RenderCtx<V>| {
        let requested = match props.get_shared::<StoreMap>(STORES) {
            Some(from_props) => (*from_props).clone(),
            None => stores.clone(),
        };

        match ctx.shared().provided_map() {
            None => ctx.provide(requested),
            Some(previous) => {
                if !previous.same_stores(&requested) {
                    warn!(
                        component = %ctx.component_name(),
                        "provider store set changed identity across renders; keeping the original stores"
                    );
                }
            }
        }

        let children = props.get_shared::<V>(CHILDREN).ok_or_else(|| {
            Box::new(ObserveError::MissingChildren { component: "Provider".to_string() })
                as RenderError
        })?;
        Ok((*children).clone())
    };

    Definition::from_parts(
        Rc::from("Provider"),
        DefinitionFlags::PROVIDER,
        DefinitionShape::Function(Rc::new(render)),
        None,
    )
}

// =============================================================================
// Injection
// =============================================================================

/// Mapper-style injection: full programmatic control over the extra props.
///
/// Receives the flattened ancestor store set, the component's own props and
/// the instance context; returns the props to merge underneath them.
pub type StoreMapper<V> = Rc<dyn Fn(&StoreMap, &Props, &RenderCtx<V>) -> Props>;

enum InjectSource<V: Clone + 'static> {
    Names(Vec<Rc<str>>),
    Mapper(StoreMapper<V>),
}

impl<V: Clone + 'static> Clone for InjectSource<V> {
    fn clone(&self) -> Self {
        match self {
            InjectSource::Names(names) => InjectSource::Names(names.clone()),
            InjectSource::Mapper(mapper) => InjectSource::Mapper(mapper.clone()),
        }
    }
}

/// Resolve `names` from the ancestor scope and merge them into props.
///
/// Returns the definition transformer; apply it to the component that wants
/// the stores. Resolution failure is fail-fast:
/// [`ObserveError::MissingStore`] names both the store and the component.
pub fn inject<V: Clone + 'static>(
    names: &[&str],
) -> Box<dyn Fn(Definition<V>) -> Definition<V>> {
    let names: Vec<Rc<str>> = names.iter().map(|name| Rc::from(*name)).collect();
    Box::new(move |def| apply_inject(def, InjectSource::Names(names.clone())))
}

/// Injection with a mapper function instead of a name list.
pub fn inject_with<V: Clone + 'static>(
    mapper: impl Fn(&StoreMap, &Props, &RenderCtx<V>) -> Props + 'static,
) -> Box<dyn Fn(Definition<V>) -> Definition<V>> {
    let mapper: StoreMapper<V> = Rc::new(mapper);
    Box::new(move |def| apply_inject(def, InjectSource::Mapper(mapper.clone())))
}

fn inject_label<V: Clone + 'static>(source: &InjectSource<V>, inner: &str) -> String {
    match source {
        InjectSource::Names(names) => {
            let joined: Vec<&str> = names.iter().map(|name| name.as_ref()).collect();
            format!("inject-{}({})", joined.join("-"), inner)
        }
        InjectSource::Mapper(_) => format!("inject-with-fn({})", inner),
    }
}

fn resolve_extra_props<V: Clone + 'static>(
    source: &InjectSource<V>,
    props: &Props,
    ctx: &RenderCtx<V>,
    component: &Rc<str>,
) -> Result<Props, RenderError> {
    match source {
        InjectSource::Names(names) => {
            let scope = ctx.stores();
            let mut extra = Props::new();
            for name in names {
                let store = scope.lookup(name).ok_or_else(|| {
                    warn!(component = %component, store = %name, "store resolution failed");
                    Box::new(ObserveError::MissingStore {
                        store: name.to_string(),
                        component: component.to_string(),
                    }) as RenderError
                })?;
                extra.insert(name, PropValue::Shared(store));
            }
            Ok(extra)
        }
        InjectSource::Mapper(mapper) => {
            let flat = ctx.stores().flatten();
            Ok(mapper(&flat, props, ctx))
        }
    }
}

fn apply_inject<V: Clone + 'static>(
    def: Definition<V>,
    source: InjectSource<V>,
) -> Definition<V> {
    let inner_name = def.name();
    let label: Rc<str> = Rc::from(inject_label(&source, &inner_name).as_str());
    let flags = def.flags() | DefinitionFlags::INJECTED;
    let inner = Rc::new(def);

    let render_inner = inner.clone();
    let render: RenderFn<V> = Rc::new(move |props, ctx| {
        let extra = resolve_extra_props(&source, props, ctx, &inner_name)?;
        // Injected props underneath, explicit props on top.
        let merged = extra.merged_with(props);

        match render_inner.shape() {
            DefinitionShape::Function(render) => render(&merged, ctx),
            DefinitionShape::Class(factory) => {
                render_wrapped_class(factory, &merged, ctx)
            }
        }
    });

    Definition::from_parts(label, flags, DefinitionShape::Function(render), Some(inner))
}

/// Render an inner class-style definition from inside the injecting
/// wrapper.
///
/// The body is created once per mount, kept in the instance's hidden slot,
/// exposed through the introspection probe, and receives `did_mount` after
/// its first render; the unmount path delivers `will_unmount` and clears
/// the probe.
fn render_wrapped_class<V: Clone + 'static>(
    factory: &Rc<dyn Fn() -> Box<dyn crate::host::ClassComponent<V>>>,
    props: &Props,
    ctx: &RenderCtx<V>,
) -> Result<V, RenderError> {
    let shared = ctx.shared();
    let (body, created): (ClassBody<V>, bool) = match shared.injected_body() {
        Some(body) => (body, false),
        None => {
            let body: ClassBody<V> = Rc::new(std::cell::RefCell::new(factory()));
            shared.set_injected_body(body.clone());
            shared.set_wrapped_probe(body.clone() as Rc<dyn Any>);
            (body, true)
        }
    };

    let output = {
        let mut body = body.borrow_mut();
        body.render(props, ctx)
    };

    if created && output.is_ok() {
        body.borrow_mut().did_mount();
    }
    output
}

// =============================================================================
// Deprecated-style combined form
// =============================================================================

/// Observe a definition and inject stores in one step.
///
/// Equivalent to `inject(names)(observer(def))`; kept because the combined
/// form is common at call sites.
pub fn observer_with_stores<V: Clone + 'static>(
    names: &[&str],
    def: Definition<V>,
) -> Definition<V> {
    inject(names)(crate::observer::observer(def))
}
