//! # spark-observe
//!
//! Observer bindings for fine-grained reactivity.
//!
//! Connects an observable state engine (signals-style: tracked reads,
//! invalidation on write) to a component-based view layer, re-rendering
//! exactly the components whose tracked reads changed - and nothing else.
//!
//! ## Architecture
//!
//! The binding owns what happens inside one component's render; the engine
//! and the host stay behind capability seams:
//! ```text
//! Definition -> observer() -> tracked render (ReactionAdapter)
//!                                  |  invalidation
//!                                  v
//!                         LifecycleState (coalesce to one pending update)
//!                                  |  request_render
//!                                  v
//!                     host scheduler -> re-render -> fresh tracked tree
//! ```
//! On unmount the instance synchronously disposes its reaction, drains its
//! disposer registry and leaves the instance registry - no stale reactions
//! survive, no redundant renders run.
//!
//! Store injection sits orthogonally: a `provider` extends the store scope
//! for its subtree, `inject` resolves named stores into props before the
//! wrapped render executes, tracked or not.
//!
//! ## Modules
//!
//! - [`host`] - component definitions, mounted instances, render contexts
//! - [`observer`] - the tracked-render wrapper and its options
//! - [`reaction`] - render functions backed by engine reactions
//! - [`lifecycle`] - per-instance phase machine (update coalescing)
//! - [`inject`] - providers and store-to-props resolution
//! - [`dispose`] - per-instance teardown callbacks
//! - [`engine`] - the observable-engine capability seam
//! - [`mode`] - static (non-reactive, single-pass) rendering
//! - [`report`] - render/destroy event channel, error channel
//! - [`registry`] - instance id allocation and weak lookup
//! - [`testkit`] - reference engine and host for tests
//!
//! ## Example
//!
//! ```ignore
//! use std::rc::Rc;
//! use spark_observe::{observer, Definition, Props};
//! use spark_observe::testkit::{TestEngine, TestHost};
//!
//! let engine = TestEngine::new();
//! engine.install();
//! let count = engine.cell(0i32);
//!
//! let read = count.clone();
//! let counter = observer(Definition::function("Counter", move |_props, _ctx| {
//!     Ok(format!("count: {}", read.get()))
//! }));
//!
//! let host = TestHost::new();
//! let id = host.mount(counter, Props::new())?;
//! assert_eq!(host.output(id).as_deref(), Some("count: 0"));
//!
//! count.set(1);          // invalidates the one component that read it
//! host.flush();          // exactly one re-render
//! assert_eq!(host.output(id).as_deref(), Some("count: 1"));
//! ```

pub mod dispose;
pub mod engine;
pub mod error;
pub mod host;
pub mod inject;
pub mod lifecycle;
pub mod mode;
pub mod props;
pub mod reaction;
pub mod registry;
pub mod report;
pub mod observer;
pub mod stores;
pub mod testkit;
pub mod types;

// Re-export commonly used items
pub use types::{Cleanup, Disposer, RenderError, StoreRef};

pub use error::ObserveError;

pub use props::{props_equal, PropData, PropValue, Props, CHILDREN};

pub use engine::{
    engine as installed_engine, reset_engine, set_engine, with_tracking_suspended,
    EngineReaction, ReactiveEngine,
};

pub use mode::{is_static_rendering, use_static_rendering};

pub use dispose::{dispose_on_unmount, dispose_on_unmount_all, DisposerRegistry};

pub use lifecycle::{InvalidateOutcome, LifecycleState, Phase};

pub use reaction::{ReactionAdapter, TrackedRender};

pub use host::{
    ClassComponent, ClassFactory, Definition, DefinitionFlags, DefinitionShape,
    MountedInstance, RenderCtx, RenderFn,
};

pub use observer::{observer, observer_render, observer_with, ObserverOptions};

pub use inject::{
    inject, inject_with, observer_with_stores, provider, StoreMapper, STORES,
};

pub use stores::{StoreMap, StoreScope};

pub use report::{
    on_error, on_render_report, reset_reporting, RenderEvent, RenderEventKind,
};

pub use registry::{
    instance_name, live_count, live_instance, reset_instances, InstanceId,
};
