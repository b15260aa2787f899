//! Reference host - retained instances, scheduled updates, store scopes.
//!
//! A deliberately small retained-mode host over `V = String`: it mounts
//! definitions, renders through [`MountedInstance`], queues re-render
//! requests coming from the binding's scheduler, executes them on
//! [`flush`](TestHost::flush), propagates store scopes to child mounts and
//! unmounts on request. Reconciliation is out of scope - parents and
//! children are mounted explicitly.

use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::fmt;
use std::rc::{Rc, Weak};

use crate::host::{Definition, MountedInstance};
use crate::props::Props;
use crate::stores::StoreScope;
use crate::types::RenderError;

// =============================================================================
// Host ids
// =============================================================================

/// Host-side handle for one mount.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct HostId(u64);

impl fmt::Display for HostId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "h{}", self.0)
    }
}

struct Record {
    instance: Rc<MountedInstance<String>>,
    props: RefCell<Props>,
    output: RefCell<Option<String>>,
    last_error: RefCell<Option<String>>,
}

struct HostState {
    records: RefCell<HashMap<HostId, Record>>,
    queue: RefCell<Vec<HostId>>,
    next: Cell<u64>,
    renders: Cell<usize>,
}

/// Minimal driving host for tests.
#[derive(Clone)]
pub struct TestHost {
    state: Rc<HostState>,
}

impl Default for TestHost {
    fn default() -> Self {
        Self::new()
    }
}

impl TestHost {
    /// Fresh host with no mounts.
    pub fn new() -> Self {
        Self {
            state: Rc::new(HostState {
                records: RefCell::new(HashMap::new()),
                queue: RefCell::new(Vec::new()),
                next: Cell::new(0),
                renders: Cell::new(0),
            }),
        }
    }

    /// Mount `def` at the root scope and render it once.
    pub fn mount(&self, def: Definition<String>, props: Props) -> Result<HostId, RenderError> {
        self.mount_at(def, props, StoreScope::root())
    }

    /// Mount `def` under `parent`, inheriting the parent's child scope.
    pub fn mount_child(
        &self,
        parent: HostId,
        def: Definition<String>,
        props: Props,
    ) -> Result<HostId, RenderError> {
        let stores = {
            let records = self.state.records.borrow();
            let record = records.get(&parent).ok_or_else(|| {
                RenderError::from(format!("no mounted instance {parent}"))
            })?;
            record.instance.child_stores()
        };
        self.mount_at(def, props, stores)
    }

    fn mount_at(
        &self,
        def: Definition<String>,
        props: Props,
        stores: Rc<StoreScope>,
    ) -> Result<HostId, RenderError> {
        let id = HostId(self.state.next.get());
        self.state.next.set(id.0 + 1);

        // Weak back-reference: the scheduler must not keep the host alive.
        let weak: Weak<HostState> = Rc::downgrade(&self.state);
        let scheduler = Rc::new(move || {
            if let Some(state) = weak.upgrade() {
                state.queue.borrow_mut().push(id);
            }
        });

        let instance = MountedInstance::mount(def, scheduler, stores);

        self.state.renders.set(self.state.renders.get() + 1);
        let first = instance.render(&props);
        match first {
            Ok(output) => {
                instance.notify_mounted();
                self.state.records.borrow_mut().insert(
                    id,
                    Record {
                        instance,
                        props: RefCell::new(props),
                        output: RefCell::new(Some(output)),
                        last_error: RefCell::new(None),
                    },
                );
                Ok(id)
            }
            Err(error) => {
                instance.unmount();
                Err(error)
            }
        }
    }

    /// Latest successful render output.
    pub fn output(&self, id: HostId) -> Option<String> {
        self.state
            .records
            .borrow()
            .get(&id)
            .and_then(|record| record.output.borrow().clone())
    }

    /// Message of the latest failed render, if the last render failed.
    pub fn last_error(&self, id: HostId) -> Option<String> {
        self.state
            .records
            .borrow()
            .get(&id)
            .and_then(|record| record.last_error.borrow().clone())
    }

    /// The mounted instance behind a host id.
    pub fn instance(&self, id: HostId) -> Option<Rc<MountedInstance<String>>> {
        self.state.records.borrow().get(&id).map(|record| record.instance.clone())
    }

    /// Replace the props the next render will use.
    pub fn set_props(&self, id: HostId, props: Props) {
        if let Some(record) = self.state.records.borrow().get(&id) {
            *record.props.borrow_mut() = props;
        }
    }

    /// Host-driven render pass (parent updated, new props arrived, ...).
    pub fn rerender(&self, id: HostId) -> Result<(), RenderError> {
        let (instance, props) = {
            let records = self.state.records.borrow();
            let record = records.get(&id).ok_or_else(|| {
                RenderError::from(format!("no mounted instance {id}"))
            })?;
            (record.instance.clone(), record.props.borrow().clone())
        };

        self.state.renders.set(self.state.renders.get() + 1);
        let result = instance.render(&props);
        let records = self.state.records.borrow();
        match result {
            Ok(output) => {
                if let Some(record) = records.get(&id) {
                    *record.output.borrow_mut() = Some(output);
                    *record.last_error.borrow_mut() = None;
                }
                Ok(())
            }
            Err(error) => {
                if let Some(record) = records.get(&id) {
                    *record.last_error.borrow_mut() = Some(error.to_string());
                }
                Err(error)
            }
        }
    }

    /// Execute queued re-render requests. Returns how many render passes
    /// actually ran; requests for unmounted instances are dropped.
    pub fn flush(&self) -> usize {
        let queued: Vec<HostId> = {
            let mut queue = self.state.queue.borrow_mut();
            let mut seen = Vec::new();
            for id in queue.drain(..) {
                if !seen.contains(&id) {
                    seen.push(id);
                }
            }
            seen
        };

        let mut ran = 0;
        for id in queued {
            let exists = self.state.records.borrow().contains_key(&id);
            if !exists {
                continue;
            }
            let _ = self.rerender(id);
            ran += 1;
        }
        ran
    }

    /// Number of queued, not yet flushed update requests.
    pub fn pending_updates(&self) -> usize {
        self.state.queue.borrow().len()
    }

    /// Total render passes this host has executed.
    pub fn render_count(&self) -> usize {
        self.state.renders.get()
    }

    /// Unmount and forget an instance; queued updates for it are dropped.
    pub fn unmount(&self, id: HostId) {
        let record = self.state.records.borrow_mut().remove(&id);
        if let Some(record) = record {
            record.instance.unmount();
        }
        self.state.queue.borrow_mut().retain(|queued| *queued != id);
    }
}
