//! Instance registry - id allocation and non-owning instance lookup.
//!
//! Every mounted instance gets a process-unique [`InstanceId`] and a weak
//! registry entry. Entries are removed explicitly on unmount - the registry
//! never keeps an instance alive and never relies on garbage-style cleanup.
//! Render report events carry the id, so external listeners can resolve the
//! subject instance while it is alive.

use std::any::Any;
use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::rc::{Rc, Weak};

// =============================================================================
// Instance ids
// =============================================================================

/// Process-unique identifier of one mounted component instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct InstanceId(u64);

impl fmt::Display for InstanceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "i{}", self.0)
    }
}

struct Entry {
    name: Rc<str>,
    instance: Weak<dyn Any>,
}

thread_local! {
    /// Registered instances by id.
    static INSTANCES: RefCell<HashMap<InstanceId, Entry>> = RefCell::new(HashMap::new());

    /// Counter for id allocation.
    static NEXT_ID: RefCell<u64> = const { RefCell::new(0) };
}

// =============================================================================
// Registration
// =============================================================================

/// Register a freshly mounted instance. Returns its id.
pub fn register_instance(name: Rc<str>, instance: Weak<dyn Any>) -> InstanceId {
    let id = NEXT_ID.with(|next| {
        let mut next = next.borrow_mut();
        let id = InstanceId(*next);
        *next += 1;
        id
    });
    INSTANCES.with(|map| {
        map.borrow_mut().insert(id, Entry { name, instance });
    });
    id
}

/// Remove an instance on unmount.
///
/// Must be called explicitly by the teardown path; entries are never
/// collected implicitly.
pub fn unregister_instance(id: InstanceId) {
    INSTANCES.with(|map| {
        map.borrow_mut().remove(&id);
    });
}

// =============================================================================
// Lookups
// =============================================================================

/// Resolve a live instance by id.
///
/// None once the instance unmounted or dropped.
pub fn live_instance(id: InstanceId) -> Option<Rc<dyn Any>> {
    INSTANCES.with(|map| map.borrow().get(&id).and_then(|entry| entry.instance.upgrade()))
}

/// Component name an id was registered under.
pub fn instance_name(id: InstanceId) -> Option<Rc<str>> {
    INSTANCES.with(|map| map.borrow().get(&id).map(|entry| entry.name.clone()))
}

/// Number of registered (not yet unregistered) instances.
pub fn live_count() -> usize {
    INSTANCES.with(|map| map.borrow().len())
}

// =============================================================================
// Reset (for testing)
// =============================================================================

/// Clear all registry state (for testing).
pub fn reset_instances() {
    INSTANCES.with(|map| map.borrow_mut().clear());
    NEXT_ID.with(|next| *next.borrow_mut() = 0);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_register_lookup_unregister() {
        reset_instances();

        let subject: Rc<dyn Any> = Rc::new(42i32);
        let id = register_instance(Rc::from("Probe"), Rc::downgrade(&subject));

        assert_eq!(live_count(), 1);
        assert_eq!(instance_name(id).as_deref(), Some("Probe"));
        let resolved = live_instance(id).unwrap();
        assert_eq!(*resolved.downcast::<i32>().unwrap(), 42);

        unregister_instance(id);
        assert_eq!(live_count(), 0);
        assert!(live_instance(id).is_none());
    }

    #[test]
    fn test_entries_are_non_owning() {
        reset_instances();

        let subject: Rc<dyn Any> = Rc::new(1i32);
        let id = register_instance(Rc::from("Probe"), Rc::downgrade(&subject));
        drop(subject);

        // The entry is still present until explicitly removed, but the
        // instance itself is gone.
        assert_eq!(live_count(), 1);
        assert!(live_instance(id).is_none());

        unregister_instance(id);
        reset_instances();
    }

    #[test]
    fn test_ids_are_unique() {
        reset_instances();

        let a: Rc<dyn Any> = Rc::new(());
        let b: Rc<dyn Any> = Rc::new(());
        let id_a = register_instance(Rc::from("A"), Rc::downgrade(&a));
        let id_b = register_instance(Rc::from("B"), Rc::downgrade(&b));
        assert_ne!(id_a, id_b);

        reset_instances();
    }
}
