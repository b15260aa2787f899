//! Store maps and provider scopes.
//!
//! A [`StoreMap`] is the set of named stores one provider exposes; a
//! [`StoreScope`] is the chain of maps assembled by walking ancestor
//! providers. Descendants only ever look stores up - the scope hands out
//! shared references, never ownership, and nothing a consumer does can
//! mutate what an ancestor provides.

use std::any::Any;
use std::rc::Rc;

use crate::types::StoreRef;

// =============================================================================
// Store map
// =============================================================================

/// Insertion-ordered mapping from store name to store reference.
#[derive(Clone, Default)]
pub struct StoreMap {
    entries: Vec<(Rc<str>, StoreRef)>,
}

impl StoreMap {
    /// Empty map.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert.
    pub fn with<T: Any>(mut self, name: &str, store: Rc<T>) -> Self {
        self.insert(name, store);
        self
    }

    /// Insert or overwrite a store, preserving first-insertion position.
    pub fn insert<T: Any>(&mut self, name: &str, store: Rc<T>) {
        let store: StoreRef = store;
        if let Some(entry) = self.entries.iter_mut().find(|(k, _)| k.as_ref() == name) {
            entry.1 = store;
        } else {
            self.entries.push((Rc::from(name), store));
        }
    }

    /// Look up a store by name.
    pub fn get(&self, name: &str) -> Option<StoreRef> {
        self.entries
            .iter()
            .find(|(k, _)| k.as_ref() == name)
            .map(|(_, v)| v.clone())
    }

    /// Look up and downcast a store.
    pub fn get_as<T: Any>(&self, name: &str) -> Option<Rc<T>> {
        self.get(name)?.downcast::<T>().ok()
    }

    /// Number of stores.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the map is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterate entries in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &StoreRef)> {
        self.entries.iter().map(|(k, v)| (k.as_ref(), v))
    }

    /// Whether both maps expose the same names bound to the same references.
    ///
    /// Identity comparison - providers refuse to swap a store out from under
    /// mounted consumers, and this is the check that detects the attempt.
    pub fn same_stores(&self, other: &StoreMap) -> bool {
        self.len() == other.len()
            && self.iter().zip(other.iter()).all(|((ka, va), (kb, vb))| {
                ka == kb && Rc::ptr_eq(va, vb)
            })
    }
}

// =============================================================================
// Provider scope chain
// =============================================================================

/// One level of the ancestor provider chain.
///
/// Lookup walks from the nearest provider outwards, so an inner provider
/// shadows an outer one exposing the same name.
pub struct StoreScope {
    local: StoreMap,
    parent: Option<Rc<StoreScope>>,
}

impl StoreScope {
    /// The empty root scope (no providers above).
    pub fn root() -> Rc<Self> {
        Rc::new(Self { local: StoreMap::new(), parent: None })
    }

    /// Extend this scope with one provider's stores.
    pub fn extend(self: &Rc<Self>, stores: StoreMap) -> Rc<Self> {
        Rc::new(Self { local: stores, parent: Some(self.clone()) })
    }

    /// Resolve a store by name, nearest provider first.
    pub fn lookup(&self, name: &str) -> Option<StoreRef> {
        match self.local.get(name) {
            Some(store) => Some(store),
            None => self.parent.as_ref()?.lookup(name),
        }
    }

    /// Resolve and downcast a store.
    pub fn lookup_as<T: Any>(&self, name: &str) -> Option<Rc<T>> {
        self.lookup(name)?.downcast::<T>().ok()
    }

    /// Flatten the chain into one map, nearest provider winning.
    ///
    /// Used by mapper-style injection, which receives the whole store set.
    pub fn flatten(&self) -> StoreMap {
        let mut out = match &self.parent {
            Some(parent) => parent.flatten(),
            None => StoreMap::new(),
        };
        for (name, store) in self.local.iter() {
            if let Some(entry) = out.entries.iter_mut().find(|(k, _)| k.as_ref() == name) {
                entry.1 = store.clone();
            } else {
                out.entries.push((Rc::from(name), store.clone()));
            }
        }
        out
    }

    /// Depth of the chain (number of providers above this point).
    pub fn depth(&self) -> usize {
        match &self.parent {
            Some(parent) => parent.depth() + 1,
            None => 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Counter {
        count: i32,
    }

    #[test]
    fn test_lookup_walks_ancestors() {
        let counter = Rc::new(Counter { count: 3 });
        let root = StoreScope::root();
        let outer = root.extend(StoreMap::new().with("counter", counter.clone()));
        let inner = outer.extend(StoreMap::new().with("theme", Rc::new("dark".to_string())));

        let resolved = inner.lookup_as::<Counter>("counter").unwrap();
        assert!(Rc::ptr_eq(&resolved, &counter));
        assert_eq!(resolved.count, 3);
        assert!(inner.lookup("missing").is_none());
    }

    #[test]
    fn test_inner_provider_shadows_outer() {
        let outer_store = Rc::new(1i32);
        let inner_store = Rc::new(2i32);

        let scope = StoreScope::root()
            .extend(StoreMap::new().with("n", outer_store))
            .extend(StoreMap::new().with("n", inner_store.clone()));

        let resolved = scope.lookup_as::<i32>("n").unwrap();
        assert!(Rc::ptr_eq(&resolved, &inner_store));
    }

    #[test]
    fn test_flatten_prefers_nearest() {
        let scope = StoreScope::root()
            .extend(StoreMap::new().with("a", Rc::new(1i32)).with("b", Rc::new(1i32)))
            .extend(StoreMap::new().with("b", Rc::new(2i32)));

        let flat = scope.flatten();
        assert_eq!(flat.len(), 2);
        assert_eq!(*flat.get_as::<i32>("b").unwrap(), 2);
        assert_eq!(*flat.get_as::<i32>("a").unwrap(), 1);
    }

    #[test]
    fn test_same_stores_is_identity() {
        let store = Rc::new(7i32);
        let a = StoreMap::new().with("n", store.clone());
        let b = StoreMap::new().with("n", store);
        let c = StoreMap::new().with("n", Rc::new(7i32));

        assert!(a.same_stores(&b));
        assert!(!a.same_stores(&c));
    }
}
