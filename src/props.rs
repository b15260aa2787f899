//! Props - ordered runtime property map with identity and deep equality.
//!
//! Props cross the boundary between the host, the injection layer, and the
//! wrapped render, so they are dynamically typed. A prop value is either:
//! - [`PropValue::Value`] - an owned comparable value (supports deep
//!   equality via `PartialEq`)
//! - [`PropValue::Shared`] - an opaque shared reference compared by
//!   identity (injected stores, child view trees, render callbacks)
//!
//! Insertion order is preserved; inserting an existing key overwrites in
//! place. Merging follows injection semantics: explicit props override
//! injected ones.

use std::any::Any;
use std::rc::Rc;

/// Prop key under which hosts pass child content to container components.
pub const CHILDREN: &str = "children";

// =============================================================================
// Comparable values
// =============================================================================

/// Object-safe view of an owned prop value that knows how to compare itself.
pub trait PropData: Any {
    /// Upcast for downcasting to the concrete type.
    fn as_any(&self) -> &dyn Any;

    /// Deep equality against another value of (possibly) the same type.
    ///
    /// Values of different concrete types are never equal.
    fn deep_eq(&self, other: &dyn PropData) -> bool;
}

impl<T: Any + PartialEq> PropData for T {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn deep_eq(&self, other: &dyn PropData) -> bool {
        match other.as_any().downcast_ref::<T>() {
            Some(other) => self == other,
            None => false,
        }
    }
}

// =============================================================================
// Prop values
// =============================================================================

/// A single prop: owned comparable value or identity-compared reference.
#[derive(Clone)]
pub enum PropValue {
    /// Owned value; deep comparison available through `PartialEq`.
    Value(Rc<dyn PropData>),
    /// Shared reference; always compared by identity.
    Shared(Rc<dyn Any>),
}

impl PropValue {
    /// Wrap an owned comparable value.
    pub fn value<T: Any + PartialEq>(value: T) -> Self {
        PropValue::Value(Rc::new(value))
    }

    /// Wrap a shared reference compared by identity.
    pub fn shared<T: Any>(value: Rc<T>) -> Self {
        PropValue::Shared(value)
    }

    /// Identity comparison (same allocation).
    pub fn same_ref(&self, other: &PropValue) -> bool {
        let a = self.data_ptr();
        let b = other.data_ptr();
        a == b
    }

    /// Deep comparison where possible, identity otherwise.
    pub fn deep_eq(&self, other: &PropValue) -> bool {
        match (self, other) {
            (PropValue::Value(a), PropValue::Value(b)) => a.deep_eq(b.as_ref()),
            _ => self.same_ref(other),
        }
    }

    // Thin-pointer identity; fat-pointer metadata is irrelevant here.
    fn data_ptr(&self) -> *const () {
        match self {
            PropValue::Value(rc) => Rc::as_ptr(rc) as *const (),
            PropValue::Shared(rc) => Rc::as_ptr(rc) as *const (),
        }
    }
}

// =============================================================================
// Props map
// =============================================================================

/// Insertion-ordered prop map.
#[derive(Clone, Default)]
pub struct Props {
    entries: Vec<(Rc<str>, PropValue)>,
}

impl Props {
    /// Empty prop map.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert of an owned comparable value.
    pub fn with<T: Any + PartialEq>(mut self, key: &str, value: T) -> Self {
        self.insert(key, PropValue::value(value));
        self
    }

    /// Builder-style insert of a shared reference.
    pub fn with_shared<T: Any>(mut self, key: &str, value: Rc<T>) -> Self {
        self.insert(key, PropValue::shared(value));
        self
    }

    /// Insert or overwrite a prop, preserving first-insertion position.
    pub fn insert(&mut self, key: &str, value: PropValue) {
        if let Some(entry) = self.entries.iter_mut().find(|(k, _)| k.as_ref() == key) {
            entry.1 = value;
        } else {
            self.entries.push((Rc::from(key), value));
        }
    }

    /// Look up a raw prop value.
    pub fn get(&self, key: &str) -> Option<&PropValue> {
        self.entries
            .iter()
            .find(|(k, _)| k.as_ref() == key)
            .map(|(_, v)| v)
    }

    /// Look up and downcast an owned value prop.
    pub fn get_value<T: Any + PartialEq>(&self, key: &str) -> Option<&T> {
        match self.get(key)? {
            PropValue::Value(data) => data.as_any().downcast_ref::<T>(),
            PropValue::Shared(_) => None,
        }
    }

    /// Look up and downcast a shared reference prop.
    pub fn get_shared<T: Any>(&self, key: &str) -> Option<Rc<T>> {
        match self.get(key)? {
            PropValue::Shared(any) => any.clone().downcast::<T>().ok(),
            PropValue::Value(_) => None,
        }
    }

    /// Whether a prop with this key exists.
    pub fn contains(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    /// Merge `overrides` on top of `self`, returning the combined map.
    ///
    /// Injection semantics: every key in `overrides` wins over the same key
    /// in `self`, and order is base-first.
    pub fn merged_with(&self, overrides: &Props) -> Props {
        let mut out = self.clone();
        for (key, value) in &overrides.entries {
            out.insert(key, value.clone());
        }
        out
    }

    /// Number of props.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the map is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterate entries in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &PropValue)> {
        self.entries.iter().map(|(k, v)| (k.as_ref(), v))
    }
}

/// Compare two prop maps key-by-key.
///
/// With `deep` false this is a shallow comparison (identity per value, the
/// host-library convention). With `deep` true, owned values compare through
/// `PartialEq`; shared references still compare by identity.
pub fn props_equal(a: &Props, b: &Props, deep: bool) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b.iter()).all(|((ka, va), (kb, vb))| {
        ka == kb && if deep { va.deep_eq(vb) } else { va.same_ref(vb) }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insert_preserves_order_and_overwrites() {
        let mut props = Props::new();
        props.insert("a", PropValue::value(1i32));
        props.insert("b", PropValue::value(2i32));
        props.insert("a", PropValue::value(10i32));

        let keys: Vec<&str> = props.iter().map(|(k, _)| k).collect();
        assert_eq!(keys, vec!["a", "b"]);
        assert_eq!(props.get_value::<i32>("a"), Some(&10));
    }

    #[test]
    fn test_merged_with_overrides_win() {
        let injected = Props::new().with("counter", 1i32).with("label", "x".to_string());
        let own = Props::new().with("label", "explicit".to_string());

        let merged = injected.merged_with(&own);
        assert_eq!(merged.get_value::<String>("label").unwrap(), "explicit");
        assert_eq!(merged.get_value::<i32>("counter"), Some(&1));
    }

    #[test]
    fn test_shallow_equality_is_identity() {
        let a = Props::new().with("n", 5i32);
        let b = Props::new().with("n", 5i32);

        // Same contents, different allocations.
        assert!(!props_equal(&a, &b, false));
        assert!(props_equal(&a, &b, true));
        assert!(props_equal(&a, &a.clone(), false));
    }

    #[test]
    fn test_shared_props_compare_by_identity_even_deep() {
        let store = Rc::new(41i32);
        let a = Props::new().with_shared("store", store.clone());
        let b = Props::new().with_shared("store", store.clone());
        let c = Props::new().with_shared("store", Rc::new(41i32));

        assert!(props_equal(&a, &b, true));
        assert!(!props_equal(&a, &c, true));
    }

    #[test]
    fn test_get_shared_downcasts() {
        let store = Rc::new("hello".to_string());
        let props = Props::new().with_shared("s", store.clone());

        let resolved = props.get_shared::<String>("s").unwrap();
        assert!(Rc::ptr_eq(&resolved, &store));
        assert!(props.get_shared::<i32>("s").is_none());
    }
}
