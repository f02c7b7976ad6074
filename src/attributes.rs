//! Key → value-set storage.
//!
//! [`AttributeMap`] is the passive store underneath
//! [`AttributeDatabase`](crate::database::AttributeDatabase). It enforces the
//! storage invariant that a present key is always bound to a non-empty set;
//! observer notification and cache invalidation are layered on top by the
//! database.

use std::collections::{BTreeMap, BTreeSet};

use crate::value::Value;

/// The set of values bound to one key. Duplicates are coalesced by equality.
pub type ValueSet = BTreeSet<Value>;

static EMPTY_SET: ValueSet = BTreeSet::new();

/// Mapping from attribute keys to their bound values.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AttributeMap {
    entries: BTreeMap<String, ValueSet>,
}

impl AttributeMap {
    /// Creates an empty map.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Values bound to `key`, or `None` if the key is absent.
    ///
    /// Never returns an empty set.
    #[must_use]
    pub fn values(&self, key: &str) -> Option<&ValueSet> {
        self.entries.get(key)
    }

    /// Values bound to `key`; the empty set if the key is absent.
    #[must_use]
    pub fn get(&self, key: &str) -> &ValueSet {
        self.entries.get(key).unwrap_or(&EMPTY_SET)
    }

    /// Returns true if `key` is bound.
    #[must_use]
    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    /// Returns true if `value` is among the values bound to `key`.
    #[must_use]
    pub fn contains(&self, key: &str, value: &Value) -> bool {
        self.entries.get(key).is_some_and(|set| set.contains(value))
    }

    /// Returns true if `key` is bound to exactly `{value}`.
    #[must_use]
    pub fn is_exactly(&self, key: &str, value: &Value) -> bool {
        self.entries
            .get(key)
            .is_some_and(|set| set.len() == 1 && set.contains(value))
    }

    /// Number of keys.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if no key is bound.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterates bound keys in order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    /// Iterates keys in order together with their value sets.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &ValueSet)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub(crate) fn insert(&mut self, key: &str, value: Value) -> bool {
        match self.entries.get_mut(key) {
            Some(set) => set.insert(value),
            None => {
                self.entries.insert(key.to_string(), BTreeSet::from([value]));
                true
            }
        }
    }

    pub(crate) fn replace(&mut self, key: &str, value: Value) -> Option<ValueSet> {
        self.entries.insert(key.to_string(), BTreeSet::from([value]))
    }

    pub(crate) fn remove_value(&mut self, key: &str, value: &Value) -> bool {
        let Some(set) = self.entries.get_mut(key) else {
            return false;
        };
        let removed = set.remove(value);
        if set.is_empty() {
            self.entries.remove(key);
        }
        removed
    }

    pub(crate) fn remove_key(&mut self, key: &str) -> Option<ValueSet> {
        self.entries.remove(key)
    }

    /// Rebinds `key` to `values` wholesale; an empty or missing set removes the key.
    pub(crate) fn set_values(&mut self, key: &str, values: Option<ValueSet>) {
        match values {
            Some(set) if !set.is_empty() => {
                self.entries.insert(key.to_string(), set);
            }
            _ => {
                self.entries.remove(key);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insert_coalesces_duplicates() {
        let mut map = AttributeMap::new();
        assert!(map.insert("x", Value::from(1)));
        assert!(!map.insert("x", Value::from(1)));
        assert!(map.insert("x", Value::from(2)));
        assert_eq!(map.get("x").len(), 2);
    }

    #[test]
    fn test_get_absent_key_is_empty() {
        let map = AttributeMap::new();
        assert!(map.get("missing").is_empty());
        assert!(map.values("missing").is_none());
        assert!(!map.contains_key("missing"));
    }

    #[test]
    fn test_remove_last_value_removes_key() {
        let mut map = AttributeMap::new();
        map.insert("x", Value::from("a"));
        assert!(!map.remove_value("x", &Value::from("b")));
        assert!(map.contains_key("x"));
        assert!(map.remove_value("x", &Value::from("a")));
        assert!(!map.contains_key("x"));
        assert!(!map.remove_value("x", &Value::from("a")));
    }

    #[test]
    fn test_replace_returns_previous() {
        let mut map = AttributeMap::new();
        map.insert("x", Value::from(1));
        map.insert("x", Value::from(2));
        let previous = map.replace("x", Value::from(3)).unwrap();
        assert_eq!(previous.len(), 2);
        assert!(map.is_exactly("x", &Value::from(3)));
    }

    #[test]
    fn test_set_values_empty_removes() {
        let mut map = AttributeMap::new();
        map.insert("x", Value::from(1));
        map.set_values("x", Some(ValueSet::new()));
        assert!(map.is_empty());
    }
}
