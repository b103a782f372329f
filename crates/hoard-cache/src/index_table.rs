//! Secondary index over one field.

use std::collections::{HashMap, HashSet};
use std::hash::Hash;

use hoard_core::FieldValue;

/// Maps each value of one field to the identities currently holding it.
///
/// Buckets never exist empty: removing the last identity drops the bucket.
/// An `IndexTable` has no locking of its own; it lives inside an
/// `IndexedStore` and is only touched under the store lock.
#[derive(Debug, Clone)]
pub struct IndexTable<K> {
    field: String,
    buckets: HashMap<FieldValue, HashSet<K>>,
}

impl<K: Clone + Eq + Hash> IndexTable<K> {
    /// Creates an empty index for `field`.
    pub fn new(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            buckets: HashMap::new(),
        }
    }

    /// Returns the indexed field name.
    pub fn field(&self) -> &str {
        &self.field
    }

    /// Adds `id` to the bucket of `value`.
    pub fn add(&mut self, id: K, value: FieldValue) {
        self.buckets.entry(value).or_default().insert(id);
    }

    /// Removes `id` from the bucket of `value`; returns true if it was there.
    pub fn remove(&mut self, id: &K, value: &FieldValue) -> bool {
        let Some(bucket) = self.buckets.get_mut(value) else {
            return false;
        };
        let removed = bucket.remove(id);
        if bucket.is_empty() {
            self.buckets.remove(value);
        }
        removed
    }

    /// Moves `id` from the bucket of `old` to the bucket of `new`.
    pub fn rekey(&mut self, id: &K, old: &FieldValue, new: FieldValue) {
        if *old == new {
            return;
        }
        self.remove(id, old);
        self.add(id.clone(), new);
    }

    /// Returns a copy of the identities holding `value`.
    pub fn query(&self, value: &FieldValue) -> HashSet<K> {
        self.buckets.get(value).cloned().unwrap_or_default()
    }

    /// Returns true if `id` is in the bucket of `value`.
    pub fn contains(&self, id: &K, value: &FieldValue) -> bool {
        self.buckets.get(value).is_some_and(|bucket| bucket.contains(id))
    }

    /// Number of distinct values currently indexed.
    pub fn bucket_count(&self) -> usize {
        self.buckets.len()
    }

    /// Total number of `(value, id)` memberships.
    pub fn membership_count(&self) -> usize {
        self.buckets.values().map(HashSet::len).sum()
    }

    /// Iterates over every `(value, bucket)` pair.
    pub fn buckets(&self) -> impl Iterator<Item = (&FieldValue, &HashSet<K>)> {
        self.buckets.iter()
    }

    /// Drops every bucket.
    pub fn clear(&mut self) {
        self.buckets.clear();
    }
}
