//! Primary map plus its secondary indexes.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use hoard_core::{Entity, EntitySchema, FieldDescriptor, FieldValue, HoardError, Result};
use indexmap::IndexMap;

use crate::index_table::IndexTable;

struct Indexed<V: Entity> {
    descriptor: FieldDescriptor<V>,
    table: IndexTable<V::Id>,
}

/// The cached snapshots of one manager and one `IndexTable` per indexed
/// field.
///
/// Every mutating method keeps the index invariant: an identity is in
/// `table[f][v]` exactly when the cached snapshot has field `f` equal to
/// `v`. Callers serialize access through the manager's store lock, so each
/// method is one critical section.
pub struct IndexedStore<V: Entity> {
    entity: Arc<str>,
    entries: HashMap<V::Id, Arc<V>>,
    indexes: IndexMap<String, Indexed<V>>,
}

impl<V: Entity> IndexedStore<V> {
    /// Creates an empty store with one index per indexed field of `schema`.
    pub fn new(schema: &EntitySchema<V>, capacity: usize) -> Self {
        let indexes = schema
            .indexed_fields()
            .map(|descriptor| {
                let indexed = Indexed {
                    descriptor: descriptor.clone(),
                    table: IndexTable::new(descriptor.name()),
                };
                (descriptor.name().to_string(), indexed)
            })
            .collect();

        Self {
            entity: Arc::from(schema.type_name()),
            entries: HashMap::with_capacity(capacity),
            indexes,
        }
    }

    pub fn get(&self, id: &V::Id) -> Option<Arc<V>> {
        self.entries.get(id).cloned()
    }

    pub fn contains(&self, id: &V::Id) -> bool {
        self.entries.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Caches a snapshot and indexes every indexed field.
    ///
    /// An existing snapshot with the same identity is replaced and its
    /// memberships moved; the previous snapshot is returned.
    pub fn insert(&mut self, value: Arc<V>) -> Option<Arc<V>> {
        let id = value.id();
        if self.entries.contains_key(&id) {
            return self.replace(value);
        }

        for indexed in self.indexes.values_mut() {
            indexed.table.add(id.clone(), indexed.descriptor.get(&value));
        }
        self.entries.insert(id, value);
        None
    }

    /// Drops a snapshot and all of its memberships.
    pub fn remove(&mut self, id: &V::Id) -> Option<Arc<V>> {
        let value = self.entries.remove(id)?;
        for indexed in self.indexes.values_mut() {
            indexed.table.remove(id, &indexed.descriptor.get(&value));
        }
        Some(value)
    }

    /// Swaps in a new snapshot, rekeying only the fields whose value changed.
    ///
    /// Behaves like `insert` when the identity is not cached.
    pub fn replace(&mut self, value: Arc<V>) -> Option<Arc<V>> {
        let id = value.id();
        let Some(previous) = self.entries.get(&id).cloned() else {
            return self.insert(value);
        };

        for indexed in self.indexes.values_mut() {
            let old = indexed.descriptor.get(&previous);
            let new = indexed.descriptor.get(&value);
            indexed.table.rekey(&id, &old, new);
        }
        self.entries.insert(id, value);
        Some(previous)
    }

    /// Returns the identities whose `field` currently equals `value`.
    ///
    /// # Errors
    ///
    /// `HoardError::Index` if `field` is not indexed.
    pub fn identities(&self, field: &str, value: &FieldValue) -> Result<HashSet<V::Id>> {
        Ok(self.index(field)?.query(value))
    }

    /// Returns true if `id` is in the bucket `value` of `field`.
    pub fn is_member(&self, field: &str, value: &FieldValue, id: &V::Id) -> Result<bool> {
        Ok(self.index(field)?.contains(id, value))
    }

    /// Returns the index table of `field`.
    pub fn index(&self, field: &str) -> Result<&IndexTable<V::Id>> {
        self.indexes
            .get(field)
            .map(|indexed| &indexed.table)
            .ok_or_else(|| HoardError::index(self.entity.as_ref(), field))
    }

    /// Resolves identities to cached snapshots, skipping ones not cached.
    pub fn values_for<'a, I>(&self, ids: I) -> Vec<Arc<V>>
    where
        I: IntoIterator<Item = &'a V::Id>,
    {
        ids.into_iter().filter_map(|id| self.get(id)).collect()
    }

    /// Total number of buckets across every index.
    pub fn bucket_count(&self) -> usize {
        self.indexes.values().map(|i| i.table.bucket_count()).sum()
    }

    /// Total number of memberships across every index.
    pub fn membership_count(&self) -> usize {
        self.indexes.values().map(|i| i.table.membership_count()).sum()
    }

    /// Counts violations of the index invariant.
    ///
    /// A violation is a membership pointing at an uncached identity or at a
    /// snapshot whose field holds another value, or a cached snapshot missing
    /// from the bucket of its current value.
    pub fn verify(&self) -> usize {
        let mut violations = 0;

        for indexed in self.indexes.values() {
            for (value, bucket) in indexed.table.buckets() {
                violations += bucket
                    .iter()
                    .filter(|id| match self.entries.get(*id) {
                        Some(entry) => indexed.descriptor.get(entry) != *value,
                        None => true,
                    })
                    .count();
            }

            violations += self
                .entries
                .iter()
                .filter(|(id, entry)| {
                    !indexed.table.contains(id, &indexed.descriptor.get(entry))
                })
                .count();
        }

        violations
    }

    /// Drops every snapshot and every bucket.
    pub fn clear(&mut self) {
        self.entries.clear();
        for indexed in self.indexes.values_mut() {
            indexed.table.clear();
        }
    }
}

impl<V: Entity> std::fmt::Debug for IndexedStore<V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IndexedStore")
            .field("entity", &self.entity)
            .field("entries", &self.entries.len())
            .field("indexes", &self.indexes.keys().collect::<Vec<_>>())
            .finish()
    }
}
