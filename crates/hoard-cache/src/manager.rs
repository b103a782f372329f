//! State and write paths shared by entity and region managers.

use std::any::Any;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Instant;

use hoard_core::{CacheIndex, Entity, EntitySchema, FieldValue, HoardError, Result};
use hoard_storage::StorageAccessor;
use parking_lot::RwLock;
use serde::Serialize;
use tracing::{debug, warn};

use crate::key_lock::{KeyGuard, KeyLocks};
use crate::lifecycle::Lifecycle;
use crate::metrics::CacheMetrics;
use crate::store::IndexedStore;

/// Outcome of one maintenance pass over a manager.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MaintenanceReport {
    /// Cache name.
    pub cache: String,
    /// Cached instances.
    pub instances: usize,
    /// Buckets across every index.
    pub buckets: usize,
    /// Memberships across every index.
    pub memberships: usize,
    /// Index invariant violations found.
    pub violations: usize,
}

/// A manager as seen by the service that owns it.
pub trait ManagedCache: Send + Sync {
    /// Cache name, used in logs and metric labels.
    fn name(&self) -> &str;

    /// Number of cached instances.
    fn instance_count(&self) -> usize;

    /// Verifies the indexes and refreshes the entry gauge.
    fn maintain(&self) -> Result<MaintenanceReport>;

    /// Releases every cached structure; returns how many instances were held.
    fn shutdown(&self) -> usize;

    /// Upcasts for typed lookup in the service registry.
    fn as_any(self: Arc<Self>) -> Arc<dyn Any + Send + Sync>;
}

/// Primary map, indexes and storage of one manager.
///
/// Lock order is flights, then key lock, then store. Storage is only called
/// while holding a key lock, never the store lock.
pub(crate) struct ManagerCore<V: Entity> {
    name: String,
    schema: Arc<EntitySchema<V>>,
    storage: Arc<dyn StorageAccessor<V>>,
    store: RwLock<Option<IndexedStore<V>>>,
    locks: KeyLocks<V::Id>,
    lifecycle: Arc<Lifecycle>,
    metrics: CacheMetrics,
}

impl<V: Entity> ManagerCore<V> {
    pub(crate) fn new(
        schema: EntitySchema<V>,
        storage: Arc<dyn StorageAccessor<V>>,
        lifecycle: Arc<Lifecycle>,
        capacity: usize,
        record_metrics: bool,
    ) -> Self {
        let name = schema.type_name().to_string();
        let store = IndexedStore::new(&schema, capacity);

        Self {
            metrics: CacheMetrics::new(name.as_str(), record_metrics),
            name,
            schema: Arc::new(schema),
            storage,
            store: RwLock::new(Some(store)),
            locks: KeyLocks::new(),
            lifecycle,
        }
    }

    pub(crate) fn name(&self) -> &str {
        &self.name
    }

    pub(crate) fn schema(&self) -> &EntitySchema<V> {
        &self.schema
    }

    pub(crate) fn storage(&self) -> &dyn StorageAccessor<V> {
        self.storage.as_ref()
    }

    pub(crate) fn metrics(&self) -> &CacheMetrics {
        &self.metrics
    }

    pub(crate) fn ensure_running(&self) -> Result<()> {
        self.lifecycle.ensure_running()
    }

    pub(crate) fn lock_key(&self, id: &V::Id) -> KeyGuard<'_, V::Id> {
        self.locks.lock(id)
    }

    /// Runs `f` under the shared store lock.
    pub(crate) fn read<R>(&self, f: impl FnOnce(&IndexedStore<V>) -> R) -> Result<R> {
        self.ensure_running()?;
        let guard = self.store.read();
        match guard.as_ref() {
            Some(store) => Ok(f(store)),
            None => Err(HoardError::ServiceStopped),
        }
    }

    /// Runs `f` under the exclusive store lock.
    pub(crate) fn write<R>(&self, f: impl FnOnce(&mut IndexedStore<V>) -> R) -> Result<R> {
        self.ensure_running()?;
        let mut guard = self.store.write();
        match guard.as_mut() {
            Some(store) => Ok(f(store)),
            None => Err(HoardError::ServiceStopped),
        }
    }

    /// Looks up a cached snapshot, counting the hit or miss.
    pub(crate) fn get(&self, id: &V::Id) -> Result<Option<Arc<V>>> {
        let start = Instant::now();
        let found = self.read(|store| store.get(id))?;

        match &found {
            Some(_) => self.metrics.record_hit(),
            None => self.metrics.record_miss(),
        }
        debug!(cache = %self.name, id = ?id, hit = found.is_some(), "Cache lookup");
        self.metrics
            .record_operation_duration("get", start.elapsed());

        Ok(found)
    }

    /// Looks up a cached snapshot without touching metrics.
    pub(crate) fn peek(&self, id: &V::Id) -> Result<Option<Arc<V>>> {
        self.read(|store| store.get(id))
    }

    pub(crate) fn identities(&self, index: &CacheIndex) -> Result<HashSet<V::Id>> {
        self.read(|store| store.identities(index.field(), index.value()))?
    }

    /// Number of cached snapshots.
    ///
    /// Fails like every other operation when the service is not running.
    pub(crate) fn len(&self) -> Result<usize> {
        self.read(IndexedStore::len)
    }

    /// Entry count for gauges and debug output; zero once torn down.
    pub(crate) fn count(&self) -> usize {
        self.store.read().as_ref().map_or(0, IndexedStore::len)
    }

    /// Caches a resolved snapshot and refreshes the entry gauge.
    pub(crate) fn insert(&self, value: Arc<V>) -> Result<Arc<V>> {
        let len = self.write(|store| {
            store.insert(Arc::clone(&value));
            store.len()
        })?;
        self.metrics.record_load();
        self.metrics.update_entry_count(len);
        Ok(value)
    }

    /// Sets one field on a cached instance.
    pub(crate) fn modify(
        &self,
        id: &V::Id,
        field: &str,
        value: FieldValue,
        persist: bool,
    ) -> Result<Arc<V>> {
        self.ensure_running()?;
        let descriptor = self.schema.field(field)?;

        self.update(id, persist, |instance| descriptor.set(instance, value))
    }

    /// Applies `mutate` to a copy of the cached instance and commits it.
    ///
    /// With `persist` the copy is written to storage first; if storage
    /// refuses it the cached snapshot and its index entries stay as they
    /// were.
    pub(crate) fn update<F>(&self, id: &V::Id, persist: bool, mutate: F) -> Result<Arc<V>>
    where
        F: FnOnce(&mut V) -> Result<()>,
    {
        self.ensure_running()?;
        let start = Instant::now();
        let _key = self.lock_key(id);

        let current = self
            .peek(id)?
            .ok_or_else(|| HoardError::not_found(self.name.as_str(), id))?;
        let mut next = (*current).clone();
        mutate(&mut next)?;

        if next.id() != *id {
            return Err(HoardError::internal(format!(
                "{} {:?} changed identity during update",
                self.name, id
            )));
        }

        if persist && let Err(error) = self.storage.update(&next) {
            warn!(cache = %self.name, id = ?id, error = %error, "Storage update failed, cache left unchanged");
            self.metrics.record_rollback();
            return Err(error.into());
        }

        let next = Arc::new(next);
        self.write(|store| store.replace(Arc::clone(&next)))?;
        debug!(cache = %self.name, id = ?id, persist, "Instance updated");
        self.metrics
            .record_operation_duration("modify", start.elapsed());

        Ok(next)
    }

    /// Removes an instance from the cache, its indexes and storage.
    ///
    /// Returns whether the instance was cached. Storage is asked to delete
    /// the row either way. For a cached instance a storage failure puts the
    /// removed snapshot back and is returned; for an uncached one it is only
    /// logged and the call reports `Ok(false)`.
    pub(crate) fn delete(&self, id: &V::Id) -> Result<bool> {
        self.ensure_running()?;
        let start = Instant::now();
        let _key = self.lock_key(id);

        let removed = self.write(|store| store.remove(id))?;

        if let Err(error) = self.storage.delete(id) {
            let Some(previous) = removed else {
                warn!(cache = %self.name, id = ?id, error = %error, "Storage delete of uncached row failed");
                return Ok(false);
            };
            warn!(cache = %self.name, id = ?id, error = %error, "Storage delete failed, restoring entry");
            self.write(|store| store.insert(previous))?;
            self.metrics.record_rollback();
            return Err(error.into());
        }

        let cached = removed.is_some();
        if cached {
            self.metrics.record_delete();
            self.metrics.update_entry_count(self.count());
        }
        debug!(cache = %self.name, id = ?id, cached, "Instance deleted");
        self.metrics
            .record_operation_duration("delete", start.elapsed());

        Ok(cached)
    }

    pub(crate) fn maintain(&self) -> Result<MaintenanceReport> {
        let report = self.read(|store| MaintenanceReport {
            cache: self.name.clone(),
            instances: store.len(),
            buckets: store.bucket_count(),
            memberships: store.membership_count(),
            violations: store.verify(),
        })?;

        self.metrics.update_entry_count(report.instances);
        if report.violations > 0 {
            warn!(
                cache = %self.name,
                violations = report.violations,
                "Index invariant violated"
            );
        }

        Ok(report)
    }

    pub(crate) fn shutdown(&self) -> usize {
        let released = self.store.write().take().map_or(0, |store| store.len());
        self.metrics.update_entry_count(0);
        released
    }
}
