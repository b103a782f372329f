//! Cache manager for regions, entities grouped under an owner.

use std::any::Any;
use std::sync::Arc;
use std::time::Instant;

use hoard_core::{
    CacheIndex, EntitySchema, FieldValue, HoardError, OWNER_FIELD, Region, RegionKey, Result,
};
use hoard_storage::StorageAccessor;
use tracing::{debug, info, warn};

use crate::lifecycle::Lifecycle;
use crate::manager::{MaintenanceReport, ManagedCache, ManagerCore};
use crate::metrics::CacheMetrics;

/// Caches regions of type `V`.
///
/// Besides the indexes the schema declares, every region manager keeps an
/// `owner` index so the regions of one owner can be fetched as a group and
/// so a region asked for under the wrong owner is not returned.
///
/// Regions are created explicitly with `create_instance`; there is no
/// load-or-create path.
pub struct RegionManager<V: Region> {
    core: ManagerCore<V>,
}

impl<V: Region> RegionManager<V> {
    pub(crate) fn new(
        storage: Arc<dyn StorageAccessor<V>>,
        lifecycle: Arc<Lifecycle>,
        capacity: usize,
        record_metrics: bool,
    ) -> Result<Self> {
        let schema = V::schema()?.with_owner_index(|region: &V| region.owner().into());

        Ok(Self {
            core: ManagerCore::new(schema, storage, lifecycle, capacity, record_metrics),
        })
    }

    pub fn name(&self) -> &str {
        self.core.name()
    }

    /// The schema, including the implicit `owner` index.
    pub fn schema(&self) -> &EntitySchema<V> {
        self.core.schema()
    }

    pub fn metrics(&self) -> &CacheMetrics {
        self.core.metrics()
    }

    /// Persists a new region and caches it under its owner.
    ///
    /// The instance returned by storage is the one cached, so a backend
    /// that assigns identities decides the final key. If that key is
    /// already cached the new row is deleted from storage again.
    ///
    /// # Errors
    ///
    /// - `HoardError::DuplicateKey` if the region, or the identity storage
    ///   assigned to it, is already cached
    /// - `HoardError::Storage` if storage rejects the row
    pub fn create_instance(&self, region: V) -> Result<Arc<V>> {
        self.core.ensure_running()?;
        let start = Instant::now();
        let id = region.id();
        let _key = self.core.lock_key(&id);

        if self.core.peek(&id)?.is_some() {
            return Err(HoardError::duplicate_key(self.name(), region.key()));
        }

        let created = self.core.storage().create(region).inspect_err(|error| {
            self.core.metrics().record_load_failure();
            warn!(cache = %self.name(), id = ?id, error = %error, "Storage create failed");
        })?;

        let key = created.key();
        let created = Arc::new(created);
        // A generated identity is not covered by our key lock.
        let inserted = self.core.write(|store| {
            if key.region() != &id && store.contains(key.region()) {
                return false;
            }
            store.insert(Arc::clone(&created));
            true
        })?;
        if !inserted {
            if let Err(error) = self.core.storage().delete(key.region()) {
                warn!(cache = %self.name(), key = %key, error = %error, "Could not undo create of duplicate region");
            }
            return Err(HoardError::duplicate_key(self.name(), &key));
        }

        self.core.metrics().record_load();
        self.core.metrics().update_entry_count(self.core.count());
        debug!(cache = %self.name(), key = %key, "Region created");
        self.core
            .metrics()
            .record_operation_duration("create", start.elapsed());

        Ok(created)
    }

    /// Returns the region only if `id` is in the bucket of `index`.
    ///
    /// # Errors
    ///
    /// `HoardError::Index` if the index field is not indexed.
    pub fn get_instance(&self, index: &CacheIndex, id: &V::Id) -> Result<Option<Arc<V>>> {
        let found = self.core.read(|store| {
            Ok::<_, HoardError>(
                store
                    .is_member(index.field(), index.value(), id)?
                    .then(|| store.get(id))
                    .flatten(),
            )
        })??;

        match &found {
            Some(_) => self.core.metrics().record_hit(),
            None => self.core.metrics().record_miss(),
        }
        Ok(found)
    }

    /// Returns every cached region in the bucket of `index`.
    pub fn get_instances(&self, index: &CacheIndex) -> Result<Vec<Arc<V>>> {
        self.core.read(|store| {
            let ids = store.identities(index.field(), index.value())?;
            Ok::<_, HoardError>(store.values_for(&ids))
        })?
    }

    /// Direct lookup by `(owner, region)`.
    pub fn get_keyed(&self, key: &RegionKey<V::Owner, V::Id>) -> Result<Option<Arc<V>>> {
        let owner: FieldValue = key.owner().clone().into();
        self.get_instance(&CacheIndex::new(OWNER_FIELD, owner), key.region())
    }

    /// Pulls every stored region of `owner` into the cache.
    ///
    /// Regions already cached are kept as they are. Returns all cached
    /// regions of the owner afterwards.
    pub fn load_owner(&self, owner: &V::Owner) -> Result<Vec<Arc<V>>> {
        self.core.ensure_running()?;
        let rows = self.core.storage().query()?;

        let mut loaded = 0;
        for row in rows.into_iter().filter(|row| row.owner() == *owner) {
            let id = row.id();
            let _key = self.core.lock_key(&id);
            if self.core.peek(&id)?.is_none() {
                self.core.insert(Arc::new(row))?;
                loaded += 1;
            }
        }
        info!(cache = %self.name(), owner = ?owner, loaded, "Owner regions loaded");

        let owner: FieldValue = owner.clone().into();
        self.get_instances(&CacheIndex::new(OWNER_FIELD, owner))
    }

    /// Sets one field of a cached region.
    ///
    /// Changing the owner field moves the region to the new owner's group.
    /// Same contract as `EntityManager::modify`.
    pub fn modify(
        &self,
        region_id: &V::Id,
        field: &str,
        value: impl Into<FieldValue>,
        persist: bool,
    ) -> Result<Arc<V>> {
        self.core.modify(region_id, field, value.into(), persist)
    }

    /// Applies `mutate` to a copy of the cached region and swaps it in.
    pub fn update_instance<F>(&self, region_id: &V::Id, mutate: F, persist: bool) -> Result<Arc<V>>
    where
        F: FnOnce(&mut V) -> Result<()>,
    {
        self.core.update(region_id, persist, mutate)
    }

    /// Removes the region from the cache, every index and storage.
    ///
    /// Returns `Ok(false)` if it was not cached.
    pub fn delete_instance(&self, region: &V) -> Result<bool> {
        self.core.delete(&region.id())
    }

    /// Number of cached regions across all owners.
    pub fn get_instance_count(&self) -> Result<usize> {
        self.core.len()
    }
}

impl<V: Region> ManagedCache for RegionManager<V> {
    fn name(&self) -> &str {
        self.core.name()
    }

    fn instance_count(&self) -> usize {
        self.core.count()
    }

    fn maintain(&self) -> Result<MaintenanceReport> {
        self.core.maintain()
    }

    fn shutdown(&self) -> usize {
        self.core.shutdown()
    }

    fn as_any(self: Arc<Self>) -> Arc<dyn Any + Send + Sync> {
        self
    }
}

impl<V: Region> std::fmt::Debug for RegionManager<V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RegionManager")
            .field("name", &self.core.name())
            .field("instances", &self.core.count())
            .finish()
    }
}
