//! Cache manager for entities looked up directly by identity.

use std::any::Any;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Instant;

use hoard_core::{CacheIndex, Entity, EntitySchema, FieldValue, HoardError, Result};
use hoard_storage::StorageAccessor;
use tracing::{debug, info, warn};

use crate::flight::{Flights, Role};
use crate::lifecycle::Lifecycle;
use crate::manager::{MaintenanceReport, ManagedCache, ManagerCore};
use crate::metrics::CacheMetrics;

/// Caches entities of type `V` by identity and keeps an index per indexed
/// field.
///
/// Built and registered through `CacheService::entity_manager`.
///
/// # Example
///
/// ```ignore
/// let people = service.entity_manager::<Person>(Arc::clone(&accessor))?;
///
/// let birdy = people.load_instance(&1, |id| Person::new(*id, "birdy"))?;
/// let named = people.get_identities(&CacheIndex::new("firstName", "birdy"))?;
/// assert!(named.contains(&birdy.id()));
/// ```
pub struct EntityManager<V: Entity> {
    core: ManagerCore<V>,
    flights: Flights<V::Id, Arc<V>>,
}

impl<V: Entity> EntityManager<V> {
    pub(crate) fn new(
        storage: Arc<dyn StorageAccessor<V>>,
        lifecycle: Arc<Lifecycle>,
        capacity: usize,
        record_metrics: bool,
    ) -> Result<Self> {
        let schema = V::schema()?;

        Ok(Self {
            core: ManagerCore::new(schema, storage, lifecycle, capacity, record_metrics),
            flights: Flights::new(),
        })
    }

    /// Cache name (the schema's type name).
    pub fn name(&self) -> &str {
        self.core.name()
    }

    pub fn schema(&self) -> &EntitySchema<V> {
        self.core.schema()
    }

    pub fn metrics(&self) -> &CacheMetrics {
        self.core.metrics()
    }

    /// Returns the cached instance without touching storage.
    pub fn get_instance(&self, id: &V::Id) -> Result<Option<Arc<V>>> {
        self.core.get(id)
    }

    /// Returns the cached instance, resolving it on a miss.
    ///
    /// On a miss exactly one caller resolves the value: storage is asked for
    /// an existing row first, and only when there is none is `factory`
    /// called and its instance created in storage. Callers arriving for the
    /// same identity meanwhile wait and receive the same `Arc`, or the same
    /// error. A failed resolution leaves nothing cached.
    ///
    /// `factory` must not call back into this manager for the same
    /// identity.
    ///
    /// # Errors
    ///
    /// - `HoardError::Storage` if loading or creating the row fails
    /// - `HoardError::Internal` if the resolving caller panicked, or the
    ///   stored instance carries another identity
    pub fn load_instance<F>(&self, id: &V::Id, factory: F) -> Result<Arc<V>>
    where
        F: FnOnce(&V::Id) -> V,
    {
        if let Some(cached) = self.core.get(id)? {
            return Ok(cached);
        }

        match self.flights.join(id) {
            Role::Leader(guard) => {
                let start = Instant::now();
                let result = self.resolve(id, factory);
                if let Err(error) = &result {
                    self.core.metrics().record_load_failure();
                    warn!(cache = %self.name(), id = ?id, error = %error, "Load failed");
                }
                self.core
                    .metrics()
                    .record_operation_duration("load", start.elapsed());
                guard.complete(result)
            },
            Role::Follower(flight) => {
                debug!(cache = %self.name(), id = ?id, "Waiting for in-flight load");
                flight.wait()
            },
        }
    }

    fn resolve<F>(&self, id: &V::Id, factory: F) -> Result<Arc<V>>
    where
        F: FnOnce(&V::Id) -> V,
    {
        let _key = self.core.lock_key(id);

        // A previous leader may have finished between our miss and the join.
        if let Some(cached) = self.core.peek(id)? {
            return Ok(cached);
        }

        let instance = match self.core.storage().load(id)? {
            Some(row) => {
                debug!(cache = %self.name(), id = ?id, "Loaded from storage");
                row
            },
            None => {
                let created = self.core.storage().create(factory(id))?;
                debug!(cache = %self.name(), id = ?id, "Created in storage");
                created
            },
        };

        if instance.id() != *id {
            return Err(HoardError::internal(format!(
                "{} {:?} resolved to identity {:?}",
                self.name(),
                id,
                instance.id()
            )));
        }

        self.core.insert(Arc::new(instance))
    }

    /// Caches every stored row that is not cached yet.
    ///
    /// Returns the number of instances loaded.
    pub fn preload(&self) -> Result<usize> {
        self.core.ensure_running()?;
        let rows = self.core.storage().query()?;

        let mut loaded = 0;
        for row in rows {
            let id = row.id();
            let _key = self.core.lock_key(&id);
            if self.core.peek(&id)?.is_none() {
                self.core.insert(Arc::new(row))?;
                loaded += 1;
            }
        }

        info!(cache = %self.name(), loaded, "Preloaded from storage");
        Ok(loaded)
    }

    /// Returns the identities whose indexed field equals the index value.
    ///
    /// # Errors
    ///
    /// `HoardError::Index` if the field is not indexed.
    pub fn get_identities(&self, index: &CacheIndex) -> Result<HashSet<V::Id>> {
        self.core.identities(index)
    }

    /// Sets one field of a cached instance and moves its index entries.
    ///
    /// With `persist` storage is updated first; a storage failure leaves
    /// the cache exactly as it was.
    ///
    /// # Errors
    ///
    /// - `HoardError::NotFound` if the identity is not cached
    /// - `HoardError::UnknownField`, `ReadOnlyField` or `FieldType` for a
    ///   bad field or value
    /// - `HoardError::Storage` if persisting fails
    pub fn modify(
        &self,
        id: &V::Id,
        field: &str,
        value: impl Into<FieldValue>,
        persist: bool,
    ) -> Result<Arc<V>> {
        self.core.modify(id, field, value.into(), persist)
    }

    /// Applies `mutate` to a copy of the cached instance and swaps it in.
    ///
    /// Same contract as `modify`; every indexed field that changed is
    /// rekeyed.
    pub fn update_instance<F>(&self, id: &V::Id, mutate: F, persist: bool) -> Result<Arc<V>>
    where
        F: FnOnce(&mut V) -> Result<()>,
    {
        self.core.update(id, persist, mutate)
    }

    /// Removes the instance from the cache, every index and storage.
    ///
    /// Returns `Ok(false)` if the identity was not cached; storage is still
    /// asked to delete the row, and a failure to do so is only logged.
    pub fn delete_instance(&self, id: &V::Id) -> Result<bool> {
        self.core.delete(id)
    }

    /// Number of cached instances.
    ///
    /// # Errors
    ///
    /// `HoardError::ServiceNotStarted` or `ServiceStopped` when the service
    /// is not running.
    pub fn get_instance_count(&self) -> Result<usize> {
        self.core.len()
    }
}

impl<V: Entity> ManagedCache for EntityManager<V> {
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

impl<V: Entity> std::fmt::Debug for EntityManager<V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EntityManager")
            .field("name", &self.core.name())
            .field("instances", &self.core.count())
            .field("in_flight", &self.flights.len())
            .finish()
    }
}
