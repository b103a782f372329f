//! In-memory storage backend.

use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use hoard_core::{Entity, StorageError, StorageOperation};
use parking_lot::{Mutex, RwLock};
use tracing::{debug, trace};

use crate::accessor::StorageAccessor;

/// Rows and bookkeeping for one entity type.
struct Table<V: Entity> {
    rows: RwLock<HashMap<V::Id, V>>,
    calls: Mutex<HashMap<StorageOperation, u64>>,
    failures: Mutex<HashMap<StorageOperation, StorageError>>,
}

impl<V: Entity> Table<V> {
    fn new() -> Self {
        Self {
            rows: RwLock::new(HashMap::new()),
            calls: Mutex::new(HashMap::new()),
            failures: Mutex::new(HashMap::new()),
        }
    }

    /// Counts the call and returns the injected failure, if any.
    fn enter(&self, operation: StorageOperation) -> Result<(), StorageError> {
        *self.calls.lock().entry(operation).or_insert(0) += 1;
        match self.failures.lock().remove(&operation) {
            Some(error) => {
                debug!(
                    entity = V::type_name(),
                    operation = %operation,
                    "Injected storage failure"
                );
                Err(error)
            },
            None => Ok(()),
        }
    }
}

/// A storage accessor that keeps every entity type in process memory.
///
/// One accessor serves any number of entity types; rows of each type live
/// in their own table, created on first use.
///
/// Besides being a usable backend for tests and demos it records how many
/// times each operation was called per type, can fail the next call of an
/// operation with a chosen error, and can sleep on every write to widen
/// race windows.
///
/// # Examples
///
/// ```ignore
/// let accessor = MemoryAccessor::new("memory");
/// accessor.fail_next::<Person>(
///     StorageOperation::Update,
///     StorageError::unavailable("maintenance window"),
/// );
/// ```
pub struct MemoryAccessor {
    name: String,
    tables: RwLock<HashMap<TypeId, Arc<dyn Any + Send + Sync>>>,
    latency: Option<Duration>,
}

impl MemoryAccessor {
    /// Creates an empty accessor.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            tables: RwLock::new(HashMap::new()),
            latency: None,
        }
    }

    /// Sleeps for `latency` on every create, update and delete.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    fn table<V: Entity>(&self) -> Arc<Table<V>> {
        let type_id = TypeId::of::<V>();

        if let Some(table) = self.tables.read().get(&type_id) {
            return downcast(Arc::clone(table));
        }

        let mut tables = self.tables.write();
        let table = tables
            .entry(type_id)
            .or_insert_with(|| Arc::new(Table::<V>::new()) as Arc<dyn Any + Send + Sync>);
        downcast(Arc::clone(table))
    }

    fn simulate_latency(&self) {
        if let Some(latency) = self.latency {
            std::thread::sleep(latency);
        }
    }

    /// Makes the next `operation` on type `V` fail with `error`.
    pub fn fail_next<V: Entity>(&self, operation: StorageOperation, error: StorageError) {
        self.table::<V>().failures.lock().insert(operation, error);
    }

    /// Returns how many times `operation` was called for type `V`.
    pub fn calls<V: Entity>(&self, operation: StorageOperation) -> u64 {
        self.table::<V>()
            .calls
            .lock()
            .get(&operation)
            .copied()
            .unwrap_or(0)
    }

    /// Returns a copy of a stored row without counting a call.
    pub fn peek<V: Entity>(&self, id: &V::Id) -> Option<V> {
        self.table::<V>().rows.read().get(id).cloned()
    }

    /// Returns the number of stored rows of type `V`.
    pub fn len<V: Entity>(&self) -> usize {
        self.table::<V>().rows.read().len()
    }

    /// Returns true if no rows of type `V` are stored.
    pub fn is_empty<V: Entity>(&self) -> bool {
        self.len::<V>() == 0
    }
}

fn downcast<V: Entity>(table: Arc<dyn Any + Send + Sync>) -> Arc<Table<V>> {
    match table.downcast::<Table<V>>() {
        Ok(table) => table,
        // Tables are keyed by the TypeId of their row type.
        Err(_) => unreachable!("table registered under a foreign TypeId"),
    }
}

impl<V: Entity> StorageAccessor<V> for MemoryAccessor {
    fn create(&self, instance: V) -> Result<V, StorageError> {
        let table = self.table::<V>();
        table.enter(StorageOperation::Create)?;
        self.simulate_latency();

        let id = instance.id();
        let mut rows = table.rows.write();
        if rows.contains_key(&id) {
            return Err(StorageError::duplicate(V::type_name(), &id));
        }
        trace!(entity = V::type_name(), id = ?id, "Row created");
        rows.insert(id, instance.clone());

        Ok(instance)
    }

    fn update(&self, instance: &V) -> Result<(), StorageError> {
        let table = self.table::<V>();
        table.enter(StorageOperation::Update)?;
        self.simulate_latency();

        let id = instance.id();
        let mut rows = table.rows.write();
        match rows.get_mut(&id) {
            Some(row) => {
                *row = instance.clone();
                trace!(entity = V::type_name(), id = ?id, "Row updated");
                Ok(())
            },
            None => Err(StorageError::missing(V::type_name(), &id)),
        }
    }

    fn delete(&self, id: &V::Id) -> Result<bool, StorageError> {
        let table = self.table::<V>();
        table.enter(StorageOperation::Delete)?;
        self.simulate_latency();

        let removed = table.rows.write().remove(id).is_some();
        trace!(entity = V::type_name(), id = ?id, removed, "Row deleted");
        Ok(removed)
    }

    fn load(&self, id: &V::Id) -> Result<Option<V>, StorageError> {
        let table = self.table::<V>();
        table.enter(StorageOperation::Load)?;

        let row = table.rows.read().get(id).cloned();
        Ok(row)
    }

    fn query(&self) -> Result<Vec<V>, StorageError> {
        let table = self.table::<V>();
        table.enter(StorageOperation::Query)?;

        let rows = table.rows.read().values().cloned().collect();
        Ok(rows)
    }

    fn count(&self) -> Result<usize, StorageError> {
        Ok(self.len::<V>())
    }

    fn name(&self) -> &str {
        &self.name
    }
}

impl std::fmt::Debug for MemoryAccessor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryAccessor")
            .field("name", &self.name)
            .field("tables", &self.tables.read().len())
            .field("latency", &self.latency)
            .finish()
    }
}
