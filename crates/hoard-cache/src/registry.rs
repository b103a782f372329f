//! Managers registered with a service, keyed by entity type.

use std::any::TypeId;
use std::sync::Arc;

use hoard_core::{HoardError, Result};
use indexmap::IndexMap;
use parking_lot::RwLock;

use crate::manager::{MaintenanceReport, ManagedCache};

#[derive(Default)]
pub(crate) struct Registry {
    managers: RwLock<IndexMap<TypeId, Arc<dyn ManagedCache>>>,
}

impl Registry {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Adds a manager for `type_id`; one manager per entity type.
    pub(crate) fn register(&self, type_id: TypeId, manager: Arc<dyn ManagedCache>) -> Result<()> {
        let mut managers = self.managers.write();
        if let Some(existing) = managers.get(&type_id) {
            return Err(HoardError::registration(
                existing.name(),
                "a cache manager is already registered for this type",
            ));
        }
        managers.insert(type_id, manager);
        Ok(())
    }

    /// Looks up a manager and downcasts it to `M`.
    pub(crate) fn find<M: Send + Sync + 'static>(&self, type_id: TypeId) -> Option<Arc<M>> {
        let manager = self.managers.read().get(&type_id).cloned()?;
        manager.as_any().downcast::<M>().ok()
    }

    pub(crate) fn names(&self) -> Vec<String> {
        self.managers
            .read()
            .values()
            .map(|m| m.name().to_string())
            .collect()
    }

    pub(crate) fn len(&self) -> usize {
        self.managers.read().len()
    }

    /// Runs one maintenance pass over every manager, in registration order.
    pub(crate) fn maintain_all(&self) -> Result<Vec<MaintenanceReport>> {
        let managers: Vec<_> = self.managers.read().values().cloned().collect();
        managers.iter().map(|m| m.maintain()).collect()
    }

    /// Shuts every manager down and empties the registry.
    ///
    /// Returns the number of instances released.
    pub(crate) fn drain(&self) -> usize {
        let managers: Vec<_> = self.managers.write().drain(..).map(|(_, m)| m).collect();
        managers.iter().map(|m| m.shutdown()).sum()
    }
}
