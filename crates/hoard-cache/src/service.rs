//! The cache service: manager registry and lifecycle.

use std::any::TypeId;
use std::sync::Arc;

use hoard_core::{Entity, HoardError, Region, Result};
use hoard_storage::StorageAccessor;
use parking_lot::Mutex;
use tokio::runtime::Handle;
use tracing::info;

use crate::config::CacheSettings;
use crate::entity_manager::EntityManager;
use crate::lifecycle::{Lifecycle, ServiceState};
use crate::maintenance::{MaintenanceHandle, MaintenanceScheduler, MaintenanceState};
use crate::manager::{MaintenanceReport, ManagedCache};
use crate::metrics::register_cache_metrics;
use crate::region_manager::RegionManager;
use crate::registry::Registry;

/// Owns the cache managers of an application and their lifecycle.
///
/// Managers are built and registered through the service, one per entity
/// type. Their operations only succeed while the service is running; after
/// `stop()` every cached structure is released and operations fail with
/// `HoardError::ServiceStopped`.
///
/// # Example
///
/// ```
/// use hoard_cache::{CacheService, CacheSettings, ServiceState};
///
/// let service = CacheService::new(CacheSettings::default());
/// service.start().unwrap();
/// assert_eq!(service.state(), ServiceState::Running);
///
/// service.stop();
/// service.stop();
/// assert_eq!(service.state(), ServiceState::Stopped);
/// ```
pub struct CacheService {
    settings: CacheSettings,
    lifecycle: Arc<Lifecycle>,
    registry: Arc<Registry>,
    maintenance: Mutex<Option<MaintenanceHandle>>,
    maintenance_state: Arc<MaintenanceState>,
}

impl CacheService {
    pub fn new(settings: CacheSettings) -> Self {
        Self {
            settings,
            lifecycle: Arc::new(Lifecycle::new()),
            registry: Arc::new(Registry::new()),
            maintenance: Mutex::new(None),
            maintenance_state: Arc::new(MaintenanceState::new()),
        }
    }

    pub fn settings(&self) -> &CacheSettings {
        &self.settings
    }

    pub fn state(&self) -> ServiceState {
        self.lifecycle.state()
    }

    /// Bookkeeping of maintenance passes, scheduled or manual.
    pub fn maintenance_state(&self) -> &MaintenanceState {
        &self.maintenance_state
    }

    /// Starts serving operations.
    ///
    /// When a maintenance interval is configured the maintenance loop is
    /// spawned on the current Tokio runtime. Starting a running service
    /// does nothing.
    ///
    /// # Errors
    ///
    /// - `HoardError::Configuration` for invalid settings
    /// - `HoardError::Internal` if maintenance is configured but there is no
    ///   Tokio runtime
    /// - `HoardError::ServiceStopped` if the service was stopped
    pub fn start(&self) -> Result<()> {
        self.settings.validate()?;

        let maintenance = match self.settings.maintenance_interval() {
            Some(interval) => {
                let runtime = Handle::try_current().map_err(|_| {
                    HoardError::internal("periodic maintenance requires a Tokio runtime")
                })?;
                Some((interval, runtime))
            },
            None => None,
        };

        if !self.lifecycle.start()? {
            return Ok(());
        }

        if self.settings.record_metrics() {
            register_cache_metrics();
        }

        if let Some((interval, runtime)) = maintenance {
            let scheduler = MaintenanceScheduler::new(
                Arc::clone(&self.registry),
                Arc::clone(&self.maintenance_state),
                interval,
            );
            *self.maintenance.lock() = Some(scheduler.start(&runtime));
        }

        info!(managers = self.registry.len(), "Cache service started");
        Ok(())
    }

    /// Stops the service and releases every manager's cached structures.
    ///
    /// Idempotent. Managers handed out earlier stay valid as values but
    /// every operation on them fails with `HoardError::ServiceStopped`.
    pub fn stop(&self) {
        if !self.lifecycle.stop() {
            return;
        }

        if let Some(handle) = self.maintenance.lock().take() {
            handle.stop();
        }

        let released = self.registry.drain();
        info!(released, "Cache service stopped");
    }

    /// Builds and registers the manager for entity type `V`.
    ///
    /// # Errors
    ///
    /// - `HoardError::Registration` if `V` already has a manager or its
    ///   schema is invalid
    /// - `HoardError::ServiceStopped` after `stop()`
    pub fn entity_manager<V: Entity>(
        &self,
        storage: impl StorageAccessor<V> + 'static,
    ) -> Result<Arc<EntityManager<V>>> {
        self.ensure_not_stopped()?;

        let manager = Arc::new(EntityManager::new(
            Arc::new(storage),
            Arc::clone(&self.lifecycle),
            self.settings.initial_capacity(),
            self.settings.record_metrics(),
        )?);
        self.registry
            .register(TypeId::of::<V>(), Arc::clone(&manager) as Arc<dyn ManagedCache>)?;

        info!(cache = %manager.name(), kind = "entity", "Cache manager registered");
        Ok(manager)
    }

    /// Builds and registers the manager for region type `V`.
    ///
    /// # Errors
    ///
    /// Same as `entity_manager`.
    pub fn region_manager<V: Region>(
        &self,
        storage: impl StorageAccessor<V> + 'static,
    ) -> Result<Arc<RegionManager<V>>> {
        self.ensure_not_stopped()?;

        let manager = Arc::new(RegionManager::new(
            Arc::new(storage),
            Arc::clone(&self.lifecycle),
            self.settings.initial_capacity(),
            self.settings.record_metrics(),
        )?);
        self.registry
            .register(TypeId::of::<V>(), Arc::clone(&manager) as Arc<dyn ManagedCache>)?;

        info!(cache = %manager.name(), kind = "region", "Cache manager registered");
        Ok(manager)
    }

    /// Returns the registered entity manager for `V`.
    pub fn find_entity_manager<V: Entity>(&self) -> Option<Arc<EntityManager<V>>> {
        self.registry.find::<EntityManager<V>>(TypeId::of::<V>())
    }

    /// Returns the registered region manager for `V`.
    pub fn find_region_manager<V: Region>(&self) -> Option<Arc<RegionManager<V>>> {
        self.registry.find::<RegionManager<V>>(TypeId::of::<V>())
    }

    /// Names of the registered managers, in registration order.
    pub fn manager_names(&self) -> Vec<String> {
        self.registry.names()
    }

    /// Runs one maintenance pass over every manager now.
    pub fn maintain_now(&self) -> Result<Vec<MaintenanceReport>> {
        self.lifecycle.ensure_running()?;

        let reports = self.registry.maintain_all()?;
        self.maintenance_state
            .record_pass(reports.iter().map(|r| r.violations).sum());
        Ok(reports)
    }

    /// True while a maintenance loop is scheduled.
    pub fn is_maintenance_scheduled(&self) -> bool {
        self.maintenance.lock().is_some()
    }

    fn ensure_not_stopped(&self) -> Result<()> {
        match self.lifecycle.state() {
            ServiceState::Stopped => Err(HoardError::ServiceStopped),
            _ => Ok(()),
        }
    }
}

impl Drop for CacheService {
    fn drop(&mut self) {
        self.stop();
    }
}

impl std::fmt::Debug for CacheService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CacheService")
            .field("state", &self.state())
            .field("managers", &self.manager_names())
            .field("settings", &self.settings)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hoard_core::{EntitySchema, FieldValue};
    use hoard_storage::MemoryAccessor;

    #[derive(Debug, Clone)]
    struct Tag {
        id: u32,
        label: String,
    }

    impl Entity for Tag {
        type Id = u32;

        fn id(&self) -> u32 {
            self.id
        }

        fn schema() -> Result<EntitySchema<Self>> {
            EntitySchema::<Tag>::builder("Tag")
                .read_only("label", |t: &Tag| FieldValue::from(&t.label), true)
                .build()
        }
    }

    fn tag(id: &u32) -> Tag {
        Tag {
            id: *id,
            label: "hot".into(),
        }
    }

    #[test]
    fn test_operations_before_start_fail() {
        let service = CacheService::new(CacheSettings::default());
        let tags = service
            .entity_manager::<Tag>(MemoryAccessor::new("memory"))
            .unwrap();

        let err = tags.load_instance(&1, tag).unwrap_err();
        assert!(matches!(err, HoardError::ServiceNotStarted));
        assert!(matches!(
            service.maintain_now(),
            Err(HoardError::ServiceNotStarted)
        ));
    }

    #[test]
    fn test_second_manager_for_type_rejected() {
        let service = CacheService::new(CacheSettings::default());
        service
            .entity_manager::<Tag>(MemoryAccessor::new("memory"))
            .unwrap();

        let err = service
            .entity_manager::<Tag>(MemoryAccessor::new("memory"))
            .unwrap_err();
        assert!(matches!(err, HoardError::Registration { .. }));
        assert_eq!(service.manager_names(), vec!["Tag".to_string()]);
    }

    #[test]
    fn test_find_manager() {
        let service = CacheService::new(CacheSettings::default());
        let tags = service
            .entity_manager::<Tag>(MemoryAccessor::new("memory"))
            .unwrap();

        let found = service.find_entity_manager::<Tag>().unwrap();
        assert!(Arc::ptr_eq(&tags, &found));
    }

    #[test]
    fn test_stop_releases_and_rejects() {
        let service = CacheService::new(CacheSettings::default());
        service.start().unwrap();
        let tags = service
            .entity_manager::<Tag>(MemoryAccessor::new("memory"))
            .unwrap();
        tags.load_instance(&1, tag).unwrap();

        service.stop();

        assert_eq!(service.state(), ServiceState::Stopped);
        assert!(service.manager_names().is_empty());
        assert!(service.find_entity_manager::<Tag>().is_none());
        assert!(matches!(
            tags.get_instance_count(),
            Err(HoardError::ServiceStopped)
        ));
        assert!(matches!(tags.get_instance(&1), Err(HoardError::ServiceStopped)));
        assert!(matches!(
            service.entity_manager::<Tag>(MemoryAccessor::new("memory")),
            Err(HoardError::ServiceStopped)
        ));
        assert!(matches!(service.start(), Err(HoardError::ServiceStopped)));
    }

    #[test]
    fn test_maintenance_without_runtime_fails() {
        let settings = CacheSettings::builder()
            .maintenance_interval(std::time::Duration::from_secs(5))
            .build()
            .unwrap();
        let service = CacheService::new(settings);

        assert!(matches!(service.start(), Err(HoardError::Internal(_))));
        assert_eq!(service.state(), ServiceState::Created);
    }

    #[test]
    fn test_maintain_now_reports_per_manager() {
        let service = CacheService::new(CacheSettings::default());
        service.start().unwrap();
        let tags = service
            .entity_manager::<Tag>(MemoryAccessor::new("memory"))
            .unwrap();
        tags.load_instance(&1, tag).unwrap();
        tags.load_instance(&2, tag).unwrap();

        let reports = service.maintain_now().unwrap();

        assert_eq!(reports.len(), 1);
        assert_eq!(reports[0].cache, "Tag");
        assert_eq!(reports[0].instances, 2);
        assert_eq!(reports[0].buckets, 1);
        assert_eq!(reports[0].memberships, 2);
        assert_eq!(reports[0].violations, 0);
        assert_eq!(service.maintenance_state().runs(), 1);
    }
}
