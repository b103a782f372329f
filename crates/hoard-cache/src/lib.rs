//! # hoard-cache
//!
//! In-process cache managers that keep hot copies of persistent entities,
//! maintain secondary indexes over them and write through to a
//! [`StorageAccessor`](hoard_storage::StorageAccessor).
//!
//! ## Managers
//!
//! - [`EntityManager`] caches entities by identity, with an atomic
//!   load-or-create on a miss
//! - [`RegionManager`] caches regions, entities that belong to an owner,
//!   with an implicit `owner` index
//!
//! Both are built by a [`CacheService`], which owns their lifecycle.
//!
//! ## Consistency
//!
//! - Concurrent misses on one key resolve it once; every caller gets the
//!   same `Arc`
//! - Writers of one key are serialized; different keys proceed in parallel
//! - Storage is written before the cache; a storage failure leaves the
//!   cache as it was
//! - An index membership exists exactly when the cached value holds that
//!   field value
//!
//! ## Example
//!
//! ```ignore
//! use hoard_cache::{CacheService, CacheSettings};
//! use hoard_core::CacheIndex;
//!
//! let service = CacheService::new(CacheSettings::default());
//! service.start()?;
//!
//! let people = service.entity_manager::<Person>(accessor)?;
//! let person = people.load_instance(&1, |id| Person::new(*id, "birdy"))?;
//! let ids = people.get_identities(&CacheIndex::new("firstName", "birdy"))?;
//! ```

pub mod config;
pub mod entity_manager;
mod flight;
pub mod index_table;
mod key_lock;
pub mod lifecycle;
pub mod maintenance;
pub mod manager;
pub mod metrics;
pub mod region_manager;
mod registry;
pub mod service;
pub mod store;

pub use config::{CacheSettings, CacheSettingsBuilder};
pub use entity_manager::EntityManager;
pub use index_table::IndexTable;
pub use lifecycle::ServiceState;
pub use maintenance::{MaintenanceHandle, MaintenanceState};
pub use manager::{MaintenanceReport, ManagedCache};
pub use crate::metrics::{CacheMetrics, register_cache_metrics};
pub use region_manager::RegionManager;
pub use service::CacheService;
pub use store::IndexedStore;

// Re-export the domain crates for convenience
pub use hoard_core;
pub use hoard_storage;
