mod common;

use std::sync::Arc;
use std::time::Duration;

use common::{Person, Pet, fixture};
use hoard_cache::{CacheService, CacheSettings, ServiceState};
use hoard_core::{CacheIndex, HoardError, OWNER_FIELD};
use hoard_storage::MemoryAccessor;

fn maintained_every(secs: u64) -> CacheSettings {
    CacheSettings::builder()
        .maintenance_interval(Duration::from_secs(secs))
        .record_metrics(false)
        .build()
        .unwrap()
}

#[test]
fn test_stop_is_idempotent_and_final() {
    let f = fixture();
    f.people.load_instance(&1, Person::birdy).unwrap();
    f.pets.create_instance(Pet::new(1, 1)).unwrap();

    f.service.stop();
    f.service.stop();

    assert_eq!(f.service.state(), ServiceState::Stopped);
    assert!(f.service.manager_names().is_empty());
    for result in [
        f.people.get_instance(&1).map(|_| ()),
        f.people.get_instance_count().map(|_| ()),
        f.pets.get_instance_count().map(|_| ()),
        f.people.load_instance(&2, Person::birdy).map(|_| ()),
        f.people.delete_instance(&1).map(|_| ()),
        f.pets.create_instance(Pet::new(2, 1)).map(|_| ()),
        f.pets
            .get_instances(&CacheIndex::new(OWNER_FIELD, 1))
            .map(|_| ()),
    ] {
        assert!(matches!(result, Err(HoardError::ServiceStopped)));
    }

    // Storage keeps what was written before the stop.
    assert_eq!(f.accessor.len::<Person>(), 1);
}

#[test]
fn test_managers_registered_in_order() {
    let f = fixture();

    assert_eq!(f.service.manager_names(), vec!["Person", "Pet"]);
    assert!(f.service.find_region_manager::<Pet>().is_some());
    // Pet has a region manager, not an entity manager.
    assert!(f.service.find_entity_manager::<Pet>().is_none());
}

#[test]
fn test_region_and_entity_manager_for_same_type_conflict() {
    let service = CacheService::new(CacheSettings::default());
    service
        .region_manager::<Pet>(MemoryAccessor::new("memory"))
        .unwrap();

    let err = service
        .entity_manager::<Pet>(MemoryAccessor::new("memory"))
        .unwrap_err();

    assert!(matches!(err, HoardError::Registration { .. }));
}

#[test]
fn test_start_twice_is_noop() {
    let service = CacheService::new(CacheSettings::default());
    service.start().unwrap();
    service.start().unwrap();

    assert_eq!(service.state(), ServiceState::Running);
    assert!(!service.is_maintenance_scheduled());
}

#[test]
fn test_invalid_settings_rejected_at_start() {
    let settings = CacheSettings {
        maintenance_interval_secs: Some(0),
        ..CacheSettings::default()
    };
    let service = CacheService::new(settings);

    assert!(matches!(service.start(), Err(HoardError::Configuration(_))));
    assert_eq!(service.state(), ServiceState::Created);
}

#[tokio::test(start_paused = true)]
async fn test_scheduled_maintenance_runs() {
    let service = CacheService::new(maintained_every(30));
    let accessor = Arc::new(MemoryAccessor::new("memory"));
    let people = service
        .entity_manager::<Person>(Arc::clone(&accessor))
        .unwrap();
    service.start().unwrap();
    assert!(service.is_maintenance_scheduled());

    people.load_instance(&1, Person::birdy).unwrap();
    tokio::time::sleep(Duration::from_secs(65)).await;

    let state = service.maintenance_state();
    assert_eq!(state.runs(), 3);
    assert_eq!(state.last_violations(), 0);
    assert!(state.is_healthy());

    service.stop();
    assert!(!service.is_maintenance_scheduled());
    tokio::time::sleep(Duration::from_secs(120)).await;
    assert_eq!(service.maintenance_state().runs(), 3);
}

#[tokio::test]
async fn test_maintain_now_inside_runtime() {
    let service = CacheService::new(maintained_every(3600));
    service.start().unwrap();
    let pets = service
        .region_manager::<Pet>(MemoryAccessor::new("memory"))
        .unwrap();
    for id in 1..=5 {
        pets.create_instance(Pet::new(id, id % 2)).unwrap();
    }

    let reports = service.maintain_now().unwrap();

    assert_eq!(reports.len(), 1);
    assert_eq!(reports[0].instances, 5);
    // Two owners in the implicit owner index.
    assert_eq!(reports[0].buckets, 2);
    assert_eq!(reports[0].violations, 0);
}
