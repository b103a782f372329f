mod common;

use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Barrier};
use std::thread;
use std::time::Duration;

use common::{Person, Pet, fixture_with};
use hoard_core::{CacheIndex, HoardError, OWNER_FIELD, StorageOperation};
use hoard_storage::MemoryAccessor;

const THREADS: usize = 16;

fn slow_accessor() -> MemoryAccessor {
    MemoryAccessor::new("memory").with_latency(Duration::from_millis(20))
}

#[test]
fn test_concurrent_misses_resolve_once() {
    let f = fixture_with(slow_accessor());
    let factory_calls = Arc::new(AtomicUsize::new(0));
    let barrier = Arc::new(Barrier::new(THREADS));

    let handles: Vec<_> = (0..THREADS)
        .map(|_| {
            let people = Arc::clone(&f.people);
            let factory_calls = Arc::clone(&factory_calls);
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                people
                    .load_instance(&1, |id| {
                        factory_calls.fetch_add(1, Ordering::SeqCst);
                        Person::birdy(id)
                    })
                    .unwrap()
            })
        })
        .collect();

    let results: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();

    assert_eq!(factory_calls.load(Ordering::SeqCst), 1);
    assert_eq!(f.accessor.calls::<Person>(StorageOperation::Create), 1);
    assert!(results.iter().all(|p| Arc::ptr_eq(p, &results[0])));
    assert_eq!(f.people.get_instance_count().unwrap(), 1);
}

#[test]
fn test_failed_load_shared_with_waiters() {
    let f = fixture_with(slow_accessor());
    f.accessor.fail_next::<Person>(
        StorageOperation::Create,
        hoard_core::StorageError::unavailable("disk full"),
    );
    let barrier = Arc::new(Barrier::new(THREADS));

    let handles: Vec<_> = (0..THREADS)
        .map(|_| {
            let people = Arc::clone(&f.people);
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                people.load_instance(&1, Person::birdy)
            })
        })
        .collect();

    let results: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();

    // Callers that joined the failed flight see its error; late ones retry.
    assert!(results.iter().any(|r| matches!(r, Err(HoardError::Storage(_)))));
    assert!(f.people.get_identities(&CacheIndex::new("lastName", "hong")).unwrap().len() <= 1);
    assert_eq!(f.service.maintain_now().unwrap()[0].violations, 0);
}

#[test]
fn test_panicking_factory_releases_waiters() {
    let f = fixture_with(MemoryAccessor::new("memory"));
    let leader_ready = Arc::new(Barrier::new(2));

    let leader = {
        let people = Arc::clone(&f.people);
        let leader_ready = Arc::clone(&leader_ready);
        thread::spawn(move || {
            people.load_instance(&1, |_| {
                leader_ready.wait();
                thread::sleep(Duration::from_millis(50));
                panic!("factory failed");
            })
        })
    };

    leader_ready.wait();
    let follower = f.people.load_instance(&1, Person::birdy);

    assert!(leader.join().is_err());
    assert!(matches!(follower, Err(HoardError::Internal(_))));
    assert_eq!(f.people.get_instance_count().unwrap(), 0);

    // The key is usable again.
    assert!(f.people.load_instance(&1, Person::birdy).is_ok());
}

#[test]
fn test_distinct_keys_load_in_parallel() {
    let f = fixture_with(slow_accessor());

    let handles: Vec<_> = (0..THREADS as i32)
        .map(|id| {
            let people = Arc::clone(&f.people);
            thread::spawn(move || people.load_instance(&id, Person::birdy).unwrap())
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    assert_eq!(f.people.get_instance_count().unwrap(), THREADS);
    assert_eq!(
        f.accessor.calls::<Person>(StorageOperation::Create),
        THREADS as u64
    );
    assert_eq!(f.service.maintain_now().unwrap()[0].violations, 0);
}

#[test]
fn test_concurrent_modifies_keep_index_consistent() {
    let f = fixture_with(MemoryAccessor::new("memory"));
    f.people.load_instance(&1, Person::birdy).unwrap();
    let barrier = Arc::new(Barrier::new(THREADS));

    let handles: Vec<_> = (0..THREADS)
        .map(|n| {
            let people = Arc::clone(&f.people);
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                people
                    .modify(&1, "firstName", format!("name:{}", n), true)
                    .unwrap();
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    let cached = f.people.get_instance(&1).unwrap().unwrap();
    let by_name = CacheIndex::new("firstName", cached.first_name.as_str());
    assert_eq!(f.people.get_identities(&by_name).unwrap(), HashSet::from([1]));
    assert_eq!(f.accessor.peek::<Person>(&1).unwrap(), *cached);

    let report = &f.service.maintain_now().unwrap()[0];
    assert_eq!(report.memberships, 2);
    assert_eq!(report.violations, 0);
}

#[test]
fn test_concurrent_region_creation_single_winner() {
    let f = fixture_with(slow_accessor());
    let barrier = Arc::new(Barrier::new(THREADS));

    let handles: Vec<_> = (0..THREADS as i32)
        .map(|owner| {
            let pets = Arc::clone(&f.pets);
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                pets.create_instance(Pet::new(7, owner))
            })
        })
        .collect();

    let results: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
    let winners = results.iter().filter(|r| r.is_ok()).count();

    assert_eq!(winners, 1);
    assert!(results
        .iter()
        .filter_map(|r| r.as_ref().err())
        .all(HoardError::is_duplicate_key));
    assert_eq!(f.accessor.calls::<Pet>(StorageOperation::Create), 1);

    let owner = f.accessor.peek::<Pet>(&7).unwrap().owner;
    assert_eq!(
        f.pets
            .get_instances(&CacheIndex::new(OWNER_FIELD, owner))
            .unwrap()
            .len(),
        1
    );
}
