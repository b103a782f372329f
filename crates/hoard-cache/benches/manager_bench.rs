use std::sync::Arc;
use std::sync::atomic::{AtomicI32, Ordering};

use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use hoard_cache::{CacheService, CacheSettings, EntityManager};
use hoard_core::{CacheIndex, Entity, EntitySchema, FieldValue, Result};
use hoard_storage::MemoryAccessor;

#[derive(Debug, Clone)]
struct Account {
    id: i32,
    region: String,
    balance: i64,
}

impl Entity for Account {
    type Id = i32;

    fn id(&self) -> i32 {
        self.id
    }

    fn schema() -> Result<EntitySchema<Self>> {
        EntitySchema::<Self>::builder("Account")
            .indexed(
                "region",
                |a| FieldValue::from(&a.region),
                |a, v| {
                    a.region = v.try_into()?;
                    Ok(())
                },
            )
            .field(
                "balance",
                |a| a.balance.into(),
                |a, v| {
                    a.balance = v.try_into()?;
                    Ok(())
                },
            )
            .build()
    }
}

fn account(id: &i32) -> Account {
    Account {
        id: *id,
        region: format!("region-{}", id % 16),
        balance: 0,
    }
}

/// Builds a running service with `size` cached accounts.
fn populated(size: i32) -> (CacheService, Arc<EntityManager<Account>>) {
    let settings = CacheSettings::builder()
        .record_metrics(false)
        .build()
        .unwrap();
    let service = CacheService::new(settings);
    service.start().unwrap();
    let accounts = service
        .entity_manager::<Account>(MemoryAccessor::new("bench"))
        .unwrap();
    for id in 0..size {
        accounts.load_instance(&id, account).unwrap();
    }
    (service, accounts)
}

/// Benchmark: get_instance (hit)
fn bench_get_hit(c: &mut Criterion) {
    let (_service, accounts) = populated(1_000);

    c.bench_function("get_instance_hit", |b| {
        b.iter(|| std::hint::black_box(accounts.get_instance(&500).unwrap()));
    });
}

/// Benchmark: load_instance on a fresh key (storage create + index insert)
fn bench_load_miss(c: &mut Criterion) {
    let (_service, accounts) = populated(0);
    let next = AtomicI32::new(0);

    c.bench_function("load_instance_miss", |b| {
        b.iter(|| {
            let id = next.fetch_add(1, Ordering::Relaxed);
            std::hint::black_box(accounts.load_instance(&id, account).unwrap())
        });
    });
}

/// Benchmark: modify an indexed field back and forth
fn bench_modify_indexed(c: &mut Criterion) {
    let (_service, accounts) = populated(1_000);
    let flip = AtomicI32::new(0);

    c.bench_function("modify_indexed_field", |b| {
        b.iter(|| {
            let region = format!("region-{}", flip.fetch_add(1, Ordering::Relaxed) % 2);
            std::hint::black_box(accounts.modify(&7, "region", region, false).unwrap())
        });
    });
}

/// Benchmark: index lookup with varying bucket sizes
fn bench_index_lookup(c: &mut Criterion) {
    let mut group = c.benchmark_group("get_identities");

    for size in [160, 1_600, 16_000] {
        let (_service, accounts) = populated(size);
        let index = CacheIndex::new("region", "region-3");
        group.throughput(Throughput::Elements((size / 16) as u64));
        group.bench_with_input(BenchmarkId::from_parameter(size), &index, |b, index| {
            b.iter(|| std::hint::black_box(accounts.get_identities(index).unwrap()));
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_get_hit,
    bench_load_miss,
    bench_modify_indexed,
    bench_index_lookup
);
criterion_main!(benches);
