//! Hoard demo binary.
//!
//! Seeds a memory store, runs the create/index/update/delete cycle through
//! an entity manager and a region manager, then prints the maintenance
//! reports and the Prometheus exposition.

mod model;
mod settings;

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use hoard_cache::CacheService;
use hoard_core::{CacheIndex, OWNER_FIELD};
use hoard_storage::{MemoryAccessor, StorageAccessor};
use metrics_exporter_prometheus::PrometheusBuilder;
use tracing::info;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use crate::model::{Person, Pet};
use crate::settings::DemoSettings;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let settings = DemoSettings::load().context("failed to load settings")?;
    let prometheus = PrometheusBuilder::new()
        .install_recorder()
        .context("failed to install metrics recorder")?;

    info!("Starting Hoard demo v{}", env!("CARGO_PKG_VERSION"));

    let service = CacheService::new(settings.cache());
    let accessor = Arc::new(MemoryAccessor::new("memory"));
    let people = service.entity_manager::<Person>(Arc::clone(&accessor))?;
    let pets = service.region_manager::<Pet>(Arc::clone(&accessor))?;
    service.start()?;

    let size = settings.size;

    // Rows that exist in storage before the cache sees them
    for index in 1..=size {
        accessor.create(Person::birdy(&-index))?;
    }
    info!("Preloaded {} stored people", people.preload()?);

    for index in 1..=size {
        let person = people.load_instance(&index, Person::birdy)?;
        let by_name = CacheIndex::new("firstName", person.first_name.as_str());
        info!(
            id = person.id,
            namesakes = people.get_identities(&by_name)?.len(),
            "Loaded person"
        );

        people.modify(&person.id, "age", 1000, true)?;
        people.delete_instance(&person.id)?;
        let person = people.load_instance(&index, Person::birdy)?;
        println!("{}", people.schema().describe(&person));

        for position in 1..=size {
            let pet = pets.create_instance(Pet::new(index * size + position, person.id))?;
            pets.delete_instance(&pet)?;
            pets.create_instance(Pet::new(index * size + position, person.id))?;
        }
        let owned = pets.get_instances(&CacheIndex::new(OWNER_FIELD, person.id))?;
        info!(owner = person.id, pets = owned.len(), "Created pets");
    }

    let cats = pets.get_instances(&CacheIndex::new("species", "cat"))?;
    let (people_cached, pets_cached) = (people.get_instance_count()?, pets.get_instance_count()?);
    info!(
        people = people_cached,
        pets = pets_cached,
        cats = cats.len(),
        "Scenario complete"
    );

    if let Some(interval) = service.settings().maintenance_interval() {
        // Let the scheduler run at least one pass.
        tokio::time::sleep(interval + Duration::from_millis(100)).await;
        info!(runs = service.maintenance_state().runs(), "Background maintenance");
    }

    let reports = service.maintain_now()?;
    println!("{}", serde_json::to_string_pretty(&reports)?);
    println!("{}", prometheus.render());

    service.stop();
    info!("Service stopped");

    Ok(())
}
