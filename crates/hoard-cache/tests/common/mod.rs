#![allow(dead_code)]
use std::sync::Arc;

use hoard_cache::{CacheService, CacheSettings, EntityManager, RegionManager};
use hoard_core::{Entity, EntitySchema, FieldValue, OWNER_FIELD, Region, Result};
use hoard_storage::MemoryAccessor;

pub const SIZE: i32 = 5;

/// Entity fixture: two indexed name fields and a plain one.
#[derive(Debug, Clone, PartialEq)]
pub struct Person {
    pub id: i32,
    pub first_name: String,
    pub last_name: String,
    pub age: i64,
}

impl Person {
    pub fn new(id: i32, first_name: &str, last_name: &str, age: i64) -> Self {
        Self {
            id,
            first_name: first_name.to_string(),
            last_name: last_name.to_string(),
            age,
        }
    }

    /// Factory used by `load_instance` throughout the tests.
    pub fn birdy(id: &i32) -> Self {
        Self::new(*id, &format!("birdy:{}", id.abs()), "hong", i64::from(*id))
    }
}

impl Entity for Person {
    type Id = i32;

    fn id(&self) -> i32 {
        self.id
    }

    fn schema() -> Result<EntitySchema<Self>> {
        EntitySchema::<Self>::builder("Person")
            .read_only("id", |p| p.id.into(), false)
            .indexed(
                "firstName",
                |p| FieldValue::from(&p.first_name),
                |p, v| {
                    p.first_name = v.try_into()?;
                    Ok(())
                },
            )
            .indexed(
                "lastName",
                |p| FieldValue::from(&p.last_name),
                |p, v| {
                    p.last_name = v.try_into()?;
                    Ok(())
                },
            )
            .field(
                "age",
                |p| p.age.into(),
                |p, v| {
                    p.age = v.try_into()?;
                    Ok(())
                },
            )
            .build()
    }
}

/// Region fixture owned by a `Person`; the owner field is writable.
#[derive(Debug, Clone, PartialEq)]
pub struct Pet {
    pub id: i32,
    pub owner: i32,
    pub name: String,
}

impl Pet {
    pub fn new(id: i32, owner: i32) -> Self {
        Self {
            id,
            owner,
            name: format!("pet:{}", id),
        }
    }
}

impl Entity for Pet {
    type Id = i32;

    fn id(&self) -> i32 {
        self.id
    }

    fn schema() -> Result<EntitySchema<Self>> {
        EntitySchema::<Self>::builder("Pet")
            .field(
                OWNER_FIELD,
                |p| p.owner.into(),
                |p, v| {
                    p.owner = v.try_into()?;
                    Ok(())
                },
            )
            .field(
                "name",
                |p| FieldValue::from(&p.name),
                |p, v| {
                    p.name = v.try_into()?;
                    Ok(())
                },
            )
            .build()
    }
}

impl Region for Pet {
    type Owner = i32;

    fn owner(&self) -> i32 {
        self.owner
    }
}

/// A running service with a person and a pet manager over one accessor.
pub struct Fixture {
    pub service: CacheService,
    pub accessor: Arc<MemoryAccessor>,
    pub people: Arc<EntityManager<Person>>,
    pub pets: Arc<RegionManager<Pet>>,
}

pub fn fixture() -> Fixture {
    fixture_with(MemoryAccessor::new("memory"))
}

pub fn fixture_with(accessor: MemoryAccessor) -> Fixture {
    let service = CacheService::new(CacheSettings::default());
    service.start().expect("service should start");

    let accessor = Arc::new(accessor);
    let people = service
        .entity_manager::<Person>(Arc::clone(&accessor))
        .expect("person manager should register");
    let pets = service
        .region_manager::<Pet>(Arc::clone(&accessor))
        .expect("pet manager should register");

    Fixture {
        service,
        accessor,
        people,
        pets,
    }
}
