#![allow(dead_code)]
use hoard_core::{Entity, EntitySchema, FieldValue, Region, Result};

/// Entity fixture with one indexed and one plain field.
#[derive(Debug, Clone, PartialEq)]
pub struct Person {
    pub id: i32,
    pub first_name: String,
    pub age: i64,
}

impl Person {
    pub fn new(id: i32, first_name: &str, age: i64) -> Self {
        Self {
            id,
            first_name: first_name.to_string(),
            age,
        }
    }
}

impl Entity for Person {
    type Id = i32;

    fn id(&self) -> i32 {
        self.id
    }

    fn schema() -> Result<EntitySchema<Self>> {
        EntitySchema::<Self>::builder("Person")
            .indexed(
                "firstName",
                |p| FieldValue::from(&p.first_name),
                |p, v| {
                    p.first_name = v.try_into()?;
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

/// Region fixture owned by a `Person`.
#[derive(Debug, Clone, PartialEq)]
pub struct Pet {
    pub id: i32,
    pub owner: i32,
}

impl Entity for Pet {
    type Id = i32;

    fn id(&self) -> i32 {
        self.id
    }

    fn schema() -> Result<EntitySchema<Self>> {
        EntitySchema::<Self>::builder("Pet").build()
    }
}

impl Region for Pet {
    type Owner = i32;

    fn owner(&self) -> i32 {
        self.owner
    }
}
