//! Entity types used by the demo scenario.

use hoard_core::{Entity, EntitySchema, FieldValue, OWNER_FIELD, Region, Result};

#[derive(Debug, Clone)]
pub struct Person {
    pub id: i32,
    pub first_name: String,
    pub last_name: String,
    pub age: i64,
}

impl Person {
    pub fn birdy(id: &i32) -> Self {
        Self {
            id: *id,
            first_name: format!("birdy:{}", id.abs()),
            last_name: "hong".to_string(),
            age: i64::from(*id),
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

#[derive(Debug, Clone)]
pub struct Pet {
    pub id: i32,
    pub owner: i32,
    pub species: String,
}

impl Pet {
    pub fn new(id: i32, owner: i32) -> Self {
        let species = if id % 2 == 0 { "cat" } else { "dog" };
        Self {
            id,
            owner,
            species: species.to_string(),
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
            .indexed(
                "species",
                |p| FieldValue::from(&p.species),
                |p, v| {
                    p.species = v.try_into()?;
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
