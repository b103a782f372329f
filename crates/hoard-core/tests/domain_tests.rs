mod common;

use common::{Person, Pet};
use hoard_core::{
    CacheIndex, Entity, FieldValue, HoardError, OWNER_FIELD, Region, RegionKey, Result,
    StorageError,
};

#[test]
fn test_schema_declared_once_resolves_fields() {
    let schema = Person::schema().expect("schema should build");

    assert_eq!(schema.type_name(), "Person");
    assert!(schema.indexed_field("firstName").is_ok());
    assert!(schema.indexed_field("age").unwrap_err().is_index_error());
}

#[test]
fn test_modify_through_descriptor() {
    let schema = Person::schema().unwrap();
    let mut person = Person::new(1, "birdy:1", 1);

    schema
        .field("firstName")
        .unwrap()
        .set(&mut person, "birdy:2".into())
        .unwrap();

    assert_eq!(person.first_name, "birdy:2");
    let index = CacheIndex::new("firstName", "birdy:2");
    assert_eq!(
        schema.field(index.field()).unwrap().get(&person),
        *index.value()
    );
}

#[test]
fn test_region_owner_index_is_implicit() {
    let schema = Pet::schema()
        .unwrap()
        .with_owner_index(|pet: &Pet| pet.owner().into());
    let pet = Pet { id: 26, owner: 5 };

    let owner = schema.indexed_field(OWNER_FIELD).unwrap();
    assert_eq!(owner.get(&pet), FieldValue::Integer(5));
    assert_eq!(pet.key(), RegionKey::new(5, 26));
}

#[test]
fn test_error_propagation_with_question_mark() {
    fn persist() -> std::result::Result<(), StorageError> {
        Err(StorageError::unavailable("database is down"))
    }

    fn modify() -> Result<()> {
        persist()?;
        Ok(())
    }

    let error = modify().unwrap_err();
    assert!(error.is_storage_error());
    if let HoardError::Storage(inner) = error {
        assert!(inner.is_transient());
    } else {
        panic!("Expected Storage error");
    }
}
