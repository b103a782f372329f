//! Hoard Core - Domain types and traits
//!
//! This crate provides the foundational types shared by the Hoard cache
//! managers and their storage backends: field values, index queries, the
//! `Entity`/`Region` traits with their field-descriptor schema, and the
//! error hierarchy.

pub mod entity;
pub mod error;
pub mod index;
pub mod schema;
pub mod value;

pub use entity::{Entity, Region, RegionKey};
pub use error::{HoardError, Result, StorageError, StorageOperation};
pub use index::CacheIndex;
pub use schema::{EntitySchema, EntitySchemaBuilder, FieldDescriptor, OWNER_FIELD};
pub use value::FieldValue;

/// Returns the crate version.
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
