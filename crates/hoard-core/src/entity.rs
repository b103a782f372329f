//! Traits implemented by cacheable types.

use std::fmt;
use std::hash::Hash;

use crate::error::Result;
use crate::schema::EntitySchema;
use crate::value::FieldValue;

/// A persistent domain object that can be held by a cache manager.
///
/// # Implementation Requirements
///
/// - `id()` must be stable for the lifetime of the cached value
/// - `schema()` is called once, when the manager is constructed
/// - Implementations must be `Clone`: the cache keeps immutable snapshots and
///   a mutation swaps in a modified clone
pub trait Entity: Clone + Send + Sync + 'static {
    /// Identity type.
    type Id: Clone + Eq + Hash + fmt::Debug + Send + Sync + 'static;

    /// Returns the identity of this instance.
    fn id(&self) -> Self::Id;

    /// Declares the fields of this type and which of them are indexed.
    fn schema() -> Result<EntitySchema<Self>>;

    /// Short type name used in errors, logs and metric labels.
    fn type_name() -> &'static str {
        let full = std::any::type_name::<Self>();
        full.rsplit("::").next().unwrap_or(full)
    }
}

/// An entity that belongs to exactly one owner.
///
/// Region managers keep an implicit `owner` index so all regions of one
/// owner can be fetched as a group.
pub trait Region: Entity {
    /// Owner identity type.
    type Owner: Clone + Eq + Hash + fmt::Debug + Into<FieldValue> + Send + Sync + 'static;

    /// Returns the current owner of this region.
    fn owner(&self) -> Self::Owner;

    /// Returns the composite `(owner, region)` key.
    fn key(&self) -> RegionKey<Self::Owner, Self::Id> {
        RegionKey::new(self.owner(), self.id())
    }
}

/// Composite key of a region.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RegionKey<O, K> {
    owner: O,
    region: K,
}

impl<O, K> RegionKey<O, K> {
    /// Creates a key from its parts.
    pub fn new(owner: O, region: K) -> Self {
        Self { owner, region }
    }

    /// Returns the owner part.
    pub fn owner(&self) -> &O {
        &self.owner
    }

    /// Returns the region part.
    pub fn region(&self) -> &K {
        &self.region
    }
}

impl<O: fmt::Debug, K: fmt::Debug> fmt::Display for RegionKey<O, K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}/{:?}", self.owner, self.region)
    }
}
