//! Index query keys.

use std::fmt;

use crate::value::FieldValue;

/// An equality query over one indexed field.
///
/// Only used to ask a manager for identities; it never mutates an index.
///
/// # Examples
///
/// ```
/// use hoard_core::CacheIndex;
///
/// let index = CacheIndex::new("firstName", "birdy:1");
/// assert_eq!(index.field(), "firstName");
/// assert_eq!(index.to_string(), "firstName=birdy:1");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheIndex {
    field: String,
    value: FieldValue,
}

impl CacheIndex {
    /// Creates a query for `field == value`.
    pub fn new(field: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        Self {
            field: field.into(),
            value: value.into(),
        }
    }

    /// Returns the field name.
    pub fn field(&self) -> &str {
        &self.field
    }

    /// Returns the value being matched.
    pub fn value(&self) -> &FieldValue {
        &self.value
    }
}

impl fmt::Display for CacheIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}={}", self.field, self.value)
    }
}
