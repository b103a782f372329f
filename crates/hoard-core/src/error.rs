//! Error types for Hoard.
//!
//! This module defines the error hierarchy used throughout the cache.
//! All errors implement `std::error::Error` via `thiserror`.
//!
//! # Error Handling Philosophy
//!
//! - Functions that can fail return `Result<T, HoardError>`
//! - Storage failures are always surfaced; the cache never retries
//! - Index misconfiguration fails at the call site, it is never swallowed
//!
//! Both error types are `Clone`: a failed load is handed to every caller
//! that was waiting on it.
//!
//! # Example
//!
//! ```
//! use hoard_core::{HoardError, Result};
//!
//! fn lookup(id: i32) -> Result<String> {
//!     if id < 0 {
//!         return Err(HoardError::not_found("Person", id));
//!     }
//!     Ok(format!("person {}", id))
//! }
//!
//! assert!(lookup(-1).unwrap_err().is_not_found());
//! ```

use std::fmt;
use thiserror::Error;

/// Main error type for cache operations.
#[derive(Debug, Clone, Error)]
pub enum HoardError {
    /// The entity is not cached.
    #[error("{entity} '{id}' not found in cache")]
    NotFound {
        /// Entity type name
        entity: String,
        /// Debug rendering of the identity
        id: String,
    },

    /// A region with the same key is already cached.
    #[error("{entity} '{key}' is already cached")]
    DuplicateKey {
        /// Entity type name
        entity: String,
        /// Rendering of the composite key
        key: String,
    },

    /// The field was never registered as indexable.
    #[error("Field '{field}' is not indexed for {entity}")]
    Index {
        /// Entity type name
        entity: String,
        /// Field that was queried
        field: String,
    },

    /// The field does not exist in the entity schema.
    #[error("Field '{field}' is not declared for {entity}")]
    UnknownField {
        /// Entity type name
        entity: String,
        /// Field that was requested
        field: String,
    },

    /// The field has no setter.
    #[error("Field '{field}' of {entity} is read-only")]
    ReadOnlyField {
        /// Entity type name
        entity: String,
        /// Field that was written
        field: String,
    },

    /// A value of the wrong type was given for a field.
    #[error(
        "Field '{}' expected {expected}, found {found}",
        field.as_deref().unwrap_or("<value>")
    )]
    FieldType {
        /// Field name, when known
        field: Option<String>,
        /// Expected kind
        expected: &'static str,
        /// Kind that was supplied
        found: &'static str,
    },

    /// Manager or schema registration was rejected.
    #[error("Registration failed for {entity}: {reason}")]
    Registration {
        /// Entity type name
        entity: String,
        /// Why registration failed
        reason: String,
    },

    /// Invalid cache settings.
    #[error("Invalid configuration: {0}")]
    Configuration(String),

    /// The storage accessor rejected an operation.
    #[error(transparent)]
    Storage(#[from] StorageError),

    /// The cache service has not been started yet.
    #[error("Cache service has not been started")]
    ServiceNotStarted,

    /// The cache service was stopped; managed structures are gone.
    #[error("Cache service is stopped")]
    ServiceStopped,

    /// Generic internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl HoardError {
    // ============================================
    // Convenience constructors
    // ============================================

    /// Creates a NotFound error.
    pub fn not_found(entity: impl Into<String>, id: impl fmt::Debug) -> Self {
        Self::NotFound {
            entity: entity.into(),
            id: format!("{:?}", id),
        }
    }

    /// Creates a DuplicateKey error.
    pub fn duplicate_key(entity: impl Into<String>, key: impl fmt::Display) -> Self {
        Self::DuplicateKey {
            entity: entity.into(),
            key: key.to_string(),
        }
    }

    /// Creates an Index error.
    ///
    /// # Example
    ///
    /// ```
    /// use hoard_core::HoardError;
    ///
    /// let error = HoardError::index("Person", "nickname");
    /// assert!(error.is_index_error());
    /// assert!(error.to_string().contains("nickname"));
    /// ```
    pub fn index(entity: impl Into<String>, field: impl Into<String>) -> Self {
        Self::Index {
            entity: entity.into(),
            field: field.into(),
        }
    }

    /// Creates an UnknownField error.
    pub fn unknown_field(entity: impl Into<String>, field: impl Into<String>) -> Self {
        Self::UnknownField {
            entity: entity.into(),
            field: field.into(),
        }
    }

    /// Creates a ReadOnlyField error.
    pub fn read_only(entity: impl Into<String>, field: impl Into<String>) -> Self {
        Self::ReadOnlyField {
            entity: entity.into(),
            field: field.into(),
        }
    }

    /// Creates a Registration error.
    pub fn registration(entity: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Registration {
            entity: entity.into(),
            reason: reason.into(),
        }
    }

    /// Creates a Configuration error.
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration(message.into())
    }

    /// Creates an Internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    /// Attaches the field name to a FieldType error; other errors pass through.
    pub fn for_field(self, name: &str) -> Self {
        match self {
            Self::FieldType {
                field: None,
                expected,
                found,
            } => Self::FieldType {
                field: Some(name.to_string()),
                expected,
                found,
            },
            other => other,
        }
    }

    // ============================================
    // Query methods
    // ============================================

    /// Returns true if the entity was not cached.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    /// Returns true for duplicate region keys.
    pub fn is_duplicate_key(&self) -> bool {
        matches!(self, Self::DuplicateKey { .. })
    }

    /// Returns true if a query targeted a field that is not indexed.
    pub fn is_index_error(&self) -> bool {
        matches!(self, Self::Index { .. })
    }

    /// Returns true for value type mismatches.
    pub fn is_field_type_error(&self) -> bool {
        matches!(self, Self::FieldType { .. })
    }

    /// Returns true if storage rejected the operation.
    pub fn is_storage_error(&self) -> bool {
        matches!(self, Self::Storage(_))
    }

    /// Returns true if the service is not running (not started or stopped).
    pub fn is_unavailable(&self) -> bool {
        matches!(self, Self::ServiceNotStarted | Self::ServiceStopped)
    }
}

/// The storage operation that failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StorageOperation {
    Create,
    Update,
    Delete,
    Load,
    Query,
}

impl StorageOperation {
    /// Returns the lowercase operation name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Create => "create",
            Self::Update => "update",
            Self::Delete => "delete",
            Self::Load => "load",
            Self::Query => "query",
        }
    }
}

impl fmt::Display for StorageOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors reported by a storage accessor.
#[derive(Debug, Clone, Error)]
pub enum StorageError {
    /// A row with the same identity already exists.
    #[error("{entity} '{id}' already exists in storage")]
    Duplicate { entity: String, id: String },

    /// The row to update does not exist.
    #[error("{entity} '{id}' does not exist in storage")]
    Missing { entity: String, id: String },

    /// The backend is not reachable.
    #[error("storage unavailable: {reason}")]
    Unavailable { reason: String },

    /// The backend did not answer in time.
    #[error("storage operation timed out after {seconds}s")]
    Timeout { seconds: u64 },

    /// Any other backend failure.
    #[error("storage {operation} failed for {entity}: {message}")]
    Backend {
        operation: StorageOperation,
        entity: String,
        message: String,
    },
}

impl StorageError {
    /// Creates a Duplicate error.
    pub fn duplicate(entity: impl Into<String>, id: impl fmt::Debug) -> Self {
        Self::Duplicate {
            entity: entity.into(),
            id: format!("{:?}", id),
        }
    }

    /// Creates a Missing error.
    pub fn missing(entity: impl Into<String>, id: impl fmt::Debug) -> Self {
        Self::Missing {
            entity: entity.into(),
            id: format!("{:?}", id),
        }
    }

    /// Creates an Unavailable error.
    pub fn unavailable(reason: impl Into<String>) -> Self {
        Self::Unavailable {
            reason: reason.into(),
        }
    }

    /// Creates a Backend error.
    pub fn backend(
        operation: StorageOperation,
        entity: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::Backend {
            operation,
            entity: entity.into(),
            message: message.into(),
        }
    }

    /// Returns true if this is a transient error that might succeed on retry.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Unavailable { .. } | Self::Timeout { .. })
    }
}

/// Type alias for Results with HoardError.
pub type Result<T> = std::result::Result<T, HoardError>;
