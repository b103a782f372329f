//! Storage accessor trait definition.

use std::sync::Arc;

use hoard_core::{Entity, StorageError};

/// A source of truth for entities of type `V`.
///
/// This trait abstracts over persistence backends (relational databases,
/// key-value stores, in-memory tables) so the cache managers can write
/// through without knowing the underlying storage.
///
/// Every call is synchronous from the caller's point of view. Managers call
/// an accessor concurrently for different keys, so implementations must be
/// `Send + Sync`.
///
/// # Implementors
///
/// - `MemoryAccessor` - keeps rows in process memory
///
/// # Example
///
/// ```ignore
/// use hoard_storage::StorageAccessor;
///
/// struct MyAccessor;
///
/// impl StorageAccessor<Person> for MyAccessor {
///     fn create(&self, instance: Person) -> Result<Person, StorageError> {
///         // INSERT ...
///         Ok(instance)
///     }
///     // ...
///     fn name(&self) -> &str {
///         "my-accessor"
///     }
/// }
/// ```
pub trait StorageAccessor<V: Entity>: Send + Sync {
    /// Persists a new instance.
    ///
    /// The returned instance is what the cache stores; a backend that
    /// generates identities returns the instance carrying its new identity.
    ///
    /// # Errors
    ///
    /// - `StorageError::Duplicate` if a row with the same identity exists
    /// - `StorageError::Unavailable` if the backend is not accessible
    fn create(&self, instance: V) -> Result<V, StorageError>;

    /// Overwrites an existing row.
    ///
    /// # Errors
    ///
    /// - `StorageError::Missing` if there is no row to update
    fn update(&self, instance: &V) -> Result<(), StorageError>;

    /// Deletes a row, returning whether one existed.
    fn delete(&self, id: &V::Id) -> Result<bool, StorageError>;

    /// Reads one row by identity.
    fn load(&self, id: &V::Id) -> Result<Option<V>, StorageError>;

    /// Reads every row of this type.
    ///
    /// Used to pre-populate and to pull whole owner groups into a cache.
    fn query(&self) -> Result<Vec<V>, StorageError>;

    /// Returns the number of stored rows.
    ///
    /// The default implementation counts the result of `query`.
    fn count(&self) -> Result<usize, StorageError> {
        Ok(self.query()?.len())
    }

    /// Returns the name of this accessor.
    ///
    /// This is used for logging and identification purposes.
    fn name(&self) -> &str;
}

impl<V: Entity, A: StorageAccessor<V> + ?Sized> StorageAccessor<V> for Arc<A> {
    fn create(&self, instance: V) -> Result<V, StorageError> {
        (**self).create(instance)
    }

    fn update(&self, instance: &V) -> Result<(), StorageError> {
        (**self).update(instance)
    }

    fn delete(&self, id: &V::Id) -> Result<bool, StorageError> {
        (**self).delete(id)
    }

    fn load(&self, id: &V::Id) -> Result<Option<V>, StorageError> {
        (**self).load(id)
    }

    fn query(&self) -> Result<Vec<V>, StorageError> {
        (**self).query()
    }

    fn count(&self) -> Result<usize, StorageError> {
        (**self).count()
    }

    fn name(&self) -> &str {
        (**self).name()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hoard_core::{EntitySchema, Result};
    use parking_lot::Mutex;

    #[derive(Debug, Clone, PartialEq)]
    struct Note {
        id: u32,
    }

    impl Entity for Note {
        type Id = u32;

        fn id(&self) -> u32 {
            self.id
        }

        fn schema() -> Result<EntitySchema<Self>> {
            EntitySchema::builder("Note").build()
        }
    }

    struct VecAccessor {
        rows: Mutex<Vec<Note>>,
    }

    impl StorageAccessor<Note> for VecAccessor {
        fn create(&self, instance: Note) -> std::result::Result<Note, StorageError> {
            self.rows.lock().push(instance.clone());
            Ok(instance)
        }

        fn update(&self, _instance: &Note) -> std::result::Result<(), StorageError> {
            Ok(())
        }

        fn delete(&self, id: &u32) -> std::result::Result<bool, StorageError> {
            let mut rows = self.rows.lock();
            let before = rows.len();
            rows.retain(|n| n.id != *id);
            Ok(rows.len() != before)
        }

        fn load(&self, id: &u32) -> std::result::Result<Option<Note>, StorageError> {
            Ok(self.rows.lock().iter().find(|n| n.id == *id).cloned())
        }

        fn query(&self) -> std::result::Result<Vec<Note>, StorageError> {
            Ok(self.rows.lock().clone())
        }

        fn name(&self) -> &str {
            "vec"
        }
    }

    #[test]
    fn test_default_count_uses_query() {
        let accessor = VecAccessor {
            rows: Mutex::new(Vec::new()),
        };
        accessor.create(Note { id: 1 }).unwrap();
        accessor.create(Note { id: 2 }).unwrap();

        assert_eq!(accessor.count().unwrap(), 2);
    }

    #[test]
    fn test_arc_forwards_to_inner() {
        let accessor: Arc<dyn StorageAccessor<Note>> = Arc::new(VecAccessor {
            rows: Mutex::new(Vec::new()),
        });
        let shared = Arc::clone(&accessor);

        shared.create(Note { id: 7 }).unwrap();

        assert_eq!(accessor.load(&7).unwrap(), Some(Note { id: 7 }));
        assert!(shared.delete(&7).unwrap());
        assert!(!shared.delete(&7).unwrap());
        assert_eq!(shared.name(), "vec");
    }
}
