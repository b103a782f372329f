//! Field-descriptor tables.
//!
//! Each entity type declares its fields once, as an explicit table of
//! getter/setter pairs. Managers resolve descriptors from this table when
//! they are constructed; nothing is looked up reflectively at call time.

use std::fmt;
use std::sync::Arc;

use indexmap::IndexMap;

use crate::error::{HoardError, Result};
use crate::value::FieldValue;

/// Name of the implicit index every region manager maintains.
pub const OWNER_FIELD: &str = "owner";

type Getter<V> = Arc<dyn Fn(&V) -> FieldValue + Send + Sync>;
type Setter<V> = Arc<dyn Fn(&mut V, FieldValue) -> Result<()> + Send + Sync>;

/// Accessors and metadata for one field of `V`.
pub struct FieldDescriptor<V> {
    entity: Arc<str>,
    name: String,
    getter: Getter<V>,
    setter: Option<Setter<V>>,
    indexed: bool,
}

impl<V> FieldDescriptor<V> {
    /// Returns the field name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns true if the field has an index table.
    pub fn is_indexed(&self) -> bool {
        self.indexed
    }

    /// Returns true if the field can be modified.
    pub fn is_writable(&self) -> bool {
        self.setter.is_some()
    }

    /// Reads the field from an instance.
    pub fn get(&self, instance: &V) -> FieldValue {
        (self.getter)(instance)
    }

    /// Writes the field on an instance.
    ///
    /// # Errors
    ///
    /// - `HoardError::ReadOnlyField` if the field has no setter
    /// - `HoardError::FieldType` if the value has the wrong type
    pub fn set(&self, instance: &mut V, value: FieldValue) -> Result<()> {
        let setter = self
            .setter
            .as_ref()
            .ok_or_else(|| HoardError::read_only(self.entity.as_ref(), &self.name))?;
        setter(instance, value).map_err(|e| e.for_field(&self.name))
    }
}

impl<V> Clone for FieldDescriptor<V> {
    fn clone(&self) -> Self {
        Self {
            entity: Arc::clone(&self.entity),
            name: self.name.clone(),
            getter: Arc::clone(&self.getter),
            setter: self.setter.clone(),
            indexed: self.indexed,
        }
    }
}

impl<V> fmt::Debug for FieldDescriptor<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FieldDescriptor")
            .field("name", &self.name)
            .field("indexed", &self.indexed)
            .field("writable", &self.is_writable())
            .finish()
    }
}

/// The declared fields of an entity type.
///
/// # Example
///
/// ```
/// use hoard_core::{EntitySchema, FieldValue};
///
/// #[derive(Clone)]
/// struct Person {
///     name: String,
///     age: i64,
/// }
///
/// let schema = EntitySchema::<Person>::builder("Person")
///     .indexed("name", |p| FieldValue::from(&p.name), |p, v| {
///         p.name = v.try_into()?;
///         Ok(())
///     })
///     .field("age", |p| p.age.into(), |p, v| {
///         p.age = v.try_into()?;
///         Ok(())
///     })
///     .build()
///     .unwrap();
///
/// assert!(schema.indexed_field("name").is_ok());
/// assert!(schema.indexed_field("age").unwrap_err().is_index_error());
/// ```
pub struct EntitySchema<V> {
    type_name: Arc<str>,
    fields: IndexMap<String, FieldDescriptor<V>>,
}

impl<V> EntitySchema<V> {
    /// Creates a new builder for the given type name.
    pub fn builder(type_name: impl Into<String>) -> EntitySchemaBuilder<V> {
        EntitySchemaBuilder {
            type_name: Arc::from(type_name.into()),
            fields: Vec::new(),
        }
    }

    /// Returns the type name the schema was declared with.
    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    /// Looks up a declared field.
    pub fn field(&self, name: &str) -> Result<&FieldDescriptor<V>> {
        self.fields
            .get(name)
            .ok_or_else(|| HoardError::unknown_field(self.type_name.as_ref(), name))
    }

    /// Looks up a field that must be indexed.
    ///
    /// Unknown fields and non-indexed fields both yield `HoardError::Index`.
    pub fn indexed_field(&self, name: &str) -> Result<&FieldDescriptor<V>> {
        match self.fields.get(name) {
            Some(descriptor) if descriptor.indexed => Ok(descriptor),
            _ => Err(HoardError::index(self.type_name.as_ref(), name)),
        }
    }

    /// Iterates over all fields in declaration order.
    pub fn fields(&self) -> impl Iterator<Item = &FieldDescriptor<V>> {
        self.fields.values()
    }

    /// Iterates over the indexed fields in declaration order.
    pub fn indexed_fields(&self) -> impl Iterator<Item = &FieldDescriptor<V>> {
        self.fields.values().filter(|d| d.indexed)
    }

    /// Returns the number of declared fields.
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Returns true if no fields were declared.
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Ensures an indexed `owner` field exists.
    ///
    /// A declared `owner` field is switched to indexed; otherwise a read-only
    /// indexed descriptor backed by `getter` is appended.
    pub fn with_owner_index<G>(mut self, getter: G) -> Self
    where
        G: Fn(&V) -> FieldValue + Send + Sync + 'static,
    {
        match self.fields.get_mut(OWNER_FIELD) {
            Some(descriptor) => descriptor.indexed = true,
            None => {
                let descriptor = FieldDescriptor {
                    entity: Arc::clone(&self.type_name),
                    name: OWNER_FIELD.to_string(),
                    getter: Arc::new(getter),
                    setter: None,
                    indexed: true,
                };
                self.fields.insert(OWNER_FIELD.to_string(), descriptor);
            },
        }
        self
    }

    /// Renders every field of an instance as a JSON object.
    pub fn describe(&self, instance: &V) -> serde_json::Value {
        let map = self
            .fields
            .values()
            .map(|d| (d.name.clone(), serde_json::Value::from(d.get(instance))))
            .collect::<serde_json::Map<_, _>>();
        serde_json::Value::Object(map)
    }
}

impl<V> Clone for EntitySchema<V> {
    fn clone(&self) -> Self {
        Self {
            type_name: Arc::clone(&self.type_name),
            fields: self.fields.clone(),
        }
    }
}

impl<V> fmt::Debug for EntitySchema<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EntitySchema")
            .field("type_name", &self.type_name)
            .field("fields", &self.fields.values().collect::<Vec<_>>())
            .finish()
    }
}

/// Builder for EntitySchema.
pub struct EntitySchemaBuilder<V> {
    type_name: Arc<str>,
    fields: Vec<FieldDescriptor<V>>,
}

impl<V> EntitySchemaBuilder<V> {
    /// Adds a writable, non-indexed field.
    pub fn field<G, S>(self, name: impl Into<String>, getter: G, setter: S) -> Self
    where
        G: Fn(&V) -> FieldValue + Send + Sync + 'static,
        S: Fn(&mut V, FieldValue) -> Result<()> + Send + Sync + 'static,
    {
        self.push(name.into(), Arc::new(getter), Some(Arc::new(setter)), false)
    }

    /// Adds a writable, indexed field.
    pub fn indexed<G, S>(self, name: impl Into<String>, getter: G, setter: S) -> Self
    where
        G: Fn(&V) -> FieldValue + Send + Sync + 'static,
        S: Fn(&mut V, FieldValue) -> Result<()> + Send + Sync + 'static,
    {
        self.push(name.into(), Arc::new(getter), Some(Arc::new(setter)), true)
    }

    /// Adds a field without a setter.
    pub fn read_only<G>(self, name: impl Into<String>, getter: G, indexed: bool) -> Self
    where
        G: Fn(&V) -> FieldValue + Send + Sync + 'static,
    {
        self.push(name.into(), Arc::new(getter), None, indexed)
    }

    fn push(
        mut self,
        name: String,
        getter: Getter<V>,
        setter: Option<Setter<V>>,
        indexed: bool,
    ) -> Self {
        self.fields.push(FieldDescriptor {
            entity: Arc::clone(&self.type_name),
            name,
            getter,
            setter,
            indexed,
        });
        self
    }

    /// Builds the schema.
    ///
    /// # Errors
    ///
    /// `HoardError::Registration` if a field name is declared twice.
    pub fn build(self) -> Result<EntitySchema<V>> {
        let mut fields = IndexMap::with_capacity(self.fields.len());
        for descriptor in self.fields {
            if fields.contains_key(&descriptor.name) {
                return Err(HoardError::registration(
                    self.type_name.as_ref(),
                    format!("field '{}' declared twice", descriptor.name),
                ));
            }
            fields.insert(descriptor.name.clone(), descriptor);
        }

        Ok(EntitySchema {
            type_name: self.type_name,
            fields,
        })
    }
}
