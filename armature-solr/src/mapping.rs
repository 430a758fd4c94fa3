//! Declarative mapping tables.
//!
//! An entity type describes how it maps to a Solr document by implementing
//! [`Indexable`]. The returned [`EntityMapping`] declares the document, its
//! identifier and fields, and registers the accessors used to read and write
//! field values. Accessors are looked up by name (`get_<field>` /
//! `set_<field>` unless a custom getter is declared) when the metadata is
//! compiled, so a missing accessor fails at the first lookup instead of in the
//! middle of a write.
//!
//! # Example
//!
//! ```rust
//! use armature_solr::{EntityMapping, FieldMapping, FieldType, Indexable};
//!
//! #[derive(Debug, Clone, Default)]
//! struct Post {
//!     id: i64,
//!     title: String,
//! }
//!
//! impl Indexable for Post {
//!     fn mapping() -> EntityMapping<Self> {
//!         EntityMapping::new()
//!             .document()
//!             .identifier("id", FieldType::Long)
//!             .field(FieldMapping::new("title"))
//!             .getter("get_id", |p: &Post| p.id)
//!             .setter("set_id", |p: &mut Post, v| p.id = v.as_i64().unwrap_or_default())
//!             .getter("get_title", |p: &Post| p.title.clone())
//!             .setter("set_title", |p: &mut Post, v| {
//!                 p.title = v.into_string().unwrap_or_default()
//!             })
//!     }
//! }
//! ```

use crate::value::{FieldType, FieldValue};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// Reads a field value from an entity.
pub type Getter<E> = Arc<dyn Fn(&E) -> Result<FieldValue, String> + Send + Sync>;

/// Writes a field value into an entity.
pub type Setter<E> = Arc<dyn Fn(&mut E, FieldValue) -> Result<(), String> + Send + Sync>;

/// An entity type that can be stored in and loaded from a Solr index.
///
/// `Default` provides the blank instance used as a query template and as the
/// starting point for hydration.
pub trait Indexable: Default + Clone + Send + Sync + 'static {
    /// Returns the mapping table for this type.
    fn mapping() -> EntityMapping<Self>;
}

/// Accessor name used for a field without a custom getter.
pub fn getter_name(field: &str) -> String {
    format!("get_{}", field)
}

/// Accessor name used to hydrate a field.
pub fn setter_name(field: &str) -> String {
    format!("set_{}", field)
}

/// Declaration of one searchable field.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldMapping {
    /// Field name in the document.
    pub name: String,
    /// Declared type.
    pub field_type: FieldType,
    /// Index-time boost.
    pub boost: Option<f32>,
    /// Custom getter name, replacing `get_<name>`.
    pub getter: Option<String>,
}

impl FieldMapping {
    /// Declare a string field.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            field_type: FieldType::default(),
            boost: None,
            getter: None,
        }
    }

    /// Set the field type.
    pub fn kind(mut self, field_type: FieldType) -> Self {
        self.field_type = field_type;
        self
    }

    /// Set the index-time boost.
    pub fn boost(mut self, boost: f32) -> Self {
        self.boost = Some(boost);
        self
    }

    /// Read the value through a differently named getter.
    pub fn getter(mut self, getter: impl Into<String>) -> Self {
        self.getter = Some(getter.into());
        self
    }

    /// Name of the getter this field reads through.
    pub fn getter_name(&self) -> String {
        self.getter.clone().unwrap_or_else(|| getter_name(&self.name))
    }
}

/// Declaration of the identifier field.
#[derive(Debug, Clone, PartialEq)]
pub struct IdentifierMapping {
    /// Identifier field name on the entity.
    pub name: String,
    /// Identifier type, used to parse it back out of document keys.
    pub field_type: FieldType,
}

/// Mapping table for one entity type.
pub struct EntityMapping<E> {
    pub(crate) declared: bool,
    pub(crate) document_name: Option<String>,
    pub(crate) index: Option<String>,
    pub(crate) boost: Option<f32>,
    pub(crate) identifier: Option<IdentifierMapping>,
    pub(crate) fields: Vec<FieldMapping>,
    pub(crate) getters: HashMap<String, Getter<E>>,
    pub(crate) setters: HashMap<String, Setter<E>>,
}

impl<E> Default for EntityMapping<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E> EntityMapping<E> {
    /// Create an empty mapping. Call [`EntityMapping::document`] to declare
    /// the type as a document.
    pub fn new() -> Self {
        Self {
            declared: false,
            document_name: None,
            index: None,
            boost: None,
            identifier: None,
            fields: Vec::new(),
            getters: HashMap::new(),
            setters: HashMap::new(),
        }
    }

    /// Declare the type as an indexed document.
    pub fn document(mut self) -> Self {
        self.declared = true;
        self
    }

    /// Override the document name derived from the type name.
    pub fn document_name(mut self, name: impl Into<String>) -> Self {
        self.document_name = Some(name.into());
        self
    }

    /// Store documents of this type in the given core.
    pub fn index(mut self, index: impl Into<String>) -> Self {
        self.index = Some(index.into());
        self
    }

    /// Set the document boost.
    pub fn boost(mut self, boost: f32) -> Self {
        self.boost = Some(boost);
        self
    }

    /// Declare the identifier field.
    pub fn identifier(mut self, name: impl Into<String>, field_type: FieldType) -> Self {
        self.identifier = Some(IdentifierMapping {
            name: name.into(),
            field_type,
        });
        self
    }

    /// Declare a searchable field.
    pub fn field(mut self, field: FieldMapping) -> Self {
        self.fields.push(field);
        self
    }

    /// Register an infallible getter.
    pub fn getter<V, F>(self, name: impl Into<String>, getter: F) -> Self
    where
        V: Into<FieldValue>,
        F: Fn(&E) -> V + Send + Sync + 'static,
    {
        self.try_getter(name, move |entity| Ok(getter(entity).into()))
    }

    /// Register a getter that may fail.
    pub fn try_getter<F>(mut self, name: impl Into<String>, getter: F) -> Self
    where
        F: Fn(&E) -> Result<FieldValue, String> + Send + Sync + 'static,
    {
        self.getters.insert(name.into(), Arc::new(getter));
        self
    }

    /// Register an infallible setter.
    pub fn setter<F>(self, name: impl Into<String>, setter: F) -> Self
    where
        F: Fn(&mut E, FieldValue) + Send + Sync + 'static,
    {
        self.try_setter(name, move |entity, value| {
            setter(entity, value);
            Ok(())
        })
    }

    /// Register a setter that may reject the value.
    pub fn try_setter<F>(mut self, name: impl Into<String>, setter: F) -> Self
    where
        F: Fn(&mut E, FieldValue) -> Result<(), String> + Send + Sync + 'static,
    {
        self.setters.insert(name.into(), Arc::new(setter));
        self
    }
}

impl<E> fmt::Debug for EntityMapping<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut getters: Vec<_> = self.getters.keys().collect();
        getters.sort();
        let mut setters: Vec<_> = self.setters.keys().collect();
        setters.sort();

        f.debug_struct("EntityMapping")
            .field("declared", &self.declared)
            .field("document_name", &self.document_name)
            .field("index", &self.index)
            .field("identifier", &self.identifier)
            .field("fields", &self.fields)
            .field("getters", &getters)
            .field("setters", &setters)
            .finish()
    }
}
