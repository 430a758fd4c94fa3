//! Mapping commands: strategies that turn an entity into a [`Document`].

use crate::document::Document;
use crate::error::{SolrError, SolrResult};
use crate::mapping::FieldMapping;
use crate::metadata::{DISCRIMINATOR_FIELD, ID_FIELD, Metadata};
use crate::value::FieldValue;
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// Registry name of [`MapAllFieldsCommand`].
pub const MAP_ALL: &str = "all";

/// Registry name of [`MapIdentifierCommand`].
pub const MAP_IDENTIFIER: &str = "identifier";

/// What a mapping command reads from: an entity (or a bare identifier)
/// together with its metadata.
pub trait DocumentSource {
    /// Fully-qualified entity type name.
    fn entity_type(&self) -> &str;

    /// Document name of the entity type.
    fn document_name(&self) -> &str;

    /// Document boost.
    fn document_boost(&self) -> Option<f32>;

    /// Unique document key.
    fn document_key(&self) -> SolrResult<String>;

    /// Declared fields in declaration order.
    fn fields(&self) -> Vec<&FieldMapping>;

    /// Read one declared field.
    fn read(&self, field: &str) -> SolrResult<FieldValue>;
}

/// An entity instance bound to its metadata.
pub struct EntitySource<'a, E> {
    meta: &'a Metadata<E>,
    entity: &'a E,
}

impl<'a, E: 'static> EntitySource<'a, E> {
    /// Bind an entity to its metadata.
    pub fn new(meta: &'a Metadata<E>, entity: &'a E) -> Self {
        Self { meta, entity }
    }
}

impl<E: 'static> DocumentSource for EntitySource<'_, E> {
    fn entity_type(&self) -> &str {
        self.meta.entity_type()
    }

    fn document_name(&self) -> &str {
        self.meta.document_name()
    }

    fn document_boost(&self) -> Option<f32> {
        self.meta.boost()
    }

    fn document_key(&self) -> SolrResult<String> {
        let identifier = self.meta.identifier_value(self.entity)?;
        Ok(self.meta.document_key(&identifier))
    }

    fn fields(&self) -> Vec<&FieldMapping> {
        self.meta.fields().collect()
    }

    fn read(&self, field: &str) -> SolrResult<FieldValue> {
        let mapped = self
            .meta
            .mapped_fields()
            .iter()
            .find(|f| f.mapping.name == field)
            .ok_or_else(|| SolrError::field(self.entity_type(), field, "field is not declared"))?;

        (mapped.getter)(self.entity)
            .map_err(|reason| SolrError::field(self.entity_type(), field, reason))
    }
}

/// A bare identifier bound to metadata, for lookups and deletes that have no
/// entity instance at hand.
pub struct IdentifierSource<'a, E> {
    meta: &'a Metadata<E>,
    identifier: FieldValue,
}

impl<'a, E: 'static> IdentifierSource<'a, E> {
    /// Bind an identifier value to metadata.
    pub fn new(meta: &'a Metadata<E>, identifier: impl Into<FieldValue>) -> Self {
        Self {
            meta,
            identifier: identifier.into(),
        }
    }
}

impl<E: 'static> DocumentSource for IdentifierSource<'_, E> {
    fn entity_type(&self) -> &str {
        self.meta.entity_type()
    }

    fn document_name(&self) -> &str {
        self.meta.document_name()
    }

    fn document_boost(&self) -> Option<f32> {
        self.meta.boost()
    }

    fn document_key(&self) -> SolrResult<String> {
        Ok(self.meta.document_key(&self.identifier))
    }

    fn fields(&self) -> Vec<&FieldMapping> {
        self.meta.fields().collect()
    }

    fn read(&self, field: &str) -> SolrResult<FieldValue> {
        Err(SolrError::field(
            self.entity_type(),
            field,
            "no entity instance is bound, only an identifier",
        ))
    }
}

/// Strategy for converting an entity into a document.
pub trait MappingCommand: Send + Sync {
    /// Build the document. `Ok(None)` means there is nothing to map.
    fn create_document(&self, source: &dyn DocumentSource) -> SolrResult<Option<Document>>;
}

/// Maps the key, the discriminator and every declared field.
///
/// A failing accessor aborts the whole document.
#[derive(Debug, Clone, Copy, Default)]
pub struct MapAllFieldsCommand;

impl MappingCommand for MapAllFieldsCommand {
    fn create_document(&self, source: &dyn DocumentSource) -> SolrResult<Option<Document>> {
        let fields = source.fields();
        if fields.is_empty() {
            return Ok(None);
        }

        let mut document = Document::new().with_boost(source.document_boost());
        document.add_field(ID_FIELD, source.document_key()?);
        document.add_field(DISCRIMINATOR_FIELD, source.document_name());

        for field in fields {
            let value = source.read(&field.name)?;
            if value.is_null() {
                continue;
            }
            document.add_boosted_field(field.name.clone(), normalize(field, &value), field.boost);
        }

        Ok(Some(document))
    }
}

/// Maps only the unique key.
#[derive(Debug, Clone, Copy, Default)]
pub struct MapIdentifierCommand;

impl MappingCommand for MapIdentifierCommand {
    fn create_document(&self, source: &dyn DocumentSource) -> SolrResult<Option<Document>> {
        let mut document = Document::new();
        document.add_field(ID_FIELD, source.document_key()?);
        Ok(Some(document))
    }
}

fn normalize(field: &FieldMapping, value: &FieldValue) -> Value {
    match value.to_json() {
        Value::Array(items) => Value::Array(items),
        scalar if field.field_type.is_multi_valued() => Value::Array(vec![scalar]),
        scalar => scalar,
    }
}

/// Mapping commands keyed by name.
#[derive(Clone, Default)]
pub struct CommandRegistry {
    commands: HashMap<String, Arc<dyn MappingCommand>>,
}

impl CommandRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a registry holding the built-in `all` and `identifier` commands.
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.add(MAP_ALL, MapAllFieldsCommand);
        registry.add(MAP_IDENTIFIER, MapIdentifierCommand);
        registry
    }

    /// Register a command, replacing any command with the same name.
    pub fn add(&mut self, name: impl Into<String>, command: impl MappingCommand + 'static) {
        self.commands.insert(name.into(), Arc::new(command));
    }

    /// Look up a command.
    pub fn get(&self, name: &str) -> SolrResult<Arc<dyn MappingCommand>> {
        self.commands
            .get(name)
            .cloned()
            .ok_or_else(|| SolrError::Config(format!("No mapping command named '{}'", name)))
    }

    /// Registered command names, sorted.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<_> = self.commands.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

impl fmt::Debug for CommandRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CommandRegistry")
            .field("commands", &self.names())
            .finish()
    }
}
