//! Entity ↔ document mapping and result hydration.

use crate::command::{CommandRegistry, EntitySource, IdentifierSource, MAP_IDENTIFIER};
use crate::document::Document;
use crate::error::{SolrError, SolrResult};
use crate::mapping::Indexable;
use crate::metadata::Metadata;
use crate::value::FieldValue;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use tracing::trace;

/// How search hits are turned into results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HydrationMode {
    /// Build domain objects through the registered setters.
    #[default]
    Domain,
    /// Return the hit's field mapping unchanged.
    Raw,
}

/// A hydrated search hit.
#[derive(Debug, Clone, PartialEq)]
pub enum Hydrated<E> {
    /// A domain object.
    Entity(E),
    /// The raw document.
    Raw(Document),
}

impl<E> Hydrated<E> {
    /// The domain object, if hydrated in domain mode.
    pub fn into_entity(self) -> Option<E> {
        match self {
            Hydrated::Entity(entity) => Some(entity),
            Hydrated::Raw(_) => None,
        }
    }

    /// Borrow the domain object.
    pub fn as_entity(&self) -> Option<&E> {
        match self {
            Hydrated::Entity(entity) => Some(entity),
            Hydrated::Raw(_) => None,
        }
    }

    /// The raw document, if hydrated in raw mode.
    pub fn into_raw(self) -> Option<Document> {
        match self {
            Hydrated::Raw(document) => Some(document),
            Hydrated::Entity(_) => None,
        }
    }

    /// Borrow the raw document.
    pub fn as_raw(&self) -> Option<&Document> {
        match self {
            Hydrated::Raw(document) => Some(document),
            Hydrated::Entity(_) => None,
        }
    }
}

/// Instances already loaded in the current session, keyed by entity type and
/// document key.
///
/// Hydration starts from the mapped instance instead of a blank one, so
/// fields the index does not store keep the values the session already has.
/// The hydrated result is then registered back, replacing the shared
/// instance. Lookups hand out that one shared instance until it is replaced.
#[derive(Default)]
pub struct IdentityMap {
    entries: RwLock<HashMap<(TypeId, String), Arc<dyn Any + Send + Sync>>>,
}

impl IdentityMap {
    /// Create an empty identity map.
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the instance registered under a document key.
    pub fn get<E: Indexable>(&self, key: &str) -> Option<Arc<E>> {
        let entry = self
            .entries
            .read()
            .get(&(TypeId::of::<E>(), key.to_string()))
            .cloned()?;
        entry.downcast::<E>().ok()
    }

    /// Register an instance under a document key.
    pub fn insert<E: Indexable>(&self, key: impl Into<String>, entity: E) {
        self.insert_shared(key, Arc::new(entity));
    }

    /// Register an instance the caller keeps a handle to.
    pub fn insert_shared<E: Indexable>(&self, key: impl Into<String>, entity: Arc<E>) {
        self.entries
            .write()
            .insert((TypeId::of::<E>(), key.into()), entity);
    }

    /// Forget the instance registered under a document key.
    pub fn remove<E: Indexable>(&self, key: &str) -> bool {
        self.entries
            .write()
            .remove(&(TypeId::of::<E>(), key.to_string()))
            .is_some()
    }

    /// Number of registered instances.
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    /// Whether no instance is registered.
    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    /// Forget every instance.
    pub fn clear(&self) {
        self.entries.write().clear();
    }
}

impl fmt::Debug for IdentityMap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IdentityMap")
            .field("entries", &self.len())
            .finish()
    }
}

/// Runs mapping commands and hydrates search hits.
#[derive(Debug, Clone)]
pub struct DocumentMapper {
    commands: Arc<CommandRegistry>,
}

impl DocumentMapper {
    /// Create a mapper selecting commands from the given registry.
    pub fn new(commands: Arc<CommandRegistry>) -> Self {
        Self { commands }
    }

    /// The command registry.
    pub fn commands(&self) -> &CommandRegistry {
        &self.commands
    }

    /// Map an entity with the named command.
    pub fn to_document<E: Indexable>(
        &self,
        command: &str,
        meta: &Metadata<E>,
        entity: &E,
    ) -> SolrResult<Option<Document>> {
        self.commands
            .get(command)?
            .create_document(&EntitySource::new(meta, entity))
    }

    /// Build the key-only document for an identifier.
    pub fn identifier_document<E: Indexable>(
        &self,
        meta: &Metadata<E>,
        identifier: impl Into<FieldValue>,
    ) -> SolrResult<Document> {
        self.commands
            .get(MAP_IDENTIFIER)?
            .create_document(&IdentifierSource::new(meta, identifier))?
            .ok_or_else(|| {
                SolrError::mapping(meta.entity_type(), "identifier command produced no document")
            })
    }

    /// Turn a search hit into a result according to the hydration mode.
    pub fn to_entity<E: Indexable>(
        &self,
        document: Document,
        meta: &Metadata<E>,
        mode: HydrationMode,
        identity: Option<&IdentityMap>,
    ) -> SolrResult<Hydrated<E>> {
        if mode == HydrationMode::Raw {
            return Ok(Hydrated::Raw(document));
        }

        let key = document.id();

        let mut entity = key
            .and_then(|key| identity.and_then(|map| map.get::<E>(key)))
            .map(Arc::unwrap_or_clone)
            .unwrap_or_default();

        if let Some(key) = key {
            let identifier = meta.identifier_from_key(key)?;
            meta.set_identifier(&mut entity, identifier)?;
        }

        for field in meta.mapped_fields() {
            let name = &field.mapping.name;
            let Some(raw) = document.field(name) else {
                continue;
            };
            let Some(setter) = &field.setter else {
                trace!("No setter for {}.{}, skipping", meta.entity_type(), name);
                continue;
            };

            let value = field
                .mapping
                .field_type
                .read_json(raw)
                .map_err(|reason| SolrError::field(meta.entity_type(), name, reason))?;

            setter(&mut entity, value)
                .map_err(|reason| SolrError::field(meta.entity_type(), name, reason))?;
        }

        if let (Some(map), Some(key)) = (identity, key) {
            map.insert(key, entity.clone());
        }

        Ok(Hydrated::Entity(entity))
    }
}

impl Default for DocumentMapper {
    fn default() -> Self {
        Self::new(Arc::new(CommandRegistry::with_defaults()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::MAP_ALL;
    use crate::mapping::{EntityMapping, FieldMapping};
    use crate::metadata::MetadataFactory;
    use crate::value::FieldType;
    use serde_json::json;

    #[derive(Debug, Clone, Default, PartialEq)]
    struct Book {
        id: i64,
        title: String,
        pages: i64,
        shelf: String,
    }

    impl Indexable for Book {
        fn mapping() -> EntityMapping<Self> {
            EntityMapping::new()
                .document()
                .identifier("id", FieldType::Long)
                .field(FieldMapping::new("title").kind(FieldType::Text))
                .field(FieldMapping::new("pages").kind(FieldType::Integer))
                .getter("get_id", |b: &Book| b.id)
                .setter("set_id", |b: &mut Book, v| b.id = v.as_i64().unwrap_or_default())
                .getter("get_title", |b: &Book| b.title.clone())
                .setter("set_title", |b: &mut Book, v| {
                    b.title = v.into_string().unwrap_or_default()
                })
                .getter("get_pages", |b: &Book| b.pages)
                .setter("set_pages", |b: &mut Book, v| b.pages = v.as_i64().unwrap_or_default())
        }
    }

    fn hit() -> Document {
        Document::from_json(json!({
            "id": "book_3",
            "document_name_s": "book",
            "title": "Dune",
            "pages": [412],
            "score": 1.7
        }))
        .unwrap()
    }

    #[test]
    fn test_to_document_uses_named_command() {
        let mapper = DocumentMapper::default();
        let meta = MetadataFactory::new().load::<Book>().unwrap();
        let book = Book {
            id: 3,
            title: "Dune".into(),
            pages: 412,
            shelf: String::new(),
        };

        let doc = mapper.to_document(MAP_ALL, &meta, &book).unwrap().unwrap();
        assert_eq!(doc.field("pages"), Some(&json!(412)));

        let err = mapper.to_document("nope", &meta, &book).unwrap_err();
        assert!(matches!(err, SolrError::Config(_)));
    }

    #[test]
    fn test_domain_hydration() {
        let mapper = DocumentMapper::default();
        let meta = MetadataFactory::new().load::<Book>().unwrap();

        let book = mapper
            .to_entity(hit(), &meta, HydrationMode::Domain, None)
            .unwrap()
            .into_entity()
            .unwrap();

        assert_eq!(book.id, 3);
        assert_eq!(book.title, "Dune");
        assert_eq!(book.pages, 412);
    }

    #[test]
    fn test_absent_fields_are_skipped() {
        let mapper = DocumentMapper::default();
        let meta = MetadataFactory::new().load::<Book>().unwrap();
        let doc = Document::from_json(json!({ "id": "book_9" })).unwrap();

        let book = mapper
            .to_entity(doc, &meta, HydrationMode::Domain, None)
            .unwrap()
            .into_entity()
            .unwrap();

        assert_eq!(book, Book { id: 9, ..Book::default() });
    }

    #[test]
    fn test_raw_hydration_returns_document_unchanged() {
        let mapper = DocumentMapper::default();
        let meta = MetadataFactory::new().load::<Book>().unwrap();

        let raw = mapper
            .to_entity(hit(), &meta, HydrationMode::Raw, None)
            .unwrap()
            .into_raw()
            .unwrap();

        assert_eq!(raw, hit());
    }

    #[test]
    fn test_identity_map_instance_is_reused() {
        let mapper = DocumentMapper::default();
        let meta = MetadataFactory::new().load::<Book>().unwrap();
        let identity = IdentityMap::new();
        identity.insert(
            "book_3",
            Book {
                id: 3,
                shelf: "B2".into(),
                ..Book::default()
            },
        );

        let book = mapper
            .to_entity(hit(), &meta, HydrationMode::Domain, Some(&identity))
            .unwrap()
            .into_entity()
            .unwrap();

        assert_eq!(book.shelf, "B2");
        assert_eq!(book.title, "Dune");
        assert_eq!(identity.get::<Book>("book_3").as_deref(), Some(&book));
    }

    #[test]
    fn test_identity_map_lookups_share_one_instance() {
        let identity = IdentityMap::new();
        let shelved = Arc::new(Book {
            id: 3,
            ..Book::default()
        });
        identity.insert_shared("book_3", shelved.clone());

        let first = identity.get::<Book>("book_3").unwrap();
        let second = identity.get::<Book>("book_3").unwrap();

        assert!(Arc::ptr_eq(&first, &second));
        assert!(Arc::ptr_eq(&first, &shelved));
        assert!(identity.get::<Book>("book_4").is_none());
        assert!(identity.remove::<Book>("book_3"));
        assert!(identity.is_empty());
    }

    #[test]
    fn test_conversion_failure_is_field_mapping_error() {
        let mapper = DocumentMapper::default();
        let meta = MetadataFactory::new().load::<Book>().unwrap();
        let doc = Document::from_json(json!({ "id": "book_1", "pages": "many" })).unwrap();

        let err = mapper
            .to_entity(doc, &meta, HydrationMode::Domain, None)
            .unwrap_err();
        assert!(matches!(err, SolrError::FieldMapping { ref field, .. } if field == "pages"));
    }

    #[test]
    fn test_identifier_document() {
        let mapper = DocumentMapper::default();
        let meta = MetadataFactory::new().load::<Book>().unwrap();
        let doc = mapper.identifier_document(&meta, 5).unwrap();
        assert_eq!(doc.id(), Some("book_5"));
    }
}
