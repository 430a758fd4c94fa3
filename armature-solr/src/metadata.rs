//! Compiled entity metadata and the caching factory that produces it.

use crate::error::{SolrError, SolrResult};
use crate::mapping::{
    EntityMapping, FieldMapping, Getter, IdentifierMapping, Indexable, Setter, getter_name,
    setter_name,
};
use crate::value::FieldValue;
use parking_lot::RwLock;
use std::any::{Any, TypeId};
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::Arc;
use tracing::debug;

/// Reserved unique key field.
pub const ID_FIELD: &str = "id";

/// Reserved field holding the document name of every document.
pub const DISCRIMINATOR_FIELD: &str = "document_name_s";

/// A declared field together with its resolved accessors.
pub(crate) struct MappedField<E> {
    pub(crate) mapping: FieldMapping,
    pub(crate) getter: Getter<E>,
    pub(crate) setter: Option<Setter<E>>,
}

/// Compiled description of how an entity type maps to a document.
///
/// Built once per type by [`MetadataFactory`] and never mutated afterwards.
pub struct Metadata<E> {
    entity_type: &'static str,
    document_name: String,
    index: Option<String>,
    boost: Option<f32>,
    identifier: IdentifierMapping,
    identifier_getter: Getter<E>,
    identifier_setter: Option<Setter<E>>,
    fields: Vec<MappedField<E>>,
}

impl<E: 'static> Metadata<E> {
    /// Compile a mapping table, resolving every accessor.
    pub fn compile(mapping: EntityMapping<E>) -> SolrResult<Self> {
        let entity_type = std::any::type_name::<E>();

        if !mapping.declared {
            return Err(SolrError::mapping(entity_type, "no document declaration"));
        }

        let identifier = mapping
            .identifier
            .ok_or_else(|| SolrError::mapping(entity_type, "no identifier field declared"))?;

        if let Some(boost) = mapping.boost
            && !(boost.is_finite() && boost >= 0.0)
        {
            return Err(SolrError::mapping(
                entity_type,
                format!("invalid document boost {}", boost),
            ));
        }

        let identifier_getter = mapping
            .getters
            .get(&getter_name(&identifier.name))
            .cloned()
            .ok_or_else(|| {
                SolrError::field(
                    entity_type,
                    &identifier.name,
                    format!("getter `{}` is not registered", getter_name(&identifier.name)),
                )
            })?;
        let identifier_setter = mapping.setters.get(&setter_name(&identifier.name)).cloned();

        let mut seen = HashSet::new();
        let mut fields = Vec::with_capacity(mapping.fields.len());

        for field in mapping.fields {
            if field.name == ID_FIELD || field.name == DISCRIMINATOR_FIELD {
                return Err(SolrError::mapping(
                    entity_type,
                    format!("field name `{}` is reserved", field.name),
                ));
            }
            if field.name == identifier.name {
                return Err(SolrError::mapping(
                    entity_type,
                    format!("`{}` is declared both as identifier and as field", field.name),
                ));
            }
            if !seen.insert(field.name.clone()) {
                return Err(SolrError::mapping(
                    entity_type,
                    format!("field `{}` is declared twice", field.name),
                ));
            }
            if let Some(boost) = field.boost
                && !(boost.is_finite() && boost >= 0.0)
            {
                return Err(SolrError::field(
                    entity_type,
                    &field.name,
                    format!("invalid boost {}", boost),
                ));
            }

            let getter_name = field.getter_name();
            let getter = mapping.getters.get(&getter_name).cloned().ok_or_else(|| {
                SolrError::field(
                    entity_type,
                    &field.name,
                    format!("getter `{}` is not registered", getter_name),
                )
            })?;
            let setter = mapping.setters.get(&setter_name(&field.name)).cloned();

            fields.push(MappedField {
                mapping: field,
                getter,
                setter,
            });
        }

        let document_name = mapping
            .document_name
            .unwrap_or_else(|| document_name_of(entity_type));

        debug!(
            "Compiled metadata for {} (document {}, {} fields)",
            entity_type,
            document_name,
            fields.len()
        );

        Ok(Self {
            entity_type,
            document_name,
            index: mapping.index,
            boost: mapping.boost,
            identifier,
            identifier_getter,
            identifier_setter,
            fields,
        })
    }

    /// Fully-qualified entity type name.
    pub fn entity_type(&self) -> &'static str {
        self.entity_type
    }

    /// Document name used as discriminator and key prefix.
    pub fn document_name(&self) -> &str {
        &self.document_name
    }

    /// Target core, if the mapping declares one.
    pub fn index(&self) -> Option<&str> {
        self.index.as_deref()
    }

    /// Document boost.
    pub fn boost(&self) -> Option<f32> {
        self.boost
    }

    /// Identifier declaration.
    pub fn identifier(&self) -> &IdentifierMapping {
        &self.identifier
    }

    /// Declared fields in declaration order.
    pub fn fields(&self) -> impl Iterator<Item = &FieldMapping> {
        self.fields.iter().map(|f| &f.mapping)
    }

    /// Look up a declared field by name.
    pub fn field(&self, name: &str) -> Option<&FieldMapping> {
        self.fields().find(|f| f.name == name)
    }

    /// Whether any searchable field is declared.
    pub fn has_fields(&self) -> bool {
        !self.fields.is_empty()
    }

    /// Read the identifier value of an entity.
    pub fn identifier_value(&self, entity: &E) -> SolrResult<FieldValue> {
        (self.identifier_getter)(entity)
            .map_err(|reason| SolrError::field(self.entity_type, &self.identifier.name, reason))
    }

    /// Compute the unique document key `<document_name>_<identifier>`.
    pub fn document_key(&self, identifier: &FieldValue) -> String {
        format!("{}_{}", self.document_name, identifier.to_term())
    }

    /// Recover the identifier from a document key produced by
    /// [`Metadata::document_key`].
    pub fn identifier_from_key(&self, key: &str) -> SolrResult<FieldValue> {
        let raw = key
            .strip_prefix(&self.document_name)
            .and_then(|rest| rest.strip_prefix('_'))
            .ok_or_else(|| {
                SolrError::field(
                    self.entity_type,
                    ID_FIELD,
                    format!("key `{}` does not belong to document {}", key, self.document_name),
                )
            })?;

        self.identifier
            .field_type
            .read_json(&serde_json::Value::String(raw.to_string()))
            .map_err(|reason| SolrError::field(self.entity_type, &self.identifier.name, reason))
    }

    /// Write the identifier into an entity, if a setter is registered.
    pub(crate) fn set_identifier(&self, entity: &mut E, value: FieldValue) -> SolrResult<bool> {
        match &self.identifier_setter {
            Some(setter) => setter(entity, value).map(|_| true).map_err(|reason| {
                SolrError::field(self.entity_type, &self.identifier.name, reason)
            }),
            None => Ok(false),
        }
    }

    pub(crate) fn mapped_fields(&self) -> &[MappedField<E>] {
        &self.fields
    }
}

impl<E> fmt::Debug for Metadata<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Metadata")
            .field("entity_type", &self.entity_type)
            .field("document_name", &self.document_name)
            .field("index", &self.index)
            .field("identifier", &self.identifier)
            .field(
                "fields",
                &self.fields.iter().map(|f| &f.mapping).collect::<Vec<_>>(),
            )
            .finish()
    }
}

/// Derive a document name from a type name: the last path segment,
/// without generic arguments, lower-cased.
pub fn document_name_of(type_name: &str) -> String {
    let base = type_name.split('<').next().unwrap_or(type_name);
    base.rsplit("::").next().unwrap_or(base).to_lowercase()
}

/// Produces and caches [`Metadata`] per entity type.
///
/// Concurrent first lookups for the same type may each compile a value, but
/// only the first one is published and every caller receives that one.
///
/// Document names are unique per factory. A type whose name is already
/// claimed by another type, or whose keys could be mistaken for another
/// type's keys (`post` and `post_tag`), is rejected with a mapping error.
#[derive(Default)]
pub struct MetadataFactory {
    registry: RwLock<Registry>,
}

#[derive(Default)]
struct Registry {
    entries: HashMap<TypeId, Arc<dyn Any + Send + Sync>>,
    // document name -> entity type that claimed it
    names: HashMap<String, &'static str>,
}

impl Registry {
    fn claim(&mut self, entity_type: &'static str, name: &str) -> SolrResult<()> {
        for (claimed, owner) in &self.names {
            if claimed == name {
                return Err(SolrError::mapping(
                    entity_type,
                    format!("document name `{}` is already used by {}", name, owner),
                ));
            }
            if is_key_prefix(claimed, name) || is_key_prefix(name, claimed) {
                return Err(SolrError::mapping(
                    entity_type,
                    format!(
                        "keys of document `{}` overlap keys of `{}` ({})",
                        name, claimed, owner
                    ),
                ));
            }
        }

        self.names.insert(name.to_string(), entity_type);
        Ok(())
    }
}

/// Whether keys `<name>_...` could also be read as keys of `other`.
fn is_key_prefix(name: &str, other: &str) -> bool {
    other
        .strip_prefix(name)
        .is_some_and(|rest| rest.starts_with('_'))
}

impl MetadataFactory {
    /// Create an empty factory.
    pub fn new() -> Self {
        Self::default()
    }

    /// Load the metadata of an entity type.
    pub fn load<E: Indexable>(&self) -> SolrResult<Arc<Metadata<E>>> {
        let key = TypeId::of::<E>();

        let cached = self.registry.read().entries.get(&key).cloned();
        if let Some(entry) = cached {
            return downcast::<E>(entry);
        }

        let compiled = Metadata::compile(E::mapping())?;

        let mut registry = self.registry.write();
        if let Some(entry) = registry.entries.get(&key) {
            return downcast::<E>(entry.clone());
        }
        registry.claim(compiled.entity_type(), compiled.document_name())?;

        let published: Arc<dyn Any + Send + Sync> = Arc::new(compiled);
        registry.entries.insert(key, published.clone());
        drop(registry);

        downcast::<E>(published)
    }

    /// Load the metadata for the type of the given entity.
    pub fn load_for<E: Indexable>(&self, _entity: &E) -> SolrResult<Arc<Metadata<E>>> {
        self.load::<E>()
    }

    /// Whether the metadata of a type has been published.
    pub fn is_loaded<E: Indexable>(&self) -> bool {
        self.registry.read().entries.contains_key(&TypeId::of::<E>())
    }

    /// Number of cached entity types.
    pub fn len(&self) -> usize {
        self.registry.read().entries.len()
    }

    /// Whether the cache is empty.
    pub fn is_empty(&self) -> bool {
        self.registry.read().entries.is_empty()
    }
}

impl fmt::Debug for MetadataFactory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MetadataFactory")
            .field("cached", &self.len())
            .finish()
    }
}

fn downcast<E: Indexable>(entry: Arc<dyn Any + Send + Sync>) -> SolrResult<Arc<Metadata<E>>> {
    entry.downcast::<Metadata<E>>().map_err(|_| {
        SolrError::mapping(std::any::type_name::<E>(), "cached metadata has a different type")
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::FieldType;

    #[derive(Debug, Clone, Default)]
    struct Article {
        id: i64,
        title: String,
    }

    impl Indexable for Article {
        fn mapping() -> EntityMapping<Self> {
            EntityMapping::new()
                .document()
                .index("blog")
                .identifier("id", FieldType::Long)
                .field(FieldMapping::new("title").kind(FieldType::Text).boost(2.0))
                .getter("get_id", |a: &Article| a.id)
                .setter("set_id", |a: &mut Article, v| a.id = v.as_i64().unwrap_or_default())
                .getter("get_title", |a: &Article| a.title.clone())
        }
    }

    #[derive(Debug, Clone, Default)]
    struct Undeclared;

    impl Indexable for Undeclared {
        fn mapping() -> EntityMapping<Self> {
            EntityMapping::new().identifier("id", FieldType::String)
        }
    }

    #[derive(Debug, Clone, Default)]
    struct NoIdentifier;

    impl Indexable for NoIdentifier {
        fn mapping() -> EntityMapping<Self> {
            EntityMapping::new().document()
        }
    }

    #[derive(Debug, Clone, Default)]
    struct MissingGetter;

    impl Indexable for MissingGetter {
        fn mapping() -> EntityMapping<Self> {
            EntityMapping::new()
                .document()
                .identifier("id", FieldType::String)
                .field(FieldMapping::new("title"))
                .getter("get_id", |_: &MissingGetter| "1")
        }
    }

    #[test]
    fn test_document_name_of() {
        assert_eq!(document_name_of("app::model::BlogPost"), "blogpost");
        assert_eq!(document_name_of("Wrapper<app::Inner>"), "wrapper");
        assert_eq!(document_name_of("plain"), "plain");
    }

    #[test]
    fn test_load_compiles_metadata() {
        let factory = MetadataFactory::new();
        let meta = factory.load::<Article>().unwrap();

        assert_eq!(meta.document_name(), "article");
        assert_eq!(meta.index(), Some("blog"));
        assert_eq!(meta.identifier().name, "id");
        assert_eq!(meta.field("title").unwrap().boost, Some(2.0));
        assert!(meta.has_fields());
    }

    #[test]
    fn test_load_is_memoized() {
        let factory = MetadataFactory::new();
        let first = factory.load::<Article>().unwrap();
        let second = factory.load_for(&Article::default()).unwrap();

        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(factory.len(), 1);
        assert!(factory.is_loaded::<Article>());
    }

    #[test]
    fn test_document_key_round_trip() {
        let meta = MetadataFactory::new().load::<Article>().unwrap();
        let key = meta.document_key(&FieldValue::Int(42));

        assert_eq!(key, "article_42");
        assert_eq!(meta.identifier_from_key(&key).unwrap(), FieldValue::Int(42));
        assert!(meta.identifier_from_key("other_42").is_err());
    }

    #[test]
    fn test_undeclared_document_is_mapping_error() {
        let err = MetadataFactory::new().load::<Undeclared>().unwrap_err();
        assert!(matches!(err, SolrError::Mapping { .. }));
    }

    #[test]
    fn test_missing_identifier_is_mapping_error() {
        let err = MetadataFactory::new().load::<NoIdentifier>().unwrap_err();
        assert!(
            matches!(err, SolrError::Mapping { ref reason, .. } if reason.contains("identifier"))
        );
    }

    #[test]
    fn test_missing_getter_is_field_mapping_error() {
        let factory = MetadataFactory::new();
        let err = factory.load::<MissingGetter>().unwrap_err();

        assert!(matches!(err, SolrError::FieldMapping { ref field, .. } if field == "title"));
        assert!(factory.is_empty());
    }

    mod blog {
        use super::*;

        #[derive(Debug, Clone, Default)]
        pub struct Post {
            pub id: i64,
        }

        impl Indexable for Post {
            fn mapping() -> EntityMapping<Self> {
                EntityMapping::new()
                    .document()
                    .identifier("id", FieldType::Long)
                    .getter("get_id", |p: &Post| p.id)
            }
        }
    }

    mod forum {
        use super::*;

        #[derive(Debug, Clone, Default)]
        pub struct Post {
            pub id: i64,
        }

        impl Indexable for Post {
            fn mapping() -> EntityMapping<Self> {
                EntityMapping::new()
                    .document()
                    .identifier("id", FieldType::Long)
                    .getter("get_id", |p: &Post| p.id)
            }
        }

        #[derive(Debug, Clone, Default)]
        pub struct Thread {
            pub id: String,
        }

        impl Indexable for Thread {
            fn mapping() -> EntityMapping<Self> {
                EntityMapping::new()
                    .document()
                    .document_name("forum_post")
                    .identifier("id", FieldType::String)
                    .getter("get_id", |t: &Thread| t.id.clone())
            }
        }
    }

    #[test]
    fn test_same_document_name_rejected_for_second_type() {
        let factory = MetadataFactory::new();
        let first = factory.load::<blog::Post>().unwrap();

        let err = factory.load::<forum::Post>().unwrap_err();
        assert!(matches!(err, SolrError::Mapping { ref reason, .. } if reason.contains("post")));
        assert!(!factory.is_loaded::<forum::Post>());

        // the first claim stays valid
        let again = factory.load::<blog::Post>().unwrap();
        assert!(Arc::ptr_eq(&first, &again));
    }

    #[test]
    fn test_overlapping_document_names_rejected() {
        let factory = MetadataFactory::new();
        factory.load::<forum::Thread>().unwrap();

        // `forum` keys would be read back from `forum_post_...` keys
        #[derive(Debug, Clone, Default)]
        struct Forum {
            id: String,
        }

        impl Indexable for Forum {
            fn mapping() -> EntityMapping<Self> {
                EntityMapping::new()
                    .document()
                    .identifier("id", FieldType::String)
                    .getter("get_id", |f: &Forum| f.id.clone())
            }
        }

        assert!(factory.load::<Forum>().is_err());
        assert_eq!(factory.len(), 1);
    }

    #[test]
    fn test_document_keys_are_unique_across_loaded_types() {
        let factory = MetadataFactory::new();
        let article = factory.load::<Article>().unwrap();
        let post = factory.load::<blog::Post>().unwrap();
        let thread = factory.load::<forum::Thread>().unwrap();
        let id = FieldValue::Int(1);

        let keys = [
            article.document_key(&id),
            post.document_key(&id),
            thread.document_key(&id),
        ];
        assert_eq!(keys.iter().collect::<HashSet<_>>().len(), keys.len());

        // a key only reads back through the type that produced it
        assert!(post.identifier_from_key(&thread.document_key(&id)).is_err());
        assert!(thread.identifier_from_key(&post.document_key(&id)).is_err());
    }

    #[test]
    fn test_is_key_prefix() {
        assert!(is_key_prefix("post", "post_tag"));
        assert!(!is_key_prefix("post", "poster"));
        assert!(!is_key_prefix("post_tag", "post"));
    }

    #[test]
    fn test_reserved_and_duplicate_fields_rejected() {
        let reserved = EntityMapping::<Article>::new()
            .document()
            .identifier("id", FieldType::Long)
            .field(FieldMapping::new(DISCRIMINATOR_FIELD))
            .getter("get_id", |a: &Article| a.id);
        assert!(Metadata::compile(reserved).is_err());

        let duplicate = EntityMapping::<Article>::new()
            .document()
            .identifier("id", FieldType::Long)
            .field(FieldMapping::new("title"))
            .field(FieldMapping::new("title"))
            .getter("get_id", |a: &Article| a.id)
            .getter("get_title", |a: &Article| a.title.clone());
        assert!(Metadata::compile(duplicate).is_err());
    }
}
