//! Solr integration for the Armature framework.
//!
//! This crate maps domain entities to Solr documents and back:
//! - Declarative mapping tables with accessors resolved up front
//! - A per-type metadata cache safe for concurrent first use
//! - Named mapping commands (all fields, identifier only)
//! - Typed queries with escaping, operator and row-limit handling
//! - Hydration into domain objects or raw documents
//! - Repositories with `find`, `find_all`, `find_by` and `find_one_by`
//! - Index synchronization driven by persistence lifecycle events
//!
//! Several entity types can share one core: every document carries the
//! key `<document_name>_<identifier>` and a `document_name_s` discriminator.
//!
//! # Example
//!
//! ```rust,no_run
//! use armature_solr::prelude::*;
//!
//! #[derive(Debug, Clone, Default)]
//! struct Article {
//!     id: i64,
//!     title: String,
//!     tags: Vec<String>,
//! }
//!
//! impl Indexable for Article {
//!     fn mapping() -> EntityMapping<Self> {
//!         EntityMapping::new()
//!             .document()
//!             .identifier("id", FieldType::Long)
//!             .field(FieldMapping::new("title").kind(FieldType::Text).boost(2.0))
//!             .field(FieldMapping::new("tags").kind(FieldType::Strings))
//!             .getter("get_id", |a: &Article| a.id)
//!             .setter("set_id", |a: &mut Article, v| a.id = v.as_i64().unwrap_or_default())
//!             .getter("get_title", |a: &Article| a.title.clone())
//!             .setter("set_title", |a: &mut Article, v| {
//!                 a.title = v.into_string().unwrap_or_default()
//!             })
//!             .getter("get_tags", |a: &Article| a.tags.clone())
//!             .setter("set_tags", |a: &mut Article, v| a.tags = v.into_strings())
//!     }
//! }
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // Create client
//!     let config = SolrConfig::new("http://localhost:8983/solr").with_core("articles");
//!     let client = SolrClient::http(config)?;
//!
//!     // Index a document
//!     let article = Article {
//!         id: 1,
//!         title: "Hello Solr".to_string(),
//!         tags: vec!["tutorial".to_string(), "search".to_string()],
//!     };
//!     client.add_document(&article).await?;
//!
//!     // Search
//!     let articles = client.repository::<Article>();
//!     let found = articles.find(1).await?;
//!     let tutorials = articles.find_by([("tags", "tutorial")]).await?;
//!
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

mod backend;
mod client;
mod command;
mod config;
mod document;
mod error;
mod listener;
mod mapper;
mod mapping;
mod metadata;
mod query;
mod repository;
mod search;
mod value;

#[cfg(feature = "http")]
pub use backend::HttpBackend;
pub use backend::SearchBackend;
pub use client::SolrClient;
pub use command::{
    CommandRegistry, DocumentSource, EntitySource, IdentifierSource, MAP_ALL, MAP_IDENTIFIER,
    MapAllFieldsCommand, MapIdentifierCommand, MappingCommand,
};
pub use config::SolrConfig;
pub use document::{Document, DocumentField};
pub use error::{SolrError, SolrResult};
pub use listener::{IndexListener, LifecycleEvent, LifecycleListener};
pub use mapper::{DocumentMapper, Hydrated, HydrationMode, IdentityMap};
pub use mapping::{
    EntityMapping, FieldMapping, Getter, IdentifierMapping, Indexable, Setter, getter_name,
    setter_name,
};
pub use metadata::{DISCRIMINATOR_FIELD, ID_FIELD, Metadata, MetadataFactory, document_name_of};
pub use query::{
    CRITERIA_ROWS, DEFAULT_ROWS, Operator, Query, QueryBuilder, QueryKind, SearchTerm,
    UNBOUNDED_ROWS, escape_phrase, escape_term,
};
pub use repository::Repository;
pub use search::{ResultSet, SelectRequest, SelectResponse};
pub use value::{FieldType, FieldValue, SOLR_DATE_FORMAT};

/// Prelude for common imports.
pub mod prelude {
    pub use crate::{
        EntityMapping, FieldMapping, FieldType, FieldValue, Hydrated, HydrationMode, Indexable,
        Query, QueryBuilder, Repository, SolrClient, SolrConfig, SolrError, SolrResult,
    };
}
