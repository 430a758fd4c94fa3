//! Solr client facade.

use crate::{
    backend::SearchBackend,
    command::{CommandRegistry, MAP_ALL},
    config::SolrConfig,
    error::{SolrError, SolrResult},
    mapper::{DocumentMapper, IdentityMap},
    mapping::Indexable,
    metadata::{ID_FIELD, Metadata, MetadataFactory},
    query::{Query, QueryBuilder, escape_term},
    repository::Repository,
    search::ResultSet,
    value::FieldValue,
};
use std::sync::Arc;
use tracing::{debug, info};

/// Solr client: executes queries, hydrates results and keeps the index in
/// sync with entities.
///
/// Cloning is cheap; clones share the backend, the metadata cache and the
/// command registry.
#[derive(Clone)]
pub struct SolrClient {
    backend: Arc<dyn SearchBackend>,
    config: Arc<SolrConfig>,
    mapper: DocumentMapper,
    meta_factory: Arc<MetadataFactory>,
}

impl SolrClient {
    /// Create a client over an existing backend with the default commands.
    pub fn new(config: SolrConfig, backend: Arc<dyn SearchBackend>) -> SolrResult<Self> {
        Self::with_components(
            config,
            backend,
            Arc::new(MetadataFactory::new()),
            Arc::new(CommandRegistry::with_defaults()),
        )
    }

    /// Create a client from explicitly assembled components.
    pub fn with_components(
        config: SolrConfig,
        backend: Arc<dyn SearchBackend>,
        meta_factory: Arc<MetadataFactory>,
        commands: Arc<CommandRegistry>,
    ) -> SolrResult<Self> {
        config.validate()?;
        info!(
            "Initializing Solr client for: {} (core {})",
            config.base_url(),
            config.core
        );

        Ok(Self {
            backend,
            config: Arc::new(config),
            mapper: DocumentMapper::new(commands),
            meta_factory,
        })
    }

    /// Create a client talking to Solr over HTTP.
    #[cfg(feature = "http")]
    pub fn http(config: SolrConfig) -> SolrResult<Self> {
        let backend = crate::backend::HttpBackend::new(config.clone())?;
        Self::new(config, Arc::new(backend))
    }

    /// Get the configuration.
    pub fn config(&self) -> &SolrConfig {
        &self.config
    }

    /// Get the search backend.
    pub fn backend(&self) -> &Arc<dyn SearchBackend> {
        &self.backend
    }

    /// Get the document mapper.
    pub fn mapper(&self) -> &DocumentMapper {
        &self.mapper
    }

    /// Get the mapping command registry.
    pub fn command_factory(&self) -> &CommandRegistry {
        self.mapper.commands()
    }

    /// Get the metadata factory.
    pub fn meta_factory(&self) -> &MetadataFactory {
        &self.meta_factory
    }

    /// Load the metadata of an entity type.
    pub fn metadata<E: Indexable>(&self) -> SolrResult<Arc<Metadata<E>>> {
        self.meta_factory.load::<E>()
    }

    /// Start a blank query bound to an entity type.
    pub fn create_query<E: Indexable>(&self) -> SolrResult<QueryBuilder<E>> {
        Ok(QueryBuilder::new(&*self.metadata::<E>()?))
    }

    /// Get a repository for an entity type.
    pub fn repository<E: Indexable>(&self) -> Repository<E> {
        Repository::new(self.clone())
    }

    // =========================================================================
    // Search
    // =========================================================================

    /// Execute a query and hydrate every hit in rank order.
    pub async fn query<E: Indexable>(&self, query: &Query<E>) -> SolrResult<ResultSet<E>> {
        self.query_with(query, None).await
    }

    /// Execute a query, reusing instances from an identity map during
    /// hydration.
    pub async fn query_with<E: Indexable>(
        &self,
        query: &Query<E>,
        identity: Option<&IdentityMap>,
    ) -> SolrResult<ResultSet<E>> {
        query.validate()?;
        let meta = self.metadata::<E>()?;
        let request = query.to_request(&self.config.core);

        debug!(
            "Querying core {} for {}: q={} fq={:?} rows={}",
            request.core,
            meta.document_name(),
            request.q,
            request.fq,
            request.rows
        );

        let response = self.backend.select(&request).await?;
        let mode = query.hydration_mode();

        let hits = response
            .docs
            .into_iter()
            .map(|doc| self.mapper.to_entity(doc, &meta, mode, identity))
            .collect::<SolrResult<Vec<_>>>()?;

        debug!("Hydrated {} of {} hit(s)", hits.len(), response.num_found);
        Ok(ResultSet::new(response.num_found, hits))
    }

    // =========================================================================
    // Index Synchronization
    // =========================================================================

    /// Index an entity. Returns `false` when its type maps no fields.
    pub async fn add_document<E: Indexable>(&self, entity: &E) -> SolrResult<bool> {
        let meta = self.metadata::<E>()?;
        let Some(document) = self.mapper.to_document(MAP_ALL, &meta, entity)? else {
            debug!("Nothing to index for {}", meta.entity_type());
            return Ok(false);
        };

        let core = self.core_of(&meta);
        debug!("Indexing {:?} in core {}", document.id(), core);
        self.backend.add(&core, vec![document]).await?;
        Ok(true)
    }

    /// Re-index an entity that already has an identifier.
    pub async fn update_document<E: Indexable>(&self, entity: &E) -> SolrResult<bool> {
        let meta = self.metadata::<E>()?;
        require_identifier(&meta, entity)?;
        self.add_document(entity).await
    }

    /// Remove an entity from the index.
    pub async fn remove_document<E: Indexable>(&self, entity: &E) -> SolrResult<()> {
        let meta = self.metadata::<E>()?;
        let identifier = require_identifier(&meta, entity)?;
        let document = self.mapper.identifier_document(&meta, identifier)?;
        let key = document
            .id()
            .map(str::to_string)
            .ok_or_else(|| SolrError::field(meta.entity_type(), ID_FIELD, "no document key"))?;

        let core = self.core_of(&meta);
        debug!("Removing {} from core {}", key, core);
        self.backend.delete_by_id(&core, vec![key]).await
    }

    /// Remove every document of an entity type.
    pub async fn clear_index<E: Indexable>(&self) -> SolrResult<()> {
        let meta = self.metadata::<E>()?;
        let query = format!("{}:{}_*", ID_FIELD, escape_term(meta.document_name()));
        let core = self.core_of(&meta);
        debug!("Clearing {} from core {}", meta.document_name(), core);
        self.backend.delete_by_query(&core, &query).await
    }

    fn core_of<E: Indexable>(&self, meta: &Metadata<E>) -> String {
        meta.index().unwrap_or(&self.config.core).to_string()
    }
}

fn require_identifier<E: Indexable>(meta: &Metadata<E>, entity: &E) -> SolrResult<FieldValue> {
    let identifier = meta.identifier_value(entity)?;
    if identifier.is_null() {
        return Err(SolrError::field(
            meta.entity_type(),
            &meta.identifier().name,
            "identifier is not set",
        ));
    }
    Ok(identifier)
}

impl std::fmt::Debug for SolrClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SolrClient")
            .field("config", &self.config)
            .field("commands", &self.mapper.commands().names())
            .field("loaded_types", &self.meta_factory.len())
            .finish()
    }
}
