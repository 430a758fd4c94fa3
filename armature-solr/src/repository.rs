//! Per-entity repositories.

use crate::{
    client::SolrClient,
    command::MAP_ALL,
    document::Document,
    error::SolrResult,
    mapper::{HydrationMode, Hydrated, IdentityMap},
    mapping::Indexable,
    metadata::ID_FIELD,
    query::{Operator, Query, QueryBuilder, escape_term},
    search::ResultSet,
    value::FieldValue,
};
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;
use tracing::{debug, warn};

/// Finder methods for one entity type.
///
/// ```rust,no_run
/// # use armature_solr::prelude::*;
/// # #[derive(Debug, Clone, Default)]
/// # struct Post { id: i64, title: String }
/// # impl Indexable for Post {
/// #     fn mapping() -> EntityMapping<Self> {
/// #         EntityMapping::new()
/// #             .document()
/// #             .identifier("id", FieldType::Long)
/// #             .field(FieldMapping::new("title"))
/// #             .getter("get_id", |p: &Post| p.id)
/// #             .getter("get_title", |p: &Post| p.title.clone())
/// #     }
/// # }
/// # async fn run(client: SolrClient) -> SolrResult<()> {
/// let posts = client.repository::<Post>();
///
/// let post = posts.find(42).await?;
/// let drafts = posts.find_by([("title", "draft")]).await?;
/// # Ok(())
/// # }
/// ```
pub struct Repository<E> {
    client: SolrClient,
    hydration: HydrationMode,
    identity: Option<Arc<IdentityMap>>,
    _entity: PhantomData<fn() -> E>,
}

impl<E: Indexable> Repository<E> {
    pub(crate) fn new(client: SolrClient) -> Self {
        Self {
            client,
            hydration: HydrationMode::default(),
            identity: None,
            _entity: PhantomData,
        }
    }

    /// Hydrate results in the given mode.
    pub fn with_hydration_mode(mut self, mode: HydrationMode) -> Self {
        self.hydration = mode;
        self
    }

    /// Reuse and record instances in an identity map during hydration.
    pub fn with_identity_map(mut self, identity: Arc<IdentityMap>) -> Self {
        self.identity = Some(identity);
        self
    }

    /// Get the client.
    pub fn client(&self) -> &SolrClient {
        &self.client
    }

    /// Hydration mode of this repository.
    pub fn hydration_mode(&self) -> HydrationMode {
        self.hydration
    }

    /// Find the entity with the given identifier.
    pub async fn find(&self, identifier: impl Into<FieldValue>) -> SolrResult<Option<Hydrated<E>>> {
        let meta = self.client.metadata::<E>()?;
        let document = self.client.mapper().identifier_document(&meta, identifier)?;

        let query = QueryBuilder::find_by_identifier(&meta, &document)?
            .hydration_mode(self.hydration)
            .build()?;

        Ok(self.last_hit(self.execute(&query).await?))
    }

    /// Find every entity of this type.
    ///
    /// Returns `Ok(None)` without querying when the type maps no fields.
    pub async fn find_all(&self) -> SolrResult<Option<ResultSet<E>>> {
        let meta = self.client.metadata::<E>()?;
        let template = E::default();

        if self.client.mapper().to_document(MAP_ALL, &meta, &template)?.is_none() {
            debug!("{} maps no fields, skipping find_all", meta.entity_type());
            return Ok(None);
        }

        // A default instance carries zeroes and empty values, not blanks, so
        // none of its fields narrow the scan.
        let query = QueryBuilder::find_by_document_name(&meta, Document::new())
            .rows(self.client.config().find_all_rows)
            .hydration_mode(self.hydration)
            .build()?;

        self.execute(&query).await.map(Some)
    }

    /// Find every entity matching all of the given field values.
    ///
    /// Values are escaped and matched literally.
    pub async fn find_by<I, K, V>(&self, criteria: I) -> SolrResult<ResultSet<E>>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<FieldValue>,
    {
        let query = self
            .criteria_query(criteria)?
            .rows(self.client.config().find_by_rows)
            .build()?;

        self.execute(&query).await
    }

    /// Find one entity matching all of the given field values.
    pub async fn find_one_by<I, K, V>(&self, criteria: I) -> SolrResult<Option<Hydrated<E>>>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<FieldValue>,
    {
        let query = self.criteria_query(criteria)?.rows(1).build()?;
        Ok(self.last_hit(self.execute(&query).await?))
    }

    /// Start a blank query bound to this entity type.
    pub fn create_query(&self) -> SolrResult<QueryBuilder<E>> {
        Ok(self.client.create_query::<E>()?.hydration_mode(self.hydration))
    }

    /// Execute a query with this repository's identity map.
    pub async fn execute(&self, query: &Query<E>) -> SolrResult<ResultSet<E>> {
        self.client.query_with(query, self.identity.as_deref()).await
    }

    fn criteria_query<I, K, V>(&self, criteria: I) -> SolrResult<QueryBuilder<E>>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<FieldValue>,
    {
        let meta = self.client.metadata::<E>()?;
        let scope = format!("{}_*", escape_term(meta.document_name()));

        let builder = QueryBuilder::new(&meta)
            .add_raw_term(ID_FIELD, scope)
            .default_field(ID_FIELD)
            .operator(Operator::And)
            .hydration_mode(self.hydration);

        Ok(criteria
            .into_iter()
            .fold(builder, |builder, (field, value)| builder.add_search_term(field, value)))
    }

    /// Singular lookups keep the last hit.
    fn last_hit(&self, mut results: ResultSet<E>) -> Option<Hydrated<E>> {
        if results.len() > 1 {
            warn!(
                "Expected at most one {} but got {}, keeping the last",
                std::any::type_name::<E>(),
                results.len()
            );
        }
        results.pop()
    }
}

impl<E> Clone for Repository<E> {
    fn clone(&self) -> Self {
        Self {
            client: self.client.clone(),
            hydration: self.hydration,
            identity: self.identity.clone(),
            _entity: PhantomData,
        }
    }
}

impl<E> fmt::Debug for Repository<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Repository")
            .field("entity", &std::any::type_name::<E>())
            .field("hydration", &self.hydration)
            .field("identity_map", &self.identity.is_some())
            .finish()
    }
}
