//! Query objects.
//!
//! A [`QueryBuilder`] is filled in once and consumed by
//! [`QueryBuilder::build`], which validates it and yields an immutable
//! [`Query`]. The client consumes the query when executing it.

mod helper;

pub use helper::{escape_phrase, escape_term};

use crate::document::Document;
use crate::error::{SolrError, SolrResult};
use crate::mapper::HydrationMode;
use crate::mapping::Indexable;
use crate::metadata::{DISCRIMINATOR_FIELD, ID_FIELD, Metadata};
use crate::search::SelectRequest;
use crate::value::FieldValue;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::marker::PhantomData;

/// Solr's default page size.
pub const DEFAULT_ROWS: u32 = 10;

/// Row limit used when every document of a type is wanted.
pub const UNBOUNDED_ROWS: u32 = 1_000_000;

/// Row limit used by criteria lookups.
pub const CRITERIA_ROWS: u32 = 100_000;

/// How search terms are combined.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Operator {
    /// Every term must match.
    And,
    /// Any term may match.
    #[default]
    Or,
}

impl Operator {
    /// Query parser spelling.
    pub fn as_str(&self) -> &'static str {
        match self {
            Operator::And => "AND",
            Operator::Or => "OR",
        }
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which kind of request a query represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryKind {
    /// Exact match on the unique key.
    FindByIdentifier,
    /// Every document of one type, optionally narrowed by a template.
    FindByDocumentName,
    /// Free-form terms.
    Filtered,
}

/// A `field:term` clause. The term is already in query syntax.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchTerm {
    /// Field name.
    pub field: String,
    /// Escaped or raw term.
    pub term: String,
}

impl SearchTerm {
    fn new(field: impl Into<String>, term: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            term: term.into(),
        }
    }

    /// Render as `field:term`.
    pub fn to_clause(&self) -> String {
        format!("{}:{}", self.field, self.term)
    }
}

/// Builder for [`Query`].
#[derive(Debug)]
pub struct QueryBuilder<E> {
    kind: QueryKind,
    index: Option<String>,
    rows: u32,
    start: u32,
    operator: Operator,
    terms: Vec<SearchTerm>,
    filters: Vec<SearchTerm>,
    default_field: Option<String>,
    hydration: HydrationMode,
    _entity: PhantomData<fn() -> E>,
}

impl<E: Indexable> QueryBuilder<E> {
    /// Start a free-form query bound to an entity type.
    pub fn new(meta: &Metadata<E>) -> Self {
        Self {
            kind: QueryKind::Filtered,
            index: meta.index().map(str::to_string),
            rows: DEFAULT_ROWS,
            start: 0,
            operator: Operator::default(),
            terms: Vec::new(),
            filters: Vec::new(),
            default_field: None,
            hydration: HydrationMode::default(),
            _entity: PhantomData,
        }
    }

    /// Look up the document carrying the key of `document`.
    pub fn find_by_identifier(meta: &Metadata<E>, document: &Document) -> SolrResult<Self> {
        let key = document.id().ok_or_else(|| {
            SolrError::QueryConstraint(format!(
                "document for {} has no {} field",
                meta.entity_type(),
                ID_FIELD
            ))
        })?;

        let mut builder = Self::new(meta);
        builder.kind = QueryKind::FindByIdentifier;
        builder.rows = 1;
        builder.filters.push(SearchTerm::new(ID_FIELD, escape_term(key)));
        Ok(builder)
    }

    /// Find every document of the entity type, narrowed by the non-empty
    /// fields of `template`.
    pub fn find_by_document_name(meta: &Metadata<E>, mut template: Document) -> Self {
        template.remove_field(ID_FIELD);
        template.remove_field(DISCRIMINATOR_FIELD);

        let mut builder = Self::new(meta);
        builder.kind = QueryKind::FindByDocumentName;
        builder.rows = UNBOUNDED_ROWS;
        builder.operator = Operator::And;
        builder.filters.push(SearchTerm::new(
            DISCRIMINATOR_FIELD,
            escape_term(meta.document_name()),
        ));

        for field in template.fields() {
            let values = match &field.value {
                Value::Array(items) => items.iter().collect::<Vec<_>>(),
                other => vec![other],
            };
            for value in values {
                if let Some(term) = json_term(value) {
                    builder.terms.push(SearchTerm::new(&field.name, escape_term(&term)));
                }
            }
        }

        builder
    }

    /// Search in a different core.
    pub fn index(mut self, index: impl Into<String>) -> Self {
        self.index = Some(index.into());
        self
    }

    /// Set the row limit. Identifier lookups always use one row.
    pub fn rows(mut self, rows: u32) -> Self {
        self.rows = rows;
        self
    }

    /// Set the result offset.
    pub fn start(mut self, start: u32) -> Self {
        self.start = start;
        self
    }

    /// Combine terms with AND (`true`) or OR (`false`).
    pub fn use_and_operator(self, and: bool) -> Self {
        self.operator(if and { Operator::And } else { Operator::Or })
    }

    /// Set the term operator.
    pub fn operator(mut self, operator: Operator) -> Self {
        self.operator = operator;
        self
    }

    /// Add a term matched literally; the value is escaped.
    ///
    /// A list adds one term per item, like a template's multi-valued field.
    /// An empty value matches the empty string.
    pub fn add_search_term(
        mut self,
        field: impl Into<String>,
        value: impl Into<FieldValue>,
    ) -> Self {
        let field = field.into();
        for term in literal_terms(value.into()) {
            self.terms.push(SearchTerm::new(&field, term));
        }
        self
    }

    /// Add a term in query syntax, e.g. a wildcard. The term is not escaped.
    pub fn add_raw_term(mut self, field: impl Into<String>, term: impl Into<String>) -> Self {
        self.terms.push(SearchTerm::new(field, term));
        self
    }

    /// Add a non-scoring filter matched literally.
    pub fn add_filter(mut self, field: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        let field = field.into();
        for term in literal_terms(value.into()) {
            self.filters.push(SearchTerm::new(&field, term));
        }
        self
    }

    /// Field searched by terms that name none.
    pub fn default_field(mut self, field: impl Into<String>) -> Self {
        self.default_field = Some(field.into());
        self
    }

    /// Set the hydration mode of the results.
    pub fn hydration_mode(mut self, mode: HydrationMode) -> Self {
        self.hydration = mode;
        self
    }

    /// Validate and freeze the query.
    pub fn build(self) -> SolrResult<Query<E>> {
        let rows = match self.kind {
            QueryKind::FindByIdentifier => 1,
            _ => self.rows,
        };

        let query = Query {
            kind: self.kind,
            index: self.index,
            rows,
            start: self.start,
            operator: self.operator,
            terms: self.terms,
            filters: self.filters,
            default_field: self.default_field,
            hydration: self.hydration,
            _entity: PhantomData,
        };
        query.validate()?;
        Ok(query)
    }
}

/// A validated, immutable search request for entity type `E`.
#[derive(Debug)]
pub struct Query<E> {
    kind: QueryKind,
    index: Option<String>,
    rows: u32,
    start: u32,
    operator: Operator,
    terms: Vec<SearchTerm>,
    filters: Vec<SearchTerm>,
    default_field: Option<String>,
    hydration: HydrationMode,
    _entity: PhantomData<fn() -> E>,
}

impl<E> Query<E> {
    /// Query kind.
    pub fn kind(&self) -> QueryKind {
        self.kind
    }

    /// Target core, if not the client's default.
    pub fn index(&self) -> Option<&str> {
        self.index.as_deref()
    }

    /// Row limit.
    pub fn rows(&self) -> u32 {
        self.rows
    }

    /// Result offset.
    pub fn start(&self) -> u32 {
        self.start
    }

    /// Term operator.
    pub fn operator(&self) -> Operator {
        self.operator
    }

    /// Scoring terms in insertion order.
    pub fn terms(&self) -> &[SearchTerm] {
        &self.terms
    }

    /// Filter terms.
    pub fn filters(&self) -> &[SearchTerm] {
        &self.filters
    }

    /// Default search field.
    pub fn default_field(&self) -> Option<&str> {
        self.default_field.as_deref()
    }

    /// Hydration mode.
    pub fn hydration_mode(&self) -> HydrationMode {
        self.hydration
    }

    /// The `q` parameter: terms joined by the operator, or `*:*`.
    pub fn query_string(&self) -> String {
        if self.terms.is_empty() {
            return "*:*".to_string();
        }

        let separator = format!(" {} ", self.operator);
        self.terms
            .iter()
            .map(SearchTerm::to_clause)
            .collect::<Vec<_>>()
            .join(separator.as_str())
    }

    /// Reject queries the backend must never see.
    pub fn validate(&self) -> SolrResult<()> {
        if self.rows == 0 {
            return Err(SolrError::QueryConstraint(
                "row limit must be greater than zero".to_string(),
            ));
        }
        if self.operator == Operator::And && self.terms.is_empty() && self.filters.is_empty() {
            return Err(SolrError::QueryConstraint(
                "AND query without any constraint".to_string(),
            ));
        }
        Ok(())
    }

    /// Compile into the wire request, targeting `default_core` when the
    /// query names no index.
    pub fn to_request(&self, default_core: &str) -> SelectRequest {
        SelectRequest {
            core: self.index.clone().unwrap_or_else(|| default_core.to_string()),
            q: self.query_string(),
            fq: self.filters.iter().map(SearchTerm::to_clause).collect(),
            rows: self.rows,
            start: self.start,
            operator: self.operator,
            default_field: self.default_field.clone(),
        }
    }
}

/// Escaped terms of a literal value, one per list item. Empty text becomes
/// `""` so the clause stays parseable.
fn literal_terms(value: FieldValue) -> Vec<String> {
    match value {
        FieldValue::List(items) => items.into_iter().flat_map(literal_terms).collect(),
        other => match other.to_term() {
            term if term.is_empty() => vec![escape_phrase("")],
            term => vec![escape_term(&term)],
        },
    }
}

fn json_term(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) if s.is_empty() => None,
        Value::String(s) => Some(s.clone()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Number(n) => Some(n.to_string()),
        other => Some(other.to_string()),
    }
}
