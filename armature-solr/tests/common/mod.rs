//! Shared fixtures for integration tests.

#![allow(dead_code)]

use armature_solr::*;
use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use parking_lot::Mutex;
use serde_json::Value;
use std::sync::Arc;

/// Update calls seen by [`RecordingBackend`].
#[derive(Debug, Clone, PartialEq)]
pub enum Update {
    Add { core: String, documents: Vec<Document> },
    DeleteById { core: String, ids: Vec<String> },
    DeleteByQuery { core: String, query: String },
}

/// In-process backend that records every request and answers selects with
/// canned hits.
#[derive(Default)]
pub struct RecordingBackend {
    hits: Mutex<Vec<Value>>,
    ignore_rows: bool,
    selects: Mutex<Vec<SelectRequest>>,
    updates: Mutex<Vec<Update>>,
}

impl RecordingBackend {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn with_hits(hits: Vec<Value>) -> Arc<Self> {
        let backend = Self::default();
        *backend.hits.lock() = hits;
        Arc::new(backend)
    }

    /// Answer with every hit regardless of the requested row limit.
    pub fn overflowing(hits: Vec<Value>) -> Arc<Self> {
        let backend = Self {
            ignore_rows: true,
            ..Self::default()
        };
        *backend.hits.lock() = hits;
        Arc::new(backend)
    }

    pub fn selects(&self) -> Vec<SelectRequest> {
        self.selects.lock().clone()
    }

    pub fn last_select(&self) -> SelectRequest {
        self.selects.lock().last().cloned().expect("no select was dispatched")
    }

    pub fn updates(&self) -> Vec<Update> {
        self.updates.lock().clone()
    }
}

#[async_trait]
impl SearchBackend for RecordingBackend {
    async fn select(&self, request: &SelectRequest) -> SolrResult<SelectResponse> {
        self.selects.lock().push(request.clone());

        let hits = self.hits.lock().clone();
        let rows = if self.ignore_rows {
            usize::MAX
        } else {
            request.rows as usize
        };
        let num_found = hits.len() as u64;
        let docs = hits
            .into_iter()
            .take(rows)
            .map(Document::from_json)
            .collect::<SolrResult<Vec<_>>>()?;

        Ok(SelectResponse { num_found, docs })
    }

    async fn add(&self, core: &str, documents: Vec<Document>) -> SolrResult<()> {
        self.updates.lock().push(Update::Add {
            core: core.to_string(),
            documents,
        });
        Ok(())
    }

    async fn delete_by_id(&self, core: &str, ids: Vec<String>) -> SolrResult<()> {
        self.updates.lock().push(Update::DeleteById {
            core: core.to_string(),
            ids,
        });
        Ok(())
    }

    async fn delete_by_query(&self, core: &str, query: &str) -> SolrResult<()> {
        self.updates.lock().push(Update::DeleteByQuery {
            core: core.to_string(),
            query: query.to_string(),
        });
        Ok(())
    }
}

pub fn client(backend: Arc<RecordingBackend>) -> SolrClient {
    SolrClient::new(SolrConfig::new("http://localhost:8983/solr").with_core("test"), backend)
        .expect("valid test config")
}

/// Entity with every kind of field: text, date, a collection read through a
/// custom getter and a custom field type.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Article {
    pub id: i64,
    pub text: String,
    pub title: String,
    pub created_at: Option<DateTime<Utc>>,
    pub custom_field: String,
    pub tags: Vec<String>,
}

impl Indexable for Article {
    fn mapping() -> EntityMapping<Self> {
        EntityMapping::new()
            .document()
            .identifier("id", FieldType::Long)
            .field(FieldMapping::new("text").kind(FieldType::Text))
            .field(FieldMapping::new("title").boost(1.8))
            .field(FieldMapping::new("created_at").kind(FieldType::Date))
            .field(
                FieldMapping::new("collection")
                    .kind(FieldType::Strings)
                    .getter("get_tags"),
            )
            .field(FieldMapping::new("custom_field").kind(FieldType::Custom("my_type".into())))
            .getter("get_id", |a: &Article| a.id)
            .setter("set_id", |a: &mut Article, v| a.id = v.as_i64().unwrap_or_default())
            .getter("get_text", |a: &Article| a.text.clone())
            .setter("set_text", |a: &mut Article, v| {
                a.text = v.into_string().unwrap_or_default()
            })
            .getter("get_title", |a: &Article| a.title.clone())
            .setter("set_title", |a: &mut Article, v| {
                a.title = v.into_string().unwrap_or_default()
            })
            .getter("get_created_at", |a: &Article| a.created_at)
            .setter("set_created_at", |a: &mut Article, v| a.created_at = v.as_date())
            .getter("get_tags", |a: &Article| a.tags.clone())
            .setter("set_collection", |a: &mut Article, v| a.tags = v.into_strings())
            .getter("get_custom_field", |a: &Article| a.custom_field.clone())
            .setter("set_custom_field", |a: &mut Article, v| {
                a.custom_field = v.into_string().unwrap_or_default()
            })
    }
}

impl Article {
    pub fn sample(id: i64) -> Self {
        Self {
            id,
            text: "full text".into(),
            title: format!("title {}", id),
            created_at: Some(Utc.with_ymd_and_hms(2014, 3, 1, 12, 0, 0).unwrap()),
            custom_field: "custom".into(),
            tags: vec!["rust".into(), "solr".into()],
        }
    }
}

/// Declared as a document with an identifier but no searchable fields.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Marker {
    pub id: i64,
}

impl Indexable for Marker {
    fn mapping() -> EntityMapping<Self> {
        EntityMapping::new()
            .document()
            .identifier("id", FieldType::Long)
            .getter("get_id", |m: &Marker| m.id)
    }
}

/// Entity whose `rating` getter fails for negative values.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Review {
    pub id: i64,
    pub body: String,
    pub rating: i64,
}

impl Indexable for Review {
    fn mapping() -> EntityMapping<Self> {
        EntityMapping::new()
            .document()
            .index("reviews")
            .identifier("id", FieldType::Long)
            .field(FieldMapping::new("body").kind(FieldType::Text))
            .field(FieldMapping::new("rating").kind(FieldType::Integer))
            .getter("get_id", |r: &Review| r.id)
            .getter("get_body", |r: &Review| r.body.clone())
            .try_getter("get_rating", |r: &Review| {
                if r.rating < 0 {
                    Err(format!("invalid rating {}", r.rating))
                } else {
                    Ok(r.rating.into())
                }
            })
    }
}
