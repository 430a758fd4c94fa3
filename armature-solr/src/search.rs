//! Wire-level select requests and hydrated result sets.

use crate::document::Document;
use crate::error::{SolrError, SolrResult};
use crate::mapper::Hydrated;
use crate::query::Operator;
use serde::Deserialize;
use serde_json::Value;

/// A compiled `/select` request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectRequest {
    /// Core to search.
    pub core: String,
    /// Main query (`q`).
    pub q: String,
    /// Filter queries (`fq`).
    pub fq: Vec<String>,
    /// Row limit.
    pub rows: u32,
    /// Result offset.
    pub start: u32,
    /// Default operator (`q.op`).
    pub operator: Operator,
    /// Default field (`df`).
    pub default_field: Option<String>,
}

impl SelectRequest {
    /// Query-string parameters in the order Solr receives them.
    pub fn params(&self) -> Vec<(&'static str, String)> {
        let mut params = vec![("q", self.q.clone())];
        params.extend(self.fq.iter().map(|fq| ("fq", fq.clone())));
        params.push(("rows", self.rows.to_string()));
        params.push(("start", self.start.to_string()));
        params.push(("q.op", self.operator.as_str().to_string()));
        if let Some(df) = &self.default_field {
            params.push(("df", df.clone()));
        }
        params.push(("wt", "json".to_string()));
        params
    }
}

/// Raw result of a `/select` request.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SelectResponse {
    /// Total number of matching documents.
    pub num_found: u64,
    /// Returned documents in rank order.
    pub docs: Vec<Document>,
}

#[derive(Deserialize)]
struct SelectBody {
    response: SelectSection,
}

#[derive(Deserialize)]
struct SelectSection {
    #[serde(rename = "numFound", default)]
    num_found: u64,
    #[serde(default)]
    docs: Vec<Value>,
}

impl SelectResponse {
    /// Parse the body of a `wt=json` select response.
    pub fn from_json(body: Value) -> SolrResult<Self> {
        let body: SelectBody = serde_json::from_value(body)
            .map_err(|e| SolrError::InvalidResponse(format!("malformed select body: {}", e)))?;

        let docs = body
            .response
            .docs
            .into_iter()
            .map(Document::from_json)
            .collect::<SolrResult<Vec<_>>>()?;

        Ok(Self {
            num_found: body.response.num_found,
            docs,
        })
    }
}

/// Hydrated results of a query, in rank order.
#[derive(Debug, Clone, PartialEq)]
pub struct ResultSet<E> {
    num_found: u64,
    hits: Vec<Hydrated<E>>,
}

impl<E> ResultSet<E> {
    pub(crate) fn new(num_found: u64, hits: Vec<Hydrated<E>>) -> Self {
        Self { num_found, hits }
    }

    /// Total number of matches reported by Solr, which may exceed `len()`.
    pub fn num_found(&self) -> u64 {
        self.num_found
    }

    /// Number of returned hits.
    pub fn len(&self) -> usize {
        self.hits.len()
    }

    /// Whether no hit was returned.
    pub fn is_empty(&self) -> bool {
        self.hits.is_empty()
    }

    /// Iterate over the hits.
    pub fn iter(&self) -> std::slice::Iter<'_, Hydrated<E>> {
        self.hits.iter()
    }

    /// First hit.
    pub fn first(&self) -> Option<&Hydrated<E>> {
        self.hits.first()
    }

    /// Take the last hit.
    pub fn pop(&mut self) -> Option<Hydrated<E>> {
        self.hits.pop()
    }

    /// Domain objects, skipping raw hits.
    pub fn into_entities(self) -> Vec<E> {
        self.hits.into_iter().filter_map(Hydrated::into_entity).collect()
    }

    /// Raw documents, skipping domain objects.
    pub fn into_documents(self) -> Vec<Document> {
        self.hits.into_iter().filter_map(Hydrated::into_raw).collect()
    }
}

impl<E> IntoIterator for ResultSet<E> {
    type Item = Hydrated<E>;
    type IntoIter = std::vec::IntoIter<Hydrated<E>>;

    fn into_iter(self) -> Self::IntoIter {
        self.hits.into_iter()
    }
}

impl<'a, E> IntoIterator for &'a ResultSet<E> {
    type Item = &'a Hydrated<E>;
    type IntoIter = std::slice::Iter<'a, Hydrated<E>>;

    fn into_iter(self) -> Self::IntoIter {
        self.hits.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_params_order() {
        let request = SelectRequest {
            core: "blog".to_string(),
            q: "title:rust".to_string(),
            fq: vec!["document_name_s:post".to_string()],
            rows: 5,
            start: 10,
            operator: Operator::And,
            default_field: Some("id".to_string()),
        };

        assert_eq!(
            request.params(),
            vec![
                ("q", "title:rust".to_string()),
                ("fq", "document_name_s:post".to_string()),
                ("rows", "5".to_string()),
                ("start", "10".to_string()),
                ("q.op", "AND".to_string()),
                ("df", "id".to_string()),
                ("wt", "json".to_string()),
            ]
        );
    }

    #[test]
    fn test_parse_select_response() {
        let body = json!({
            "responseHeader": { "status": 0 },
            "response": {
                "numFound": 12,
                "start": 0,
                "docs": [
                    { "id": "post_1", "title": "one" },
                    { "id": "post_2", "title": "two" }
                ]
            }
        });

        let response = SelectResponse::from_json(body).unwrap();
        assert_eq!(response.num_found, 12);
        assert_eq!(response.docs.len(), 2);
        assert_eq!(response.docs[1].id(), Some("post_2"));
    }

    #[test]
    fn test_parse_rejects_missing_response() {
        let err = SelectResponse::from_json(json!({ "responseHeader": {} })).unwrap_err();
        assert!(matches!(err, SolrError::InvalidResponse(_)));
    }

    #[test]
    fn test_parse_rejects_non_object_docs() {
        let body = json!({ "response": { "numFound": 1, "docs": ["post_1"] } });
        let err = SelectResponse::from_json(body).unwrap_err();
        assert!(matches!(err, SolrError::InvalidResponse(ref msg) if msg.contains("post_1")));
    }

    #[test]
    fn test_result_set_accessors() {
        let mut set: ResultSet<u8> = ResultSet::new(
            3,
            vec![Hydrated::Entity(1), Hydrated::Raw(Document::new()), Hydrated::Entity(2)],
        );

        assert_eq!(set.num_found(), 3);
        assert_eq!(set.len(), 3);
        assert_eq!(set.pop(), Some(Hydrated::Entity(2)));
        assert_eq!(set.clone().into_entities(), vec![1]);
        assert_eq!(set.into_documents().len(), 1);
    }
}
