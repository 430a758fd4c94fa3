//! Index documents.

use crate::error::{SolrError, SolrResult};
use crate::metadata::{DISCRIMINATOR_FIELD, ID_FIELD};
use serde_json::{Map, Value, json};

/// One field of a document.
#[derive(Debug, Clone, PartialEq)]
pub struct DocumentField {
    /// Field name.
    pub name: String,
    /// Normalized value.
    pub value: Value,
    /// Index-time boost.
    pub boost: Option<f32>,
}

/// Flat, ordered field mapping of an entity as stored in the index.
///
/// Documents are built by a mapping command or parsed from a search hit.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Document {
    fields: Vec<DocumentField>,
    boost: Option<f32>,
}

impl Document {
    /// Create an empty document.
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a document from a JSON object, e.g. a Solr search hit.
    pub fn from_json(value: Value) -> SolrResult<Self> {
        match value {
            Value::Object(map) => Ok(map.into_iter().collect()),
            other => Err(SolrError::InvalidResponse(format!(
                "expected a document object, got {}",
                other
            ))),
        }
    }

    /// Set the document boost.
    pub fn with_boost(mut self, boost: Option<f32>) -> Self {
        self.boost = boost;
        self
    }

    /// Document boost.
    pub fn boost(&self) -> Option<f32> {
        self.boost
    }

    /// Add a field, replacing the value of an existing field with the same
    /// name in place.
    pub fn add_field(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        self.add_boosted_field(name, value, None);
    }

    /// Add a field with an index-time boost.
    pub fn add_boosted_field(
        &mut self,
        name: impl Into<String>,
        value: impl Into<Value>,
        boost: Option<f32>,
    ) {
        let name = name.into();
        let value = value.into();

        match self.fields.iter_mut().find(|f| f.name == name) {
            Some(existing) => {
                existing.value = value;
                existing.boost = boost;
            }
            None => self.fields.push(DocumentField { name, value, boost }),
        }
    }

    /// Remove a field, returning its value.
    pub fn remove_field(&mut self, name: &str) -> Option<Value> {
        let position = self.fields.iter().position(|f| f.name == name)?;
        Some(self.fields.remove(position).value)
    }

    /// Get a field value.
    pub fn field(&self, name: &str) -> Option<&Value> {
        self.fields.iter().find(|f| f.name == name).map(|f| &f.value)
    }

    /// Whether the document has a field.
    pub fn contains(&self, name: &str) -> bool {
        self.fields.iter().any(|f| f.name == name)
    }

    /// The unique key, if present.
    pub fn id(&self) -> Option<&str> {
        self.field(ID_FIELD).and_then(Value::as_str)
    }

    /// The document name stored in the discriminator field, if present.
    pub fn document_name(&self) -> Option<&str> {
        self.field(DISCRIMINATOR_FIELD).and_then(Value::as_str)
    }

    /// Fields in insertion order.
    pub fn fields(&self) -> impl Iterator<Item = &DocumentField> {
        self.fields.iter()
    }

    /// Number of fields.
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Whether the document has no fields.
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Plain JSON object of field values.
    pub fn to_json(&self) -> Value {
        Value::Object(
            self.fields
                .iter()
                .map(|f| (f.name.clone(), f.value.clone()))
                .collect(),
        )
    }

    /// JSON body of a Solr `add` command, carrying field and document boosts.
    pub fn to_add_command(&self) -> Value {
        let mut doc = Map::new();
        for field in &self.fields {
            let value = match field.boost {
                Some(boost) => json!({ "value": field.value, "boost": boost }),
                None => field.value.clone(),
            };
            doc.insert(field.name.clone(), value);
        }

        let mut add = Map::new();
        add.insert("doc".to_string(), Value::Object(doc));
        if let Some(boost) = self.boost {
            add.insert("boost".to_string(), json!(boost));
        }
        Value::Object(add)
    }
}

impl FromIterator<(String, Value)> for Document {
    fn from_iter<I: IntoIterator<Item = (String, Value)>>(iter: I) -> Self {
        let mut document = Document::new();
        for (name, value) in iter {
            document.add_field(name, value);
        }
        document
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fields_keep_insertion_order() {
        let mut doc = Document::new();
        doc.add_field("id", "post_1");
        doc.add_field("title", "Hello");
        doc.add_field("id", "post_2");

        let names: Vec<_> = doc.fields().map(|f| f.name.as_str()).collect();
        assert_eq!(names, vec!["id", "title"]);
        assert_eq!(doc.id(), Some("post_2"));
    }

    #[test]
    fn test_remove_field() {
        let mut doc = Document::new();
        doc.add_field("id", "post_1");
        doc.add_field(DISCRIMINATOR_FIELD, "post");

        assert_eq!(doc.remove_field("id"), Some(json!("post_1")));
        assert_eq!(doc.remove_field("id"), None);
        assert_eq!(doc.document_name(), Some("post"));
        assert_eq!(doc.len(), 1);
    }

    #[test]
    fn test_from_json_requires_object() {
        let doc = Document::from_json(json!({ "id": "post_1", "title": "x" })).unwrap();
        assert_eq!(doc.field("title"), Some(&json!("x")));
        assert!(Document::from_json(json!([1, 2])).is_err());
    }

    #[test]
    fn test_add_command_carries_boosts() {
        let mut doc = Document::new().with_boost(Some(1.5));
        doc.add_field("id", "post_1");
        doc.add_boosted_field("title", "Hello", Some(2.0));

        assert_eq!(
            doc.to_add_command(),
            json!({
                "doc": { "id": "post_1", "title": { "value": "Hello", "boost": 2.0 } },
                "boost": 1.5
            })
        );
    }
}
