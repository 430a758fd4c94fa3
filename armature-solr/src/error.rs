//! Error types for Solr operations.

use thiserror::Error;

/// Solr integration error type.
#[derive(Error, Debug)]
pub enum SolrError {
    /// The entity type has no usable document mapping.
    #[error("Mapping error for {entity}: {reason}")]
    Mapping {
        /// Fully-qualified entity type name.
        entity: String,
        /// What is wrong with the mapping.
        reason: String,
    },

    /// A single field could not be read, written or converted.
    #[error("Field mapping error for {entity}.{field}: {reason}")]
    FieldMapping {
        /// Fully-qualified entity type name.
        entity: String,
        /// Declared field name.
        field: String,
        /// Why the accessor failed.
        reason: String,
    },

    /// The query was rejected before being sent to the backend.
    #[error("Query constraint violated: {0}")]
    QueryConstraint(String),

    /// Solr answered with a non-success status.
    #[error("Solr error ({status}): {message}")]
    Backend {
        /// HTTP status code.
        status: u16,
        /// Error message reported by Solr.
        message: String,
    },

    /// Solr answered, but the body is not shaped like a Solr response.
    #[error("Invalid Solr response: {0}")]
    InvalidResponse(String),

    /// Transport error from the HTTP client.
    #[cfg(feature = "http")]
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Serialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),
}

impl SolrError {
    pub(crate) fn mapping(entity: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Mapping {
            entity: entity.into(),
            reason: reason.into(),
        }
    }

    pub(crate) fn field(
        entity: impl Into<String>,
        field: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self::FieldMapping {
            entity: entity.into(),
            field: field.into(),
            reason: reason.into(),
        }
    }
}

/// Result type alias for Solr operations.
pub type SolrResult<T> = std::result::Result<T, SolrError>;
