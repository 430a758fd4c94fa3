//! Search backends.
//!
//! [`SearchBackend`] is the boundary between the mapping layer and Solr.
//! [`HttpBackend`] talks to Solr's JSON API over HTTP; tests and embedders
//! can plug in their own implementation.

use crate::document::Document;
use crate::error::SolrResult;
use crate::search::{SelectRequest, SelectResponse};
use async_trait::async_trait;

/// Executes select and update requests against a Solr instance.
#[async_trait]
pub trait SearchBackend: Send + Sync {
    /// Run a select request.
    async fn select(&self, request: &SelectRequest) -> SolrResult<SelectResponse>;

    /// Add or replace documents in a core.
    async fn add(&self, core: &str, documents: Vec<Document>) -> SolrResult<()>;

    /// Delete documents by key.
    async fn delete_by_id(&self, core: &str, ids: Vec<String>) -> SolrResult<()>;

    /// Delete every document matching a query.
    async fn delete_by_query(&self, core: &str, query: &str) -> SolrResult<()>;
}

#[cfg(feature = "http")]
pub use http::HttpBackend;

#[cfg(feature = "http")]
mod http {
    use super::SearchBackend;
    use crate::config::SolrConfig;
    use crate::document::Document;
    use crate::error::{SolrError, SolrResult};
    use crate::search::{SelectRequest, SelectResponse};
    use async_trait::async_trait;
    use serde_json::{Value, json};
    use std::sync::Arc;
    use tracing::{debug, info};

    /// [`SearchBackend`] over Solr's HTTP JSON API.
    #[derive(Clone)]
    pub struct HttpBackend {
        inner: reqwest::Client,
        config: Arc<SolrConfig>,
    }

    impl HttpBackend {
        /// Create a backend for the configured Solr instance.
        pub fn new(config: SolrConfig) -> SolrResult<Self> {
            config.validate()?;
            url::Url::parse(config.base_url())
                .map_err(|e| SolrError::Config(format!("Invalid Solr URL: {}", e)))?;

            info!("Initializing Solr HTTP backend for: {}", config.base_url());

            let inner = reqwest::Client::builder()
                .timeout(config.request_timeout)
                .connect_timeout(config.connect_timeout)
                .build()?;

            Ok(Self {
                inner,
                config: Arc::new(config),
            })
        }

        /// Get the underlying reqwest client.
        pub fn inner(&self) -> &reqwest::Client {
            &self.inner
        }

        /// Get the configuration.
        pub fn config(&self) -> &SolrConfig {
            &self.config
        }

        fn endpoint(&self, core: &str, handler: &str) -> String {
            format!("{}/{}/{}", self.config.base_url(), core, handler)
        }

        fn authorize(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
            match &self.config.username {
                Some(user) => request.basic_auth(user, self.config.password.as_deref()),
                None => request,
            }
        }

        async fn update(&self, core: &str, body: String) -> SolrResult<()> {
            let url = self.endpoint(core, "update");
            debug!("POST {} (commit={})", url, self.config.commit);

            let request = self
                .inner
                .post(&url)
                .query(&[("commit", self.config.commit.to_string()), ("wt", "json".to_string())])
                .header(reqwest::header::CONTENT_TYPE, "application/json")
                .body(body);

            let response = self.authorize(request).send().await?;
            read_body(response).await.map(|_| ())
        }
    }

    #[async_trait]
    impl SearchBackend for HttpBackend {
        async fn select(&self, request: &SelectRequest) -> SolrResult<SelectResponse> {
            let url = self.endpoint(&request.core, "select");
            debug!("GET {} q={} rows={}", url, request.q, request.rows);

            let http_request = self.inner.get(&url).query(&request.params());
            let response = self.authorize(http_request).send().await?;

            SelectResponse::from_json(read_body(response).await?)
        }

        async fn add(&self, core: &str, documents: Vec<Document>) -> SolrResult<()> {
            if documents.is_empty() {
                return Ok(());
            }
            debug!("Adding {} document(s) to core {}", documents.len(), core);
            self.update(core, add_body(&documents)?).await
        }

        async fn delete_by_id(&self, core: &str, ids: Vec<String>) -> SolrResult<()> {
            if ids.is_empty() {
                return Ok(());
            }
            debug!("Deleting {} document(s) from core {}", ids.len(), core);
            let body = json!({ "delete": ids });
            self.update(core, serde_json::to_string(&body)?).await
        }

        async fn delete_by_query(&self, core: &str, query: &str) -> SolrResult<()> {
            debug!("Deleting by query {} from core {}", query, core);
            let body = json!({ "delete": { "query": query } });
            self.update(core, serde_json::to_string(&body)?).await
        }
    }

    impl std::fmt::Debug for HttpBackend {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            f.debug_struct("HttpBackend")
                .field("url", &self.config.url)
                .finish()
        }
    }

    /// Solr's update syntax repeats the `add` key once per document, which a
    /// JSON map cannot express.
    pub(super) fn add_body(documents: &[Document]) -> SolrResult<String> {
        let commands = documents
            .iter()
            .map(|doc| -> SolrResult<String> {
                Ok(format!("\"add\":{}", serde_json::to_string(&doc.to_add_command())?))
            })
            .collect::<SolrResult<Vec<_>>>()?;
        Ok(format!("{{{}}}", commands.join(",")))
    }

    async fn read_body(response: reqwest::Response) -> SolrResult<Value> {
        let status = response.status();
        let text = response.text().await?;

        if !status.is_success() {
            return Err(SolrError::Backend {
                status: status.as_u16(),
                message: error_message(&text),
            });
        }

        serde_json::from_str(&text).map_err(|e| {
            SolrError::InvalidResponse(format!("body is not JSON ({}): {}", e, snippet(&text)))
        })
    }

    /// Solr's `error.msg`, or the start of a non-JSON error page.
    fn error_message(text: &str) -> String {
        serde_json::from_str::<Value>(text)
            .ok()
            .and_then(|body| body.pointer("/error/msg")?.as_str().map(str::to_string))
            .unwrap_or_else(|| match snippet(text) {
                "" => "Unknown error".to_string(),
                start => start.to_string(),
            })
    }

    fn snippet(text: &str) -> &str {
        let text = text.trim();
        match text.char_indices().nth(200) {
            Some((end, _)) => &text[..end],
            None => text,
        }
    }

}
