//! Solr client configuration.

use crate::error::{SolrError, SolrResult};
use crate::query::{CRITERIA_ROWS, UNBOUNDED_ROWS};
use std::time::Duration;

/// Solr client configuration.
#[derive(Debug, Clone)]
pub struct SolrConfig {
    /// Base URL of the Solr instance, e.g. `http://localhost:8983/solr`.
    pub url: String,
    /// Core used when an entity mapping declares no index.
    pub core: String,
    /// Basic auth username.
    pub username: Option<String>,
    /// Basic auth password.
    pub password: Option<String>,
    /// Connection timeout.
    pub connect_timeout: Duration,
    /// Request timeout.
    pub request_timeout: Duration,
    /// Commit after every update request.
    pub commit: bool,
    /// Row limit used by `find_all`.
    pub find_all_rows: u32,
    /// Row limit used by `find_by`.
    pub find_by_rows: u32,
}

impl SolrConfig {
    /// Create a new configuration for the given base URL.
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            core: "collection1".to_string(),
            username: None,
            password: None,
            connect_timeout: Duration::from_secs(10),
            request_timeout: Duration::from_secs(30),
            commit: true,
            find_all_rows: UNBOUNDED_ROWS,
            find_by_rows: CRITERIA_ROWS,
        }
    }

    /// Create configuration from environment variables.
    ///
    /// Uses the following environment variables:
    /// - `SOLR_URL`: Required base URL
    /// - `SOLR_CORE`: Default core (default: `collection1`)
    /// - `SOLR_USERNAME` / `SOLR_PASSWORD`: Basic auth credentials
    /// - `SOLR_REQUEST_TIMEOUT`: Request timeout in seconds
    /// - `SOLR_COMMIT`: Commit after updates (true/false)
    pub fn from_env() -> SolrResult<Self> {
        let url = std::env::var("SOLR_URL")
            .map_err(|_| SolrError::Config("SOLR_URL not set".into()))?;

        let mut config = Self::new(url);

        if let Ok(core) = std::env::var("SOLR_CORE") {
            config.core = core;
        }

        if let (Ok(user), Ok(pass)) =
            (std::env::var("SOLR_USERNAME"), std::env::var("SOLR_PASSWORD"))
        {
            config = config.with_basic_auth(user, pass);
        }

        if let Ok(timeout) = std::env::var("SOLR_REQUEST_TIMEOUT") {
            config.request_timeout = Duration::from_secs(
                timeout
                    .parse()
                    .map_err(|_| SolrError::Config("Invalid SOLR_REQUEST_TIMEOUT".into()))?,
            );
        }

        if let Ok(commit) = std::env::var("SOLR_COMMIT") {
            config.commit = commit == "true" || commit == "1";
        }

        config.validate()?;
        Ok(config)
    }

    /// Set the default core.
    pub fn with_core(mut self, core: impl Into<String>) -> Self {
        self.core = core.into();
        self
    }

    /// Set basic authentication credentials.
    pub fn with_basic_auth(
        mut self,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        self.username = Some(username.into());
        self.password = Some(password.into());
        self
    }

    /// Set connection timeout.
    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Set request timeout.
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Enable or disable commit after updates.
    pub fn with_commit(mut self, commit: bool) -> Self {
        self.commit = commit;
        self
    }

    /// Set the row limit for `find_all`.
    pub fn with_find_all_rows(mut self, rows: u32) -> Self {
        self.find_all_rows = rows;
        self
    }

    /// Set the row limit for `find_by`.
    pub fn with_find_by_rows(mut self, rows: u32) -> Self {
        self.find_by_rows = rows;
        self
    }

    /// Check the configuration for values Solr would reject.
    pub fn validate(&self) -> SolrResult<()> {
        if self.url.trim().is_empty() {
            return Err(SolrError::Config("Solr URL is empty".into()));
        }
        if self.core.trim().is_empty() {
            return Err(SolrError::Config("Default core is empty".into()));
        }
        if self.find_all_rows == 0 || self.find_by_rows == 0 {
            return Err(SolrError::Config("Row limits must be greater than zero".into()));
        }
        Ok(())
    }

    /// Base URL without a trailing slash.
    pub(crate) fn base_url(&self) -> &str {
        self.url.trim_end_matches('/')
    }
}

impl Default for SolrConfig {
    fn default() -> Self {
        Self::new("http://localhost:8983/solr")
    }
}
