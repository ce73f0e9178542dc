//! Search engine configuration.

use crate::document::{Indexable, RoutingPath};
use std::collections::HashMap;
use std::env;
use std::time::Duration;

/// Cluster URL used when nothing else is configured.
pub const DEFAULT_URL: &str = "http://localhost:9200";

/// Index used when a document type has no explicit mapping.
pub const DEFAULT_INDEX: &str = "quarry";

/// Search engine configuration.
#[derive(Debug, Clone)]
pub struct SearchConfig {
    /// Cluster URL(s). Only the first one is used by [`crate::OpenSearchTransport`].
    pub urls: Vec<String>,
    /// Basic auth username.
    pub username: Option<String>,
    /// Basic auth password.
    pub password: Option<String>,
    /// Request timeout.
    pub request_timeout: Duration,
    /// Log request and response bodies at debug level.
    pub show_request: bool,
    /// Index used for document types without an explicit mapping.
    pub default_index: String,
    /// Explicit routing per logical document type.
    pub mappings: HashMap<String, RoutingPath>,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self::new(DEFAULT_URL)
    }
}

impl SearchConfig {
    /// Create a new configuration with a single URL.
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            urls: vec![url.into()],
            username: None,
            password: None,
            request_timeout: Duration::from_secs(30),
            show_request: false,
            default_index: DEFAULT_INDEX.to_string(),
            mappings: HashMap::new(),
        }
    }

    /// Create configuration with multiple URLs for a cluster.
    pub fn cluster(urls: Vec<String>) -> Self {
        Self {
            urls,
            ..Self::default()
        }
    }

    /// Load configuration from `QUARRY_*` environment variables.
    ///
    /// - `QUARRY_URLS` - comma separated node list, `http://` is assumed when no scheme is given
    /// - `QUARRY_USERNAME` / `QUARRY_PASSWORD` - basic auth
    /// - `QUARRY_REQUEST_TIMEOUT_SECS` - request timeout in seconds
    /// - `QUARRY_SHOW_REQUEST=1|true` - log request and response bodies
    /// - `QUARRY_INDEX` - default index name
    pub fn from_env() -> Self {
        let mut config = env::var("QUARRY_URLS")
            .ok()
            .map(|urls| parse_urls(&urls))
            .filter(|urls| !urls.is_empty())
            .map(Self::cluster)
            .unwrap_or_default();

        if let (Ok(user), Ok(pass)) = (env::var("QUARRY_USERNAME"), env::var("QUARRY_PASSWORD")) {
            config = config.with_basic_auth(user, pass);
        }

        if let Some(secs) = env::var("QUARRY_REQUEST_TIMEOUT_SECS")
            .ok()
            .and_then(|v| v.trim().parse::<u64>().ok())
        {
            config.request_timeout = Duration::from_secs(secs);
        }

        config.show_request = env::var("QUARRY_SHOW_REQUEST")
            .map(|v| flag(&v))
            .unwrap_or(false);

        if let Ok(index) = env::var("QUARRY_INDEX") {
            let index = index.trim();
            if !index.is_empty() {
                config.default_index = index.to_string();
            }
        }

        config
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

    /// Set request timeout.
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Enable or disable request/response body logging.
    pub fn with_show_request(mut self, enabled: bool) -> Self {
        self.show_request = enabled;
        self
    }

    /// Set the default index.
    pub fn with_default_index(mut self, index: impl Into<String>) -> Self {
        self.default_index = index.into();
        self
    }

    /// Route a logical document type to an explicit path.
    pub fn with_mapping(mut self, doc_type: impl Into<String>, path: RoutingPath) -> Self {
        self.mappings.insert(doc_type.into(), path);
        self
    }

    /// Resolve where documents of type `T` live.
    pub fn path_for<T: Indexable>(&self) -> RoutingPath {
        self.mappings
            .get(T::DOC_TYPE)
            .cloned()
            .unwrap_or_else(|| RoutingPath::new(self.default_index.clone(), T::DOC_TYPE))
    }
}

fn flag(value: &str) -> bool {
    value == "1" || value.eq_ignore_ascii_case("true")
}

/// Split a comma separated node list, adding a scheme where missing.
pub(crate) fn parse_urls(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|chunk| !chunk.is_empty())
        .map(|chunk| {
            if chunk.starts_with("http") {
                chunk.to_string()
            } else {
                format!("http://{}", chunk)
            }
        })
        .collect()
}
