//! Search client: the boundary between built requests and the cluster.

use crate::{
    config::SearchConfig,
    document::{Indexable, RoutingPath},
    error::{Result, SearchError},
    finder::Finder,
    opensearch::OpenSearchTransport,
    request::Request,
    response::{Hit, RawResult},
    transport::{Transport, TransportResponse},
};
use std::sync::Arc;
use tracing::{debug, error, warn};

/// Executes requests and turns every outcome into a [`RawResult`].
///
/// Transport failures never escape: they are logged and replaced by an empty failed
/// result. The blocking and async entry points share the same conversion.
#[derive(Clone)]
pub struct SearchClient {
    transport: Arc<dyn Transport>,
    config: Arc<SearchConfig>,
}

impl SearchClient {
    /// Create a client over an existing transport.
    pub fn new(transport: impl Transport + 'static, config: SearchConfig) -> Self {
        Self::with_shared_transport(Arc::new(transport), config)
    }

    /// Create a client over a transport shared with other components.
    pub fn with_shared_transport(transport: Arc<dyn Transport>, config: SearchConfig) -> Self {
        Self {
            transport,
            config: Arc::new(config),
        }
    }

    /// Connect to the cluster described by `config`.
    pub fn connect(config: SearchConfig) -> Result<Self> {
        let transport = OpenSearchTransport::new(&config)?;
        Ok(Self::new(transport, config))
    }

    /// Get the configuration.
    pub fn config(&self) -> &SearchConfig {
        &self.config
    }

    /// Get the transport.
    pub fn transport(&self) -> &Arc<dyn Transport> {
        &self.transport
    }

    /// Typed entry point for documents of type `T`, at their configured path.
    pub fn finder<T: Indexable>(&self) -> Finder<T> {
        Finder::new(self.clone())
    }

    /// Execute a request, blocking until it completes.
    pub fn execute(&self, request: &Request) -> RawResult {
        let outcome = self.transport.send_blocking(request);
        self.raw_result(request, outcome)
    }

    /// Execute a request asynchronously.
    pub async fn execute_async(&self, request: &Request) -> RawResult {
        let outcome = self.transport.send(request).await;
        self.raw_result(request, outcome)
    }

    fn raw_result(&self, request: &Request, outcome: Result<TransportResponse>) -> RawResult {
        let result = match outcome {
            Ok(response) => RawResult::from_response(response),
            Err(e) => {
                error!(
                    error = %e,
                    method = %request.method(),
                    path = %request.path(),
                    "Request failed"
                );
                return RawResult::failed();
            }
        };

        if self.config.show_request {
            debug!(response = %result.json_string(), "Response received");
        }

        match result.status() {
            Some(status) if status >= 500 => error!(
                status,
                path = %request.path(),
                reason = %result.error_message(),
                "Cluster failed to serve request"
            ),
            _ if !result.succeeded() => warn!(
                status = ?result.status(),
                path = %request.path(),
                reason = %result.error_message(),
                "Request rejected by cluster"
            ),
            _ => {}
        }

        result
    }

    // =========================================================================
    // Document Operations
    // =========================================================================

    /// Fetch one document by id.
    ///
    /// Returns `Ok(None)` when the document does not exist or the call failed.
    pub fn get<T: Indexable>(&self, path: &RoutingPath, id: &str) -> Result<Option<T>> {
        let request = get_request(path, id)?;
        found_document(self.execute(&request))
    }

    /// Fetch one document by id asynchronously.
    pub async fn get_async<T: Indexable>(&self, path: &RoutingPath, id: &str) -> Result<Option<T>> {
        let request = get_request(path, id)?;
        found_document(self.execute_async(&request).await)
    }

    /// Store a document under its own id, or a server-assigned one when it has none.
    pub fn index<T: Indexable>(&self, path: &RoutingPath, doc: &T) -> Result<RawResult> {
        let request = index_request(path, doc)?;
        Ok(self.execute(&request))
    }

    /// Store a document asynchronously.
    pub async fn index_async<T: Indexable>(&self, path: &RoutingPath, doc: &T) -> Result<RawResult> {
        let request = index_request(path, doc)?;
        Ok(self.execute_async(&request).await)
    }

    /// Remove a document.
    pub fn delete(&self, path: &RoutingPath, id: &str) -> Result<RawResult> {
        let request = delete_request(path, id)?;
        Ok(self.execute(&request))
    }

    /// Remove a document asynchronously.
    pub async fn delete_async(&self, path: &RoutingPath, id: &str) -> Result<RawResult> {
        let request = delete_request(path, id)?;
        Ok(self.execute_async(&request).await)
    }
}

fn require_id(id: &str) -> Result<String> {
    if id.trim().is_empty() {
        return Err(SearchError::validation("document id cannot be empty"));
    }
    Ok(id.to_string())
}

fn get_request(path: &RoutingPath, id: &str) -> Result<Request> {
    Ok(Request::Get {
        path: path.clone(),
        id: require_id(id)?,
    })
}

fn delete_request(path: &RoutingPath, id: &str) -> Result<Request> {
    Ok(Request::Delete {
        path: path.clone(),
        id: require_id(id)?,
    })
}

fn index_request<T: Indexable>(path: &RoutingPath, doc: &T) -> Result<Request> {
    Ok(Request::Index {
        path: path.clone(),
        id: doc.id().filter(|id| !id.is_empty()).map(str::to_string),
        source: doc.to_index()?,
    })
}

fn found_document<T: Indexable>(raw: RawResult) -> Result<Option<T>> {
    if !raw.found() {
        return Ok(None);
    }
    raw.as_hit().map(Hit::into_document).transpose()
}
