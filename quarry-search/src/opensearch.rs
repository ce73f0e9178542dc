//! [`Transport`] backed by the `opensearch` client.

use crate::config::SearchConfig;
use crate::error::{Result, SearchError};
use crate::request::{HttpMethod, Request};
use crate::transport::{Transport, TransportResponse};
use async_trait::async_trait;
use once_cell::sync::OnceCell;
use opensearch::{
    auth::Credentials,
    http::{
        headers::HeaderMap,
        transport::{SingleNodeConnectionPool, TransportBuilder},
        Method, Url,
    },
    OpenSearch,
};
use serde_json::Value;
use std::sync::Arc;
use tokio::runtime::{Handle, Runtime, RuntimeFlavor};
use tracing::{debug, info};

/// Runtime driving blocking calls made outside of any tokio context.
static BLOCKING_RUNTIME: OnceCell<Runtime> = OnceCell::new();

/// Sends requests through an already configured [`OpenSearch`] client.
#[derive(Clone)]
pub struct OpenSearchTransport {
    client: Arc<OpenSearch>,
}

impl OpenSearchTransport {
    /// Build a client for the first URL of the configuration.
    pub fn new(config: &SearchConfig) -> Result<Self> {
        info!(urls = ?config.urls, "Initializing search transport");

        let url = config
            .urls
            .first()
            .ok_or_else(|| SearchError::Config("No URLs provided".to_string()))?;

        let url = Url::parse(url).map_err(|e| SearchError::Config(format!("Invalid URL: {}", e)))?;

        let mut builder = TransportBuilder::new(SingleNodeConnectionPool::new(url))
            .timeout(config.request_timeout)
            .disable_proxy();

        if let (Some(user), Some(pass)) = (&config.username, &config.password) {
            builder = builder.auth(Credentials::Basic(user.clone(), pass.clone()));
        }

        let transport = builder
            .build()
            .map_err(|e| SearchError::Config(e.to_string()))?;

        debug!("Search transport initialized");

        Ok(Self::from_client(OpenSearch::new(transport)))
    }

    /// Wrap a client whose lifecycle is owned elsewhere.
    pub fn from_client(client: OpenSearch) -> Self {
        Self {
            client: Arc::new(client),
        }
    }

    /// Get the underlying client.
    pub fn inner(&self) -> &OpenSearch {
        &self.client
    }
}

fn method(method: HttpMethod) -> Method {
    match method {
        HttpMethod::Get => Method::Get,
        HttpMethod::Post => Method::Post,
        HttpMethod::Put => Method::Put,
        HttpMethod::Delete => Method::Delete,
    }
}

fn blocking_runtime() -> Result<&'static Runtime> {
    BLOCKING_RUNTIME.get_or_try_init(|| {
        tokio::runtime::Builder::new_multi_thread()
            .worker_threads(2)
            .thread_name("quarry-blocking")
            .enable_all()
            .build()
            .map_err(|e| SearchError::Transport(format!("Cannot start blocking runtime: {}", e)))
    })
}

#[async_trait]
impl Transport for OpenSearchTransport {
    async fn send(&self, request: &Request) -> Result<TransportResponse> {
        let path = request.path();
        let params = request.query_params();
        let body = request.body()?;

        debug!(method = %request.method(), path = %path, "Sending request");

        let response = self
            .client
            .send(
                method(request.method()),
                &path,
                HeaderMap::new(),
                (!params.is_empty()).then_some(params.as_slice()),
                body,
                None,
            )
            .await?;

        let status = response.status_code().as_u16();
        let text = response.text().await?;

        let body = if text.trim().is_empty() {
            Value::Null
        } else {
            serde_json::from_str(&text).map_err(|e| {
                SearchError::Transport(format!("Response body is not JSON (status {}): {}", status, e))
            })?
        };

        Ok(TransportResponse::new(status, body))
    }

    fn send_blocking(&self, request: &Request) -> Result<TransportResponse> {
        match Handle::try_current() {
            Ok(handle) if handle.runtime_flavor() == RuntimeFlavor::MultiThread => {
                tokio::task::block_in_place(|| handle.block_on(self.send(request)))
            }
            // Any other runtime context cannot be blocked on from this thread
            Ok(_) => std::thread::scope(|scope| {
                scope
                    .spawn(|| blocking_runtime()?.block_on(self.send(request)))
                    .join()
                    .map_err(|_| SearchError::Transport("Blocking request thread panicked".to_string()))?
            }),
            Err(_) => blocking_runtime()?.block_on(self.send(request)),
        }
    }
}
