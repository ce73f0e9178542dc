//! Transport seam between request building and the cluster.

use crate::error::Result;
use crate::request::Request;
use async_trait::async_trait;
use serde_json::Value;

/// Status and decoded body of one cluster response.
#[derive(Debug, Clone, PartialEq)]
pub struct TransportResponse {
    /// HTTP status code.
    pub status: u16,
    /// JSON body, `Value::Null` when the body was empty.
    pub body: Value,
}

impl TransportResponse {
    /// Create a response.
    pub fn new(status: u16, body: Value) -> Self {
        Self { status, body }
    }
}

/// Sends built requests to a cluster.
///
/// An `Err` means no response was received at all. Error statuses are returned as
/// regular responses.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Send a request and wait for the response.
    async fn send(&self, request: &Request) -> Result<TransportResponse>;

    /// Send a request, blocking the calling thread until the response arrives.
    fn send_blocking(&self, request: &Request) -> Result<TransportResponse>;
}
