//! Error types for query construction and result materialization.

use thiserror::Error;

/// Search error type.
#[derive(Error, Debug)]
pub enum SearchError {
    /// The query specification was rejected before anything was sent.
    #[error("Validation error: {0}")]
    Validation(String),

    /// A hit could not be turned into the requested document type.
    #[error("Cannot hydrate document {id}: {reason}")]
    Hydration {
        /// Persisted identifier of the hit.
        id: String,
        /// Why the document type refused the source.
        reason: String,
    },

    /// Serialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The request never produced a usable response.
    #[error("Transport error: {0}")]
    Transport(String),

    /// Invalid configuration.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Client error from opensearch crate.
    #[error("Client error: {0}")]
    Client(#[from] opensearch::Error),
}

impl SearchError {
    /// Shorthand for a validation failure.
    pub(crate) fn validation(message: impl Into<String>) -> Self {
        SearchError::Validation(message.into())
    }

    /// Whether this error was raised while configuring a query.
    pub fn is_validation(&self) -> bool {
        matches!(self, SearchError::Validation(_))
    }
}

/// Result type alias for search operations.
pub type Result<T> = std::result::Result<T, SearchError>;
