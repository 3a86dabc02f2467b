//! Error types for catalog client operations.

use thiserror::Error;

/// Errors that can occur while talking to the asset catalog.
#[derive(Error, Debug, Clone)]
pub enum CatalogError {
    #[error("Transport failure: {0}")]
    Transport(String),

    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    #[error("Timeout: {0}")]
    Timeout(String),

    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    #[error("Authorization denied: {0}")]
    AuthorizationDenied(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Request failed with status {status}: {message}")]
    RequestFailed { status: u16, message: String },

    /// The payload did not carry the fields required to build the expected shape.
    #[error("Failed to decode {context}: {message}")]
    Decode { context: String, message: String },

    /// A lookup that expected exactly one asset found none.
    #[error("No asset matched {0}")]
    NoMatch(String),

    /// A lookup that expected at most one asset found several.
    #[error("Expected at most one asset for {query}, found {count}")]
    UnexpectedMultiMatch { query: String, count: u64 },

    /// A page fetch failed part-way through draining a collection.
    #[error("Draining aborted at {url} after {pages_merged} merged page(s): {source}")]
    DrainAborted {
        url: String,
        pages_merged: usize,
        #[source]
        source: Box<CatalogError>,
    },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Client has no catalog endpoint configured")]
    NotConnected,
}

impl CatalogError {
    /// Builds a decode error for the payload identified by `context`.
    pub fn decode(context: impl Into<String>, message: impl ToString) -> Self {
        Self::Decode {
            context: context.into(),
            message: message.to_string(),
        }
    }

    /// Returns true for failures raised below the HTTP layer.
    pub fn is_transport_failure(&self) -> bool {
        matches!(
            self,
            Self::Transport(_) | Self::ConnectionFailed(_) | Self::Timeout(_)
        )
    }

    /// Returns the underlying error of an aborted drain, or `self` otherwise.
    pub fn root_cause(&self) -> &CatalogError {
        match self {
            Self::DrainAborted { source, .. } => source.root_cause(),
            other => other,
        }
    }
}

/// Result type for catalog operations.
pub type CatalogResult<T> = Result<T, CatalogError>;
