//! Provisioning and release error definitions.

use thiserror::Error;

use crate::resources::BackendKind;

/// Why a single backend could not be reached or used.
#[derive(Debug, Error)]
pub enum BackendError {
    /// A required connection parameter is absent.
    #[error("missing required parameter `{0}`")]
    MissingParameter(&'static str),

    /// Endpoint could not be turned into a usable URL.
    #[error("invalid endpoint '{endpoint}': {reason}")]
    InvalidEndpoint { endpoint: String, reason: String },

    /// Database driver failure (connect, authenticate, query).
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Transport failure talking to an HTTP backend.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Backend answered, but not with a success status.
    #[error("backend responded with status {status}")]
    Rejected { status: u16 },
}

/// A configured backend could not be provisioned. Fatal to startup.
#[derive(Debug, Error)]
#[error("failed to provision {backend}: {source}")]
pub struct ProvisioningError {
    pub backend: BackendKind,
    #[source]
    pub source: BackendError,
}

impl ProvisioningError {
    pub fn new(backend: BackendKind, source: BackendError) -> Self {
        Self { backend, source }
    }
}

/// A resource release did not complete cleanly. Logged, never propagated.
#[derive(Debug, Error)]
pub enum ReleaseError {
    /// Background flusher task panicked or was cancelled.
    #[error("flusher task failed: {0}")]
    Flusher(#[from] tokio::task::JoinError),

    /// Buffered records could not be delivered before the writer closed.
    #[error("{undelivered} buffered records could not be delivered")]
    Undelivered { undelivered: usize },
}

/// Errors returned by [`QueueWriter`](crate::resources::QueueWriter) operations.
#[derive(Debug, Error)]
pub enum QueueError {
    #[error("queue writer has been released")]
    Released,
}

/// Errors returned by [`SearchClient`](crate::resources::SearchClient) operations.
#[derive(Debug, Error)]
pub enum SearchError {
    #[error("search client has been released")]
    Released,

    #[error(transparent)]
    Backend(#[from] BackendError),
}
