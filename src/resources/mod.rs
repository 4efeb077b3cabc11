//! Backend resource subsystem.
//!
//! # Data Flow
//! ```text
//! Settings
//!     → provisioner.rs (database, then queue, then search)
//!     → ResourceSet (live handles, acquisition order)
//!     → shared with the request handler as Arc handles
//!     → ResourceSet::close (reverse order, bounded per release)
//!     → ledger.rs (one record per release)
//! ```
//!
//! # Design Decisions
//! - Only the set can release its handles; the release API is crate-private
//! - Configured backends are mandatory: a configured but unreachable queue
//!   or search cluster fails startup
//! - Each release gets the same grace period; a release that overruns it is
//!   abandoned and recorded, never propagated
//! - A set dropped without `close` releases itself in the background

pub mod database;
pub mod error;
pub mod ledger;
pub mod provisioner;
pub mod queue;
pub mod search;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use url::Url;

use crate::observability::metrics;

pub use database::Database;
pub use error::{BackendError, ProvisioningError, QueueError, ReleaseError, SearchError};
pub use ledger::{ReleaseLedger, ReleaseOutcome, ReleaseRecord};
pub use provisioner::Provisioner;
pub use queue::QueueWriter;
pub use search::SearchClient;

/// The kinds of stateful backend the application can hold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BackendKind {
    Database,
    Queue,
    Search,
}

impl BackendKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            BackendKind::Database => "database",
            BackendKind::Queue => "queue",
            BackendKind::Search => "search",
        }
    }
}

impl std::fmt::Display for BackendKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A live handle that teardown can release.
#[async_trait]
pub(crate) trait Resource: Send + Sync {
    fn kind(&self) -> BackendKind;

    /// Release the handle. Calling it again after success is a no-op.
    async fn release(&self) -> Result<(), ReleaseError>;
}

/// All provisioned handles, owned by the application for its whole lifetime.
pub struct ResourceSet {
    database: Arc<Database>,
    queue: Option<Arc<QueueWriter>>,
    search: Option<Arc<SearchClient>>,
    /// Acquisition order; teardown walks it backwards.
    acquired: Vec<Arc<dyn Resource>>,
    release_timeout: Duration,
    ledger: ReleaseLedger,
}

impl ResourceSet {
    pub(crate) fn new(database: Database, release_timeout: Duration) -> Self {
        let database = Arc::new(database);
        Self {
            acquired: vec![database.clone() as Arc<dyn Resource>],
            database,
            queue: None,
            search: None,
            release_timeout,
            ledger: ReleaseLedger::new(),
        }
    }

    pub(crate) fn attach_queue(&mut self, queue: QueueWriter) {
        let queue = Arc::new(queue);
        self.acquired.push(queue.clone());
        self.queue = Some(queue);
    }

    pub(crate) fn attach_search(&mut self, search: SearchClient) {
        let search = Arc::new(search);
        self.acquired.push(search.clone());
        self.search = Some(search);
    }

    pub fn database(&self) -> &Arc<Database> {
        &self.database
    }

    pub fn queue(&self) -> Option<&Arc<QueueWriter>> {
        self.queue.as_ref()
    }

    pub fn search(&self) -> Option<&Arc<SearchClient>> {
        self.search.as_ref()
    }

    /// Held backends, in acquisition order.
    pub fn backends(&self) -> Vec<BackendKind> {
        self.acquired.iter().map(|r| r.kind()).collect()
    }

    /// Shared view of the teardown records.
    pub fn ledger(&self) -> ReleaseLedger {
        self.ledger.clone()
    }

    /// Release every handle in reverse acquisition order.
    ///
    /// Consumes the set, so teardown happens at most once.
    pub(crate) async fn close(mut self) {
        let acquired = std::mem::take(&mut self.acquired);
        release_all(acquired, self.release_timeout, &self.ledger).await;
    }
}

impl Drop for ResourceSet {
    fn drop(&mut self) {
        if self.acquired.is_empty() {
            return;
        }

        let acquired = std::mem::take(&mut self.acquired);
        let ledger = self.ledger.clone();
        let timeout = self.release_timeout;
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                tracing::warn!("Resource set dropped without teardown, releasing in background");
                handle.spawn(async move {
                    release_all(acquired, timeout, &ledger).await;
                });
            }
            Err(_) => {
                tracing::error!(
                    backends = acquired.len(),
                    "Resource set dropped outside a runtime, handles not released"
                );
            }
        }
    }
}

impl std::fmt::Debug for ResourceSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResourceSet")
            .field("backends", &self.backends())
            .field("release_timeout", &self.release_timeout)
            .finish()
    }
}

async fn release_all(
    acquired: Vec<Arc<dyn Resource>>,
    timeout: Duration,
    ledger: &ReleaseLedger,
) {
    for resource in acquired.into_iter().rev() {
        let backend = resource.kind();
        let outcome = match tokio::time::timeout(timeout, resource.release()).await {
            Ok(Ok(())) => {
                tracing::info!(backend = %backend, "Resource released");
                ReleaseOutcome::Released
            }
            Ok(Err(e)) => {
                tracing::warn!(backend = %backend, error = %e, "Resource release failed");
                ReleaseOutcome::Failed(e.to_string())
            }
            Err(_) => {
                tracing::warn!(
                    backend = %backend,
                    timeout = ?timeout,
                    "Resource release timed out, abandoning"
                );
                ReleaseOutcome::TimedOut
            }
        };
        metrics::record_release(backend, &outcome);
        ledger.record(backend, outcome);
    }
}

/// Join `path` onto a base endpoint, treating the endpoint as a directory.
pub(crate) fn endpoint_url(endpoint: &str, path: &str) -> Result<Url, BackendError> {
    let invalid = |reason: String| BackendError::InvalidEndpoint {
        endpoint: endpoint.to_string(),
        reason,
    };

    let mut base = Url::parse(endpoint).map_err(|e| invalid(e.to_string()))?;
    if !matches!(base.scheme(), "http" | "https") {
        return Err(invalid(format!("unsupported scheme '{}'", base.scheme())));
    }
    if !base.path().ends_with('/') {
        let with_slash = format!("{}/", base.path());
        base.set_path(&with_slash);
    }
    base.join(path).map_err(|e| invalid(e.to_string()))
}
