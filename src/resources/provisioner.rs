//! One-shot startup provisioning of backend handles.
//!
//! # Responsibilities
//! - Connect the database (always) and the queue/search backends (when configured)
//! - Acquire in dependency order: database, queue, search
//! - Unwind whatever was already opened when a later backend fails
//!
//! # Design Decisions
//! - No retries: restarting the process is the supervisor's job
//! - A configured backend that cannot be reached is fatal

use std::time::Duration;

use crate::config::Settings;
use crate::observability::metrics;
use crate::resources::error::{BackendError, ProvisioningError};
use crate::resources::{BackendKind, Database, QueueWriter, ResourceSet, SearchClient};

/// Establishes every configured backend before the application is assembled.
pub struct Provisioner<'a> {
    settings: &'a Settings,
}

impl<'a> Provisioner<'a> {
    pub fn new(settings: &'a Settings) -> Self {
        Self { settings }
    }

    /// Connect all configured backends.
    ///
    /// On failure nothing stays open: handles acquired before the failing
    /// backend are released before the error is returned.
    pub async fn provision(&self) -> Result<ResourceSet, ProvisioningError> {
        let release_timeout = Duration::from_secs(self.settings.lifecycle.release_timeout_secs);

        let database = Database::connect(&self.settings.database)
            .await
            .map_err(|source| failed(BackendKind::Database, source))?;
        metrics::record_provisioning(BackendKind::Database, true);

        let mut resources = ResourceSet::new(database, release_timeout);

        if let Some(queue) = &self.settings.queue {
            match QueueWriter::connect(queue).await {
                Ok(writer) => {
                    metrics::record_provisioning(BackendKind::Queue, true);
                    resources.attach_queue(writer);
                }
                Err(source) => {
                    let error = failed(BackendKind::Queue, source);
                    resources.close().await;
                    return Err(error);
                }
            }
        } else {
            tracing::debug!("Queue not configured, skipping");
        }

        if let Some(search) = &self.settings.search {
            match SearchClient::connect(search).await {
                Ok(client) => {
                    metrics::record_provisioning(BackendKind::Search, true);
                    resources.attach_search(client);
                }
                Err(source) => {
                    let error = failed(BackendKind::Search, source);
                    resources.close().await;
                    return Err(error);
                }
            }
        } else {
            tracing::debug!("Search not configured, skipping");
        }

        tracing::info!(backends = ?resources.backends(), "Resources provisioned");
        Ok(resources)
    }
}

fn failed(backend: BackendKind, source: BackendError) -> ProvisioningError {
    tracing::error!(backend = %backend, error = %source, "Provisioning failed");
    metrics::record_provisioning(backend, false);
    ProvisioningError::new(backend, source)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{QueueSettings, SearchSettings};
    use secrecy::SecretString;

    fn sqlite_settings() -> Settings {
        let mut settings = Settings::default();
        settings.database.url = Some(SecretString::new("sqlite::memory:".into()));
        settings
    }

    #[tokio::test]
    async fn database_only_when_nothing_else_configured() {
        let resources = Provisioner::new(&sqlite_settings()).provision().await.unwrap();

        assert_eq!(resources.backends(), vec![BackendKind::Database]);
        assert!(resources.queue().is_none());
        assert!(resources.search().is_none());
        resources.close().await;
    }

    #[tokio::test]
    async fn missing_database_parameters_fail_without_connecting() {
        let err = Provisioner::new(&Settings::default())
            .provision()
            .await
            .unwrap_err();

        assert_eq!(err.backend, BackendKind::Database);
        assert!(matches!(err.source, BackendError::MissingParameter(_)));
    }

    #[tokio::test]
    async fn invalid_queue_endpoint_unwinds_database() {
        let mut settings = sqlite_settings();
        settings.queue = Some(QueueSettings {
            endpoint: "kafka://broker:9092".into(),
            topic: "events".into(),
            batch_size: 10,
            flush_interval_ms: 100,
            request_timeout_secs: 1,
        });

        let err = Provisioner::new(&settings).provision().await.unwrap_err();
        assert_eq!(err.backend, BackendKind::Queue);
        assert!(matches!(err.source, BackendError::InvalidEndpoint { .. }));
    }

    #[tokio::test]
    async fn unreachable_search_is_fatal() {
        // Reserve a port, then free it so nothing is listening there.
        let port = {
            let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
            listener.local_addr().unwrap().port()
        };
        let mut settings = sqlite_settings();
        settings.search = Some(SearchSettings {
            endpoint: format!("http://127.0.0.1:{}", port),
            username: None,
            password: None,
            request_timeout_secs: 1,
        });

        let err = Provisioner::new(&settings).provision().await.unwrap_err();
        assert_eq!(err.backend, BackendKind::Search);
        assert!(matches!(err.source, BackendError::Http(_)));
    }

    #[tokio::test]
    async fn dropped_set_releases_in_background() {
        let resources = Provisioner::new(&sqlite_settings()).provision().await.unwrap();
        let database = resources.database().clone();
        let ledger = resources.ledger();

        drop(resources);
        for _ in 0..50 {
            if !ledger.is_empty() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }

        assert_eq!(ledger.count(BackendKind::Database), 1);
        assert!(database.is_closed());
    }
}
