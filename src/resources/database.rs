//! Pooled database connection.
//!
//! Backed by `sqlx`'s driver-agnostic pool so the same handle serves a
//! Postgres deployment and an in-process SQLite database.

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use secrecy::ExposeSecret;
use sqlx::any::AnyPoolOptions;
use sqlx::AnyPool;
use url::Url;

use crate::config::DatabaseSettings;
use crate::resources::error::{BackendError, ReleaseError};
use crate::resources::{BackendKind, Resource};

/// Shared handle to the primary store.
#[derive(Debug)]
pub struct Database {
    pool: AnyPool,
    released: AtomicBool,
}

impl Database {
    /// Open the pool and verify it with a round trip.
    pub(crate) async fn connect(settings: &DatabaseSettings) -> Result<Self, BackendError> {
        let url = connection_url(settings)?;
        sqlx::any::install_default_drivers();

        let pool = AnyPoolOptions::new()
            .max_connections(settings.max_connections)
            .acquire_timeout(Duration::from_secs(settings.acquire_timeout_secs))
            .connect(&url)
            .await?;

        if let Err(e) = sqlx::query("SELECT 1").execute(&pool).await {
            pool.close().await;
            return Err(e.into());
        }

        tracing::info!(
            max_connections = settings.max_connections,
            "Database pool ready"
        );

        Ok(Self {
            pool,
            released: AtomicBool::new(false),
        })
    }

    /// Underlying pool for running queries.
    pub fn pool(&self) -> &AnyPool {
        &self.pool
    }

    /// Check that a connection can still be acquired and used.
    pub async fn ping(&self) -> Result<(), sqlx::Error> {
        sqlx::query("SELECT 1").execute(&self.pool).await.map(|_| ())
    }

    pub fn is_closed(&self) -> bool {
        self.pool.is_closed()
    }
}

#[async_trait]
impl Resource for Database {
    fn kind(&self) -> BackendKind {
        BackendKind::Database
    }

    /// Close the pool, waiting for checked-out connections to be returned.
    async fn release(&self) -> Result<(), ReleaseError> {
        if self.released.swap(true, Ordering::SeqCst) {
            return Ok(());
        }
        self.pool.close().await;
        Ok(())
    }
}

/// Resolve the connection URL: the explicit `url`, or a `postgres://` URL built from parts.
pub(crate) fn connection_url(settings: &DatabaseSettings) -> Result<String, BackendError> {
    if let Some(url) = settings
        .url
        .as_ref()
        .map(|u| u.expose_secret())
        .filter(|u| !u.trim().is_empty())
    {
        return Ok(url.clone());
    }

    if settings.host.trim().is_empty() {
        return Err(BackendError::MissingParameter("database.host"));
    }
    if settings.username.trim().is_empty() {
        return Err(BackendError::MissingParameter("database.username"));
    }
    if settings.name.trim().is_empty() {
        return Err(BackendError::MissingParameter("database.name"));
    }

    let invalid = |reason: &str| BackendError::InvalidEndpoint {
        endpoint: settings.host.clone(),
        reason: reason.to_string(),
    };

    let mut url = Url::parse(&format!("postgres://{}", settings.host))
        .map_err(|e| invalid(&e.to_string()))?;
    url.set_username(&settings.username)
        .map_err(|_| invalid("cannot carry a username"))?;
    let password = settings.password.expose_secret();
    if !password.is_empty() {
        url.set_password(Some(password))
            .map_err(|_| invalid("cannot carry a password"))?;
    }
    url.set_port(Some(settings.port))
        .map_err(|_| invalid("cannot carry a port"))?;
    url.set_path(&settings.name);
    url.query_pairs_mut().append_pair(
        "sslmode",
        if settings.require_ssl { "require" } else { "prefer" },
    );

    Ok(url.to_string())
}
