//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the web server.
//! All types derive Serde traits for deserialization from config files.
//! Credentials are held as [`SecretString`] so they never show up in `Debug` output.

use secrecy::SecretString;
use serde::Deserialize;

/// Root configuration for the web server.
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct Settings {
    /// Listener and request handling settings.
    pub application: ApplicationSettings,

    /// Primary store. Always provisioned.
    pub database: DatabaseSettings,

    /// Message-queue writer. Only provisioned when present.
    pub queue: Option<QueueSettings>,

    /// Search client. Only provisioned when present.
    pub search: Option<SearchSettings>,

    /// Teardown settings.
    pub lifecycle: LifecycleSettings,

    /// Logging and metrics settings.
    pub telemetry: TelemetrySettings,
}

/// Application settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ApplicationSettings {
    /// Port to listen on. `0` picks an ephemeral port.
    pub port: u16,

    /// Request timeout (total time for request/response) in seconds.
    pub request_timeout_secs: u64,
}

impl Default for ApplicationSettings {
    fn default() -> Self {
        Self {
            port: 8000,
            request_timeout_secs: 30,
        }
    }
}

/// Database connection parameters.
///
/// Either `url` is set, or the individual parts are used to assemble a
/// `postgres://` URL.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DatabaseSettings {
    /// Full connection URL (e.g. `postgres://...` or `sqlite::memory:`).
    pub url: Option<SecretString>,
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: SecretString,
    /// Database name.
    pub name: String,
    pub require_ssl: bool,

    /// Upper bound of pooled connections.
    pub max_connections: u32,

    /// Time to wait for a connection before giving up, in seconds.
    pub acquire_timeout_secs: u64,
}

impl Default for DatabaseSettings {
    fn default() -> Self {
        Self {
            url: None,
            host: String::new(),
            port: 5432,
            username: String::new(),
            password: SecretString::new(String::new()),
            name: String::new(),
            require_ssl: false,
            max_connections: 10,
            acquire_timeout_secs: 5,
        }
    }
}

/// Message-queue writer settings (Kafka REST proxy, v2 API).
#[derive(Debug, Clone, Deserialize)]
pub struct QueueSettings {
    /// REST proxy base URL (e.g., "http://localhost:8082").
    pub endpoint: String,

    /// Topic records are produced to.
    pub topic: String,

    /// Records buffered before a flush is forced.
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,

    /// Interval between periodic flushes in milliseconds.
    #[serde(default = "default_flush_interval_ms")]
    pub flush_interval_ms: u64,

    /// Per-request timeout against the proxy in seconds.
    #[serde(default = "default_backend_timeout_secs")]
    pub request_timeout_secs: u64,
}

/// Search service settings (Elasticsearch HTTP API).
#[derive(Debug, Clone, Deserialize)]
pub struct SearchSettings {
    /// Cluster base URL (e.g., "http://localhost:9200").
    pub endpoint: String,

    #[serde(default)]
    pub username: Option<String>,

    #[serde(default)]
    pub password: Option<SecretString>,

    /// Per-request timeout against the cluster in seconds.
    #[serde(default = "default_backend_timeout_secs")]
    pub request_timeout_secs: u64,
}

fn default_batch_size() -> usize {
    100
}

fn default_flush_interval_ms() -> u64 {
    500
}

fn default_backend_timeout_secs() -> u64 {
    5
}

/// Teardown configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LifecycleSettings {
    /// Grace period given to each resource release, in seconds.
    pub release_timeout_secs: u64,
}

impl Default for LifecycleSettings {
    fn default() -> Self {
        Self {
            release_timeout_secs: 10,
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TelemetrySettings {
    /// Log level (trace, debug, info, warn, error) or a full filter directive.
    pub log_level: String,

    /// Output format of the log layer.
    pub format: LogFormat,

    /// Prometheus scrape endpoint bind address. Disabled when absent.
    pub metrics_address: Option<String>,
}

impl Default for TelemetrySettings {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            format: LogFormat::Pretty,
            metrics_address: None,
        }
    }
}
