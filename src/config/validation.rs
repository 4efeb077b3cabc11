//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (timeouts > 0, batch sizes > 0)
//! - Validate backend endpoints and bind addresses
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: Settings → Result<(), Vec<ValidationError>>
//! - Database reachability and required connection parameters are checked
//!   at provisioning time, not here

use std::net::SocketAddr;

use url::Url;

use crate::config::schema::Settings;

/// A single semantic problem found in the configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    /// Dotted path of the offending field (e.g., "queue.topic").
    pub field: &'static str,
    pub message: String,
}

impl ValidationError {
    fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

impl std::error::Error for ValidationError {}

/// Validate a deserialized configuration.
pub fn validate_settings(settings: &Settings) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if settings.application.request_timeout_secs == 0 {
        errors.push(ValidationError::new(
            "application.request_timeout_secs",
            "must be greater than zero",
        ));
    }

    if settings.database.max_connections == 0 {
        errors.push(ValidationError::new(
            "database.max_connections",
            "must be greater than zero",
        ));
    }

    if let Some(queue) = &settings.queue {
        check_endpoint("queue.endpoint", &queue.endpoint, &mut errors);
        if queue.topic.trim().is_empty() {
            errors.push(ValidationError::new("queue.topic", "must not be empty"));
        }
        if queue.batch_size == 0 {
            errors.push(ValidationError::new(
                "queue.batch_size",
                "must be greater than zero",
            ));
        }
        if queue.flush_interval_ms == 0 {
            errors.push(ValidationError::new(
                "queue.flush_interval_ms",
                "must be greater than zero",
            ));
        }
    }

    if let Some(search) = &settings.search {
        check_endpoint("search.endpoint", &search.endpoint, &mut errors);
        if search.password.is_some() && search.username.is_none() {
            errors.push(ValidationError::new(
                "search.username",
                "required when a password is set",
            ));
        }
    }

    if settings.lifecycle.release_timeout_secs == 0 {
        errors.push(ValidationError::new(
            "lifecycle.release_timeout_secs",
            "must be greater than zero",
        ));
    }

    if settings.telemetry.log_level.trim().is_empty() {
        errors.push(ValidationError::new("telemetry.log_level", "must not be empty"));
    }

    if let Some(address) = &settings.telemetry.metrics_address {
        if address.parse::<SocketAddr>().is_err() {
            errors.push(ValidationError::new(
                "telemetry.metrics_address",
                format!("'{}' is not a socket address", address),
            ));
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn check_endpoint(field: &'static str, endpoint: &str, errors: &mut Vec<ValidationError>) {
    match Url::parse(endpoint) {
        Ok(url) if matches!(url.scheme(), "http" | "https") => {}
        Ok(url) => errors.push(ValidationError::new(
            field,
            format!("unsupported scheme '{}'", url.scheme()),
        )),
        Err(e) => errors.push(ValidationError::new(field, format!("invalid URL: {}", e))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::schema::{QueueSettings, SearchSettings};

    #[test]
    fn defaults_are_valid() {
        assert!(validate_settings(&Settings::default()).is_ok());
    }

    #[test]
    fn reports_every_problem() {
        let mut settings = Settings::default();
        settings.application.request_timeout_secs = 0;
        settings.lifecycle.release_timeout_secs = 0;
        settings.queue = Some(QueueSettings {
            endpoint: "kafka://broker:9092".into(),
            topic: " ".into(),
            batch_size: 0,
            flush_interval_ms: 100,
            request_timeout_secs: 5,
        });

        let errors = validate_settings(&settings).unwrap_err();
        let fields: Vec<_> = errors.iter().map(|e| e.field).collect();
        assert_eq!(
            fields,
            vec![
                "application.request_timeout_secs",
                "queue.endpoint",
                "queue.topic",
                "queue.batch_size",
                "lifecycle.release_timeout_secs",
            ]
        );
    }

    #[test]
    fn search_password_needs_username() {
        let mut settings = Settings::default();
        settings.search = Some(SearchSettings {
            endpoint: "http://localhost:9200".into(),
            username: None,
            password: Some(secrecy::SecretString::new("secret".into())),
            request_timeout_secs: 5,
        });

        let errors = validate_settings(&settings).unwrap_err();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].field, "search.username");
    }

    #[test]
    fn rejects_malformed_metrics_address() {
        let mut settings = Settings::default();
        settings.telemetry.metrics_address = Some("localhost".into());

        let errors = validate_settings(&settings).unwrap_err();
        assert_eq!(errors[0].to_string(), "telemetry.metrics_address: 'localhost' is not a socket address");
    }
}
