//! Default request handler.
//!
//! The lifecycle core only needs "a router built from settings and
//! resources"; this is the one the binary ships with. It exposes liveness
//! and readiness endpoints over the provisioned backends.

use std::sync::Arc;

use axum::{extract::State, http::StatusCode, routing::get, Json, Router};
use serde::Serialize;

use crate::config::Settings;
use crate::resources::{Database, QueueWriter, ResourceSet, SearchClient};

/// Handles shared with the request handlers.
#[derive(Clone)]
pub struct RouteState {
    pub database: Arc<Database>,
    pub queue: Option<Arc<QueueWriter>>,
    pub search: Option<Arc<SearchClient>>,
}

impl RouteState {
    pub fn from_resources(resources: &ResourceSet) -> Self {
        Self {
            database: resources.database().clone(),
            queue: resources.queue().cloned(),
            search: resources.search().cloned(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct BackendStatus {
    pub backend: &'static str,
    pub ready: bool,
}

#[derive(Debug, Serialize)]
pub struct ReadinessReport {
    pub status: &'static str,
    pub backends: Vec<BackendStatus>,
}

/// Build the default router.
pub fn create_router(_settings: &Settings, resources: &ResourceSet) -> Router {
    Router::new()
        .route("/", get(|| async { "Hello from web server" }))
        .route("/health_check", get(health_check))
        .route("/health/ready", get(readiness))
        .with_state(RouteState::from_resources(resources))
}

async fn health_check() -> StatusCode {
    StatusCode::OK
}

async fn readiness(State(state): State<RouteState>) -> (StatusCode, Json<ReadinessReport>) {
    let mut backends = Vec::new();

    let database_ready = match state.database.ping().await {
        Ok(()) => true,
        Err(e) => {
            tracing::warn!(error = %e, "Database not ready");
            false
        }
    };
    backends.push(BackendStatus {
        backend: "database",
        ready: database_ready,
    });

    if let Some(queue) = &state.queue {
        backends.push(BackendStatus {
            backend: "queue",
            ready: queue.is_open(),
        });
    }

    if let Some(search) = &state.search {
        let ready = match search.ping().await {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!(error = %e, "Search not ready");
                false
            }
        };
        backends.push(BackendStatus {
            backend: "search",
            ready,
        });
    }

    if backends.iter().all(|b| b.ready) {
        (
            StatusCode::OK,
            Json(ReadinessReport {
                status: "ready",
                backends,
            }),
        )
    } else {
        (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(ReadinessReport {
                status: "unavailable",
                backends,
            }),
        )
    }
}
