//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → listener.rs (accept, report fatal listener errors)
//!     → server.rs (axum::serve, graceful shutdown, teardown)
//!     → request.rs (request ID, tracing span)
//!     → middleware stack (timeout, metrics)
//!     → handler collaborator (routes module or caller supplied)
//!     → Send to client
//! ```

mod listener;
pub mod request;
pub mod server;

use std::time::Duration;

use axum::{http::StatusCode, middleware, Router};
use tower_http::{
    request_id::{PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::config::ApplicationSettings;
use crate::observability::metrics;

pub use request::{UuidRequestId, X_REQUEST_ID};
pub use server::Server;

/// Wrap a handler in the standard middleware stack.
///
/// Outermost first: set request ID, trace, propagate request ID, timeout, metrics.
pub fn with_middleware(handler: Router, settings: &ApplicationSettings) -> Router {
    handler
        .layer(middleware::from_fn(metrics::track_requests))
        .layer(TimeoutLayer::with_status_code(
            StatusCode::REQUEST_TIMEOUT,
            Duration::from_secs(settings.request_timeout_secs),
        ))
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(TraceLayer::new_for_http().make_span_with(request::make_request_span))
        .layer(SetRequestIdLayer::x_request_id(UuidRequestId))
}
