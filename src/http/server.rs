//! HTTP server: the serve loop of a bound application.
//!
//! # Responsibilities
//! - Serve the composed handler on the bound listener
//! - Stop accepting when the shutdown future resolves
//! - Release the resource set exactly once when serving ends, however it ends
//!
//! # Design Decisions
//! - `run_until_stopped` consumes the server, so the serve loop and its
//!   teardown can only happen once
//! - A fatal accept error stops the serve loop like a shutdown signal would,
//!   and is returned as [`ServeError`] after teardown
//! - A panic in the accept loop is caught, teardown runs, then the panic is
//!   resumed. Handler panics stay inside their connection task and never
//!   reach this loop

use std::future::{Future, IntoFuture};
use std::net::SocketAddr;
use std::panic::AssertUnwindSafe;

use axum::Router;
use futures_util::FutureExt;
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tracing::{Instrument, Span};

use crate::application::error::{ApplicationError, ServeError};
use crate::http::listener::MonitoredListener;
use crate::resources::{ReleaseLedger, ResourceSet};

/// An application whose listener is bound and ready to accept connections.
pub struct Server {
    listener: TcpListener,
    local_addr: SocketAddr,
    handler: Router,
    resources: ResourceSet,
    span: Span,
}

impl Server {
    pub(crate) fn new(
        listener: TcpListener,
        local_addr: SocketAddr,
        handler: Router,
        resources: ResourceSet,
        span: Span,
    ) -> Self {
        Self {
            listener,
            local_addr,
            handler,
            resources,
            span,
        }
    }

    /// The address the listener is actually bound to (resolves port `0`).
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Shared view of the teardown records.
    pub fn ledger(&self) -> ReleaseLedger {
        self.resources.ledger()
    }

    /// Serve until `shutdown` resolves or the listener fails, then tear down.
    ///
    /// Returns `Ok(())` for a clean shutdown, or the listener error that
    /// ended the serve loop. Resources are released before this returns.
    pub async fn run_until_stopped<F>(self, shutdown: F) -> Result<(), ApplicationError>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let Server {
            listener,
            local_addr,
            handler,
            resources,
            span,
        } = self;

        async move {
            tracing::info!(address = %local_addr, "HTTP server starting");

            let (listener, listener_failed) = MonitoredListener::new(listener);
            let (failure_tx, mut failure_rx) = oneshot::channel();
            let stop = async move {
                tokio::select! {
                    _ = shutdown => {}
                    Ok(e) = listener_failed => {
                        let _ = failure_tx.send(e);
                    }
                }
            };

            let serving = axum::serve(listener, handler)
                .with_graceful_shutdown(stop)
                .into_future();
            let outcome = AssertUnwindSafe(serving).catch_unwind().await;

            tracing::info!("HTTP server stopped, releasing resources");
            resources.close().await;

            match outcome {
                Ok(Ok(())) => match failure_rx.try_recv() {
                    Ok(e) => {
                        tracing::error!(error = %e, "Serve loop ended by listener failure");
                        Err(ServeError(e).into())
                    }
                    Err(_) => {
                        tracing::info!("Shutdown complete");
                        Ok(())
                    }
                },
                Ok(Err(e)) => {
                    tracing::error!(error = %e, "Serve loop failed");
                    Err(ServeError(e).into())
                }
                Err(panic) => std::panic::resume_unwind(panic),
            }
        }
        .instrument(span)
        .await
    }
}

impl std::fmt::Debug for Server {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Server")
            .field("local_addr", &self.local_addr)
            .field("resources", &self.resources)
            .finish()
    }
}
