//! Listener wrapper for the serve loop.
//!
//! `axum::serve` logs accept errors and retries them forever. This wrapper
//! skips per-connection errors the same way, but reports any other accept
//! error once so the server can stop and hand the error back to its caller.

use std::io;
use std::net::SocketAddr;

use axum::serve::Listener;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::oneshot;

/// A [`TcpListener`] that reports its first fatal accept error.
pub(crate) struct MonitoredListener {
    inner: TcpListener,
    failure: Option<oneshot::Sender<io::Error>>,
}

impl MonitoredListener {
    /// Wrap `inner`; the receiver yields the error that broke the listener.
    pub(crate) fn new(inner: TcpListener) -> (Self, oneshot::Receiver<io::Error>) {
        let (tx, rx) = oneshot::channel();
        (
            Self {
                inner,
                failure: Some(tx),
            },
            rx,
        )
    }
}

impl Listener for MonitoredListener {
    type Io = TcpStream;
    type Addr = SocketAddr;

    async fn accept(&mut self) -> (Self::Io, Self::Addr) {
        loop {
            match self.inner.accept().await {
                Ok(connection) => return connection,
                Err(e) if is_connection_error(&e) => {
                    tracing::debug!(error = %e, "Connection dropped before accept");
                }
                Err(e) => {
                    tracing::error!(error = %e, "Listener failed");
                    if let Some(failure) = self.failure.take() {
                        let _ = failure.send(e);
                    }
                    // Parked until the serve loop stops accepting.
                    std::future::pending::<()>().await;
                }
            }
        }
    }

    fn local_addr(&self) -> io::Result<Self::Addr> {
        self.inner.local_addr()
    }
}

/// Errors scoped to a single incoming connection; the listener itself is fine.
fn is_connection_error(e: &io::Error) -> bool {
    matches!(
        e.kind(),
        io::ErrorKind::ConnectionRefused
            | io::ErrorKind::ConnectionAborted
            | io::ErrorKind::ConnectionReset
    )
}
