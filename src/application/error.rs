//! Lifecycle error taxonomy.
//!
//! All three errors propagate to the caller unchanged; teardown has already
//! run by the time any of them is returned from `start`.

use thiserror::Error;

use crate::resources::ProvisioningError;

/// The listener could not be bound (address in use, permission denied, invalid address).
#[derive(Debug, Error)]
#[error("failed to bind {address}: {source}")]
pub struct BindError {
    pub address: String,
    #[source]
    pub source: std::io::Error,
}

/// The serve loop ended because the transport failed.
#[derive(Debug, Error)]
#[error("server error: {0}")]
pub struct ServeError(#[from] pub std::io::Error);

/// Any error that ends the application's lifecycle.
#[derive(Debug, Error)]
pub enum ApplicationError {
    #[error(transparent)]
    Provisioning(#[from] ProvisioningError),

    #[error(transparent)]
    Bind(#[from] BindError),

    #[error(transparent)]
    Serve(#[from] ServeError),
}
