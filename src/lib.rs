//! Web server application lifecycle library.
//!
//! Assembles a running service from [`Settings`]: provisions the backend
//! resources, builds the request handler, serves it, and releases every
//! resource exactly once when serving ends.

pub mod application;
pub mod config;
pub mod http;
pub mod lifecycle;
pub mod observability;
pub mod resources;
pub mod routes;

pub use application::{Application, ApplicationError};
pub use config::Settings;
pub use lifecycle::Shutdown;
pub use resources::{BackendKind, ProvisioningError, ResourceSet};
