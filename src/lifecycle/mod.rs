//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Build (application/mod.rs):
//!     Settings → Provision resources → Build handler → Application
//!
//! Serve (http/server.rs):
//!     Bind listener → Serve until shutdown future resolves → Teardown
//!
//! Signals (signals.rs):
//!     SIGTERM/SIGINT → Shutdown::trigger
//!     Second SIGTERM/SIGINT → Forced exit
//! ```
//!
//! # Design Decisions
//! - Ordered startup: config first, then resources, then listener
//! - Ordered shutdown: stop accepting, drain requests, release resources
//! - Each resource release has a deadline; teardown never hangs

pub mod shutdown;
pub mod signals;

pub use shutdown::Shutdown;
pub use signals::{forward_signals, shutdown_signal};
