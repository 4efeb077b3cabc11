//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! configuration/base.toml
//!     + configuration/<environment>.toml
//!     + APP__SECTION__KEY environment overrides
//!     → loader.rs (merge & deserialize)
//!     → validation.rs (semantic checks)
//!     → Settings (validated, immutable)
//!     → read once by Application::build
//! ```
//!
//! # Design Decisions
//! - Settings are immutable once loaded; there is no hot reload
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_settings, ConfigError, Environment};
pub use schema::{
    ApplicationSettings, DatabaseSettings, LifecycleSettings, LogFormat, QueueSettings,
    SearchSettings, Settings, TelemetrySettings,
};
