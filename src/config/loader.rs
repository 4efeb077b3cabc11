//! Configuration loading from disk and environment.
//!
//! Settings are assembled from three layers, later layers winning:
//! 1. `<dir>/base.toml` (required)
//! 2. `<dir>/<environment>.toml` (optional)
//! 3. `APP__<SECTION>__<KEY>` environment variables

use std::path::Path;

use crate::config::schema::Settings;
use crate::config::validation::{validate_settings, ValidationError};

/// Prefix of environment variables that override file settings.
pub const ENV_OVERRIDE_PREFIX: &str = "APP";

/// Separates the prefix, sections and keys of an override variable.
pub const ENV_OVERRIDE_SEPARATOR: &str = "__";

/// Variable selecting the environment-specific file.
pub const ENVIRONMENT_VAR: &str = "APP_ENVIRONMENT";

/// Error type for configuration loading.
#[derive(Debug)]
pub enum ConfigError {
    Load(::config::ConfigError),
    Environment(String),
    Validation(Vec<ValidationError>),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::Load(e) => write!(f, "Failed to load configuration: {}", e),
            ConfigError::Environment(e) => write!(f, "Environment error: {}", e),
            ConfigError::Validation(errors) => {
                write!(f, "Validation failed: ")?;
                for (i, err) in errors.iter().enumerate() {
                    if i > 0 { write!(f, ", ")?; }
                    write!(f, "{}", err)?;
                }
                Ok(())
            }
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::Load(e) => Some(e),
            _ => None,
        }
    }
}

impl From<::config::ConfigError> for ConfigError {
    fn from(e: ::config::ConfigError) -> Self {
        ConfigError::Load(e)
    }
}

/// Deployment environment, selecting `<environment>.toml`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Environment {
    Local,
    Production,
}

impl Environment {
    pub fn as_str(&self) -> &'static str {
        match self {
            Environment::Local => "local",
            Environment::Production => "production",
        }
    }

    /// Read the environment from `APP_ENVIRONMENT`, defaulting to `local`.
    pub fn from_env() -> Result<Self, ConfigError> {
        match std::env::var(ENVIRONMENT_VAR) {
            Ok(value) => value.parse(),
            Err(_) => Ok(Environment::Local),
        }
    }
}

impl std::str::FromStr for Environment {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.to_lowercase().as_str() {
            "local" => Ok(Environment::Local),
            "production" => Ok(Environment::Production),
            other => Err(ConfigError::Environment(format!(
                "{} is not a supported environment. Use either `local` or `production`.",
                other
            ))),
        }
    }
}

/// Load, merge and validate settings using the process environment for overrides.
pub fn load_settings(dir: &Path, environment: Environment) -> Result<Settings, ConfigError> {
    load_settings_with(dir, environment, std::env::vars())
}

/// Load, merge and validate settings with an explicit set of override variables.
pub fn load_settings_with<I>(
    dir: &Path,
    environment: Environment,
    vars: I,
) -> Result<Settings, ConfigError>
where
    I: IntoIterator<Item = (String, String)>,
{
    let overrides: ::config::Map<String, String> = vars.into_iter().collect();

    let settings: Settings = ::config::Config::builder()
        .add_source(::config::File::from(dir.join("base")).required(true))
        .add_source(::config::File::from(dir.join(environment.as_str())).required(false))
        .add_source(
            ::config::Environment::with_prefix(ENV_OVERRIDE_PREFIX)
                .prefix_separator(ENV_OVERRIDE_SEPARATOR)
                .separator(ENV_OVERRIDE_SEPARATOR)
                .source(Some(overrides)),
        )
        .build()?
        .try_deserialize()?;

    validate_settings(&settings).map_err(ConfigError::Validation)?;

    tracing::debug!(environment = environment.as_str(), "Configuration loaded");
    Ok(settings)
}
