//! Application configuration loading and validation.
//!
//! Provides the main [`Config`] struct that aggregates all settings. The
//! configuration is loaded from a TOML file once at startup; the
//! `HYPERDASH_ENV` environment variable overrides `environment`.
//!
//! # Example
//!
//! ```no_run
//! use hyperdash::infrastructure::config::settings::Config;
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = Config::load("hyperdash.toml")?;
//!     config.init_logging();
//!     Ok(())
//! }
//! ```

use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;

use serde::{Deserialize, Serialize};

use super::cascade::{default_operations, resolve_operations, PlanConfig};
use super::logging::LoggingConfig;
use super::priority::PriorityTable;
use super::refresh::RefreshSettings;
use crate::domain::CascadeConfig;
use crate::error::{ConfigError, Result};

/// Environment variable consulted for the deployment environment.
pub const ENV_VAR: &str = "HYPERDASH_ENV";

/// Deployment environment.
///
/// Picks defaults that differ between local development and production,
/// such as whether refresh notifications are shown.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    #[default]
    Development,
    Production,
}

impl Environment {
    /// Parse an environment name, case-insensitively.
    #[must_use]
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "development" | "dev" => Some(Self::Development),
            "production" | "prod" => Some(Self::Production),
            _ => None,
        }
    }

    #[must_use]
    pub const fn default_show_notifications(self) -> bool {
        matches!(self, Self::Development)
    }
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Development => f.write_str("development"),
            Self::Production => f.write_str("production"),
        }
    }
}

fn default_operation_configs() -> BTreeMap<String, PlanConfig> {
    default_operations()
}

/// Main application configuration.
///
/// Load from a TOML file using [`Config::load`] or parse directly with
/// [`Config::parse_toml`].
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Deployment environment. Defaults to development.
    #[serde(default)]
    pub environment: Environment,

    /// Logging and tracing configuration.
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Refresh pass and operation settings.
    #[serde(default)]
    pub refresh: RefreshSettings,

    /// Default component priorities and the catalog of known components.
    ///
    /// Replaces the built-in table entirely when present.
    #[serde(default)]
    pub priorities: PriorityTable,

    /// Cascade plans keyed by operation type, as written.
    ///
    /// Replaces the built-in plans entirely when present.
    #[serde(default = "default_operation_configs")]
    pub operations: BTreeMap<String, PlanConfig>,

    #[serde(skip)]
    cascade: CascadeConfig,
}

impl Default for Config {
    fn default() -> Self {
        let priorities = PriorityTable::default();
        let operations = default_operations();
        let cascade = resolve_operations(&operations, &priorities).unwrap_or_default();
        let environment = Environment::default();
        let mut refresh = RefreshSettings::default();
        refresh.show_notifications = Some(environment.default_show_notifications());
        Self {
            environment,
            logging: LoggingConfig::default(),
            refresh,
            priorities,
            operations,
            cascade,
        }
    }
}

impl Config {
    /// Parse configuration from TOML content.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The TOML content is malformed
    /// - Validation fails (e.g., zero timeout, negative delay)
    /// - A cascade plan references a component missing from `[priorities]`
    pub fn parse_toml(content: &str) -> Result<Self> {
        let mut config: Self = toml::from_str(content).map_err(ConfigError::Parse)?;

        if let Ok(raw) = std::env::var(ENV_VAR) {
            config.environment = Environment::parse(&raw).ok_or(ConfigError::InvalidValue {
                field: ENV_VAR,
                reason: format!("unknown environment '{raw}'"),
            })?;
        }
        if config.refresh.show_notifications.is_none() {
            config.refresh.show_notifications =
                Some(config.environment.default_show_notifications());
        }

        config.validate()?;
        config.cascade = resolve_operations(&config.operations, &config.priorities)?;

        Ok(config)
    }

    /// Load configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The file cannot be read
    /// - The TOML content is malformed
    /// - Validation fails
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(ConfigError::ReadFile)?;
        Self::parse_toml(&content)
    }

    /// Initialize tracing from the `[logging]` section.
    pub fn init_logging(&self) {
        self.logging.init();
    }

    /// Resolved cascade plans.
    #[must_use]
    pub const fn cascade(&self) -> &CascadeConfig {
        &self.cascade
    }

    /// Validate configuration values.
    ///
    /// Checks that all values are within acceptable ranges. Cascade plans
    /// are checked separately while they are resolved.
    fn validate(&self) -> Result<()> {
        let invalid = |field: &'static str, reason: &str| -> crate::error::Error {
            ConfigError::InvalidValue {
                field,
                reason: reason.to_string(),
            }
            .into()
        };

        let refresh = &self.refresh;
        if refresh.auto_refresh_interval_ms == 0 {
            return Err(invalid("auto_refresh_interval_ms", "must be greater than 0"));
        }
        if refresh.max_concurrent_refresh == 0 {
            return Err(invalid("max_concurrent_refresh", "must be greater than 0"));
        }
        if refresh.refresh_timeout_ms == 0 {
            return Err(invalid("refresh_timeout_ms", "must be greater than 0"));
        }
        if refresh.max_history == 0 {
            return Err(invalid("max_history", "must be greater than 0"));
        }
        if self.logging.level.trim().is_empty() {
            return Err(ConfigError::MissingField { field: "level" }.into());
        }
        if !matches!(self.logging.format.as_str(), "pretty" | "json") {
            return Err(invalid("format", "must be \"pretty\" or \"json\""));
        }
        if self
            .priorities
            .ranked()
            .iter()
            .any(|(id, _)| id.trim().is_empty())
        {
            return Err(invalid("priorities", "component id cannot be empty"));
        }

        Ok(())
    }
}
