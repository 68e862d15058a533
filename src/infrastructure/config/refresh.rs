//! Refresh coordinator and cascade scheduler settings.

use std::time::Duration;

use serde::{Deserialize, Serialize};

const fn default_auto_refresh_interval_ms() -> u64 {
    60_000
}

const fn default_max_concurrent_refresh() -> usize {
    5
}

const fn default_refresh_timeout_ms() -> u64 {
    60_000
}

const fn default_max_history() -> usize {
    100
}

const fn default_operation_retention_secs() -> u64 {
    300
}

/// Tunables for refresh passes and operation bookkeeping.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RefreshSettings {
    /// Start the periodic auto-refresh timer at startup.
    ///
    /// Defaults to false; refreshes are on demand unless enabled.
    #[serde(default)]
    pub auto_refresh_enabled: bool,

    /// Auto-refresh cadence in milliseconds. Defaults to 60000.
    #[serde(default = "default_auto_refresh_interval_ms")]
    pub auto_refresh_interval_ms: u64,

    /// Upper bound on provider refreshes running at once within one pass.
    #[serde(default = "default_max_concurrent_refresh")]
    pub max_concurrent_refresh: usize,

    /// Per-provider timeout in milliseconds. Defaults to 60000.
    #[serde(default = "default_refresh_timeout_ms")]
    pub refresh_timeout_ms: u64,

    /// Refresh passes kept in history; the oldest are evicted.
    #[serde(default = "default_max_history")]
    pub max_history: usize,

    /// How long a finished operation stays visible. Defaults to 5 minutes.
    #[serde(default = "default_operation_retention_secs")]
    pub operation_retention_secs: u64,

    /// Whether the UI layer should surface refresh notifications.
    ///
    /// When unset, the environment decides: on in development, off in
    /// production.
    #[serde(default)]
    pub show_notifications: Option<bool>,
}

impl RefreshSettings {
    #[must_use]
    pub const fn auto_refresh_interval(&self) -> Duration {
        Duration::from_millis(self.auto_refresh_interval_ms)
    }

    #[must_use]
    pub const fn refresh_timeout(&self) -> Duration {
        Duration::from_millis(self.refresh_timeout_ms)
    }

    #[must_use]
    pub const fn operation_retention(&self) -> Duration {
        Duration::from_secs(self.operation_retention_secs)
    }

    #[must_use]
    pub fn notifications_enabled(&self) -> bool {
        self.show_notifications.unwrap_or(true)
    }
}

impl Default for RefreshSettings {
    fn default() -> Self {
        Self {
            auto_refresh_enabled: false,
            auto_refresh_interval_ms: default_auto_refresh_interval_ms(),
            max_concurrent_refresh: default_max_concurrent_refresh(),
            refresh_timeout_ms: default_refresh_timeout_ms(),
            max_history: default_max_history(),
            operation_retention_secs: default_operation_retention_secs(),
            show_notifications: None,
        }
    }
}
