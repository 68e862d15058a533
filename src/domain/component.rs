//! Component-facing value types.

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::id::ComponentId;

/// Options accepted when subscribing a component.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubscribeOptions {
    /// Explicit priority; falls back to the priority table, then 0.
    pub priority: Option<i32>,
    pub enabled: bool,
}

impl Default for SubscribeOptions {
    fn default() -> Self {
        Self {
            priority: None,
            enabled: true,
        }
    }
}

impl SubscribeOptions {
    #[must_use]
    pub const fn with_priority(priority: i32) -> Self {
        Self {
            priority: Some(priority),
            enabled: true,
        }
    }

    #[must_use]
    pub const fn disabled(mut self) -> Self {
        self.enabled = false;
        self
    }
}

/// Read-only view of one registered component.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ComponentStatus {
    pub id: ComponentId,
    pub enabled: bool,
    pub priority: i32,
    pub last_refresh_at: Option<DateTime<Utc>>,
    pub retry_count: u32,
}
