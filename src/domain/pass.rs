//! Refresh pass records produced by the coordinator.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::id::{ComponentId, PassId};

/// What asked for a refresh pass.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum RefreshSource {
    /// Explicit user request (e.g. the global refresh button).
    #[default]
    Manual,
    /// The periodic auto-refresh timer.
    Auto,
    /// A cascade wave of an operation.
    Operation {
        operation_type: String,
        wave: String,
    },
    /// A server-initiated push message.
    WebsocketBroadcast,
}

impl fmt::Display for RefreshSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Manual => f.write_str("manual"),
            Self::Auto => f.write_str("auto"),
            Self::Operation {
                operation_type,
                wave,
            } => write!(f, "operation:{operation_type}:{wave}"),
            Self::WebsocketBroadcast => f.write_str("websocket-broadcast"),
        }
    }
}

/// Options for one call to trigger a global refresh.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RefreshOptions {
    /// Start a second, independent pass even if one is in flight.
    pub force: bool,
    pub source: RefreshSource,
    /// Suppress user-facing notifications in the UI layer only.
    pub silent: bool,
}

impl RefreshOptions {
    #[must_use]
    pub fn from_source(source: RefreshSource) -> Self {
        Self {
            source,
            ..Self::default()
        }
    }

    #[must_use]
    pub const fn forced(mut self) -> Self {
        self.force = true;
        self
    }

    #[must_use]
    pub const fn silent(mut self) -> Self {
        self.silent = true;
        self
    }
}

/// A component that refreshed successfully within a pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ComponentRefreshed {
    pub component_id: ComponentId,
    pub duration_ms: u64,
    pub timestamp: DateTime<Utc>,
}

/// How a component refresh failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// Exceeded the per-task timeout; any late result is discarded.
    Timeout,
    /// The provider returned an error or panicked.
    Failure,
}

/// A component that failed within a pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ComponentFailed {
    pub component_id: ComponentId,
    pub kind: FailureKind,
    pub error_message: String,
    pub duration_ms: u64,
    pub retry_count_at_failure: u32,
    pub timestamp: DateTime<Utc>,
}

/// One full-registry refresh. Immutable once built.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RefreshPass {
    pub id: PassId,
    pub source: RefreshSource,
    pub silent: bool,
    /// Whether the UI layer should surface a notification for this pass.
    pub notify: bool,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub results: Vec<ComponentRefreshed>,
    pub errors: Vec<ComponentFailed>,
    pub total_duration_ms: u64,
    pub success: bool,
    /// Set when the coordinator's own bookkeeping failed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub global_error: Option<String>,
}

impl RefreshPass {
    /// Number of components that were launched in this pass.
    #[must_use]
    pub fn component_count(&self) -> usize {
        self.results.len() + self.errors.len()
    }
}

/// Why a trigger did no work.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    AlreadyRefreshing,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AlreadyRefreshing => f.write_str("already_refreshing"),
        }
    }
}

/// Result of a global refresh trigger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum RefreshOutcome {
    Completed(RefreshPass),
    Skipped { reason: SkipReason },
}

impl RefreshOutcome {
    /// True only for a completed pass with no component errors.
    #[must_use]
    pub fn success(&self) -> bool {
        match self {
            Self::Completed(pass) => pass.success,
            Self::Skipped { .. } => false,
        }
    }

    #[must_use]
    pub fn reason(&self) -> Option<SkipReason> {
        match self {
            Self::Completed(_) => None,
            Self::Skipped { reason } => Some(*reason),
        }
    }

    #[must_use]
    pub fn pass(&self) -> Option<&RefreshPass> {
        match self {
            Self::Completed(pass) => Some(pass),
            Self::Skipped { .. } => None,
        }
    }

    #[must_use]
    pub fn into_pass(self) -> Option<RefreshPass> {
        match self {
            Self::Completed(pass) => Some(pass),
            Self::Skipped { .. } => None,
        }
    }

    #[must_use]
    pub const fn is_skipped(&self) -> bool {
        matches!(self, Self::Skipped { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn skipped_outcome_serializes_original_shape() {
        let outcome = RefreshOutcome::Skipped {
            reason: SkipReason::AlreadyRefreshing,
        };
        let json = serde_json::to_value(&outcome).unwrap();
        assert_eq!(json["reason"], "already_refreshing");
        assert!(!outcome.success());
        assert_eq!(outcome.reason(), Some(SkipReason::AlreadyRefreshing));
    }

    #[test]
    fn source_display_is_stable() {
        assert_eq!(RefreshSource::Auto.to_string(), "auto");
        assert_eq!(
            RefreshSource::WebsocketBroadcast.to_string(),
            "websocket-broadcast"
        );
        let op = RefreshSource::Operation {
            operation_type: "model-deploy".into(),
            wave: "immediate".into(),
        };
        assert_eq!(op.to_string(), "operation:model-deploy:immediate");
    }

    #[test]
    fn options_builders_compose() {
        let opts = RefreshOptions::from_source(RefreshSource::WebsocketBroadcast)
            .silent()
            .forced();
        assert!(opts.force);
        assert!(opts.silent);
        assert_eq!(opts.source, RefreshSource::WebsocketBroadcast);
    }
}
