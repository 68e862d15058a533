use std::collections::VecDeque;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::domain::RefreshPass;
use crate::infrastructure::config::RefreshSettings;

/// Number of passes included in [`RefreshStats::recent_refreshes`].
pub const RECENT_REFRESHES: usize = 10;

/// Read-only summary of a coordinator for presentation.
#[derive(Debug, Clone, Serialize)]
pub struct RefreshStats {
    pub total_refreshes: usize,
    pub successful_refreshes: usize,
    /// Percent of passes that succeeded, one decimal. Zero with no history.
    pub success_rate: f64,
    pub average_duration_ms: u64,
    pub last_refresh_at: Option<DateTime<Utc>>,
    pub is_refreshing: bool,
    pub auto_refresh_enabled: bool,
    pub auto_refresh_interval_ms: Option<u64>,
    pub subscriber_count: usize,
    /// Newest first.
    pub recent_refreshes: Vec<RefreshPass>,
    pub settings: RefreshSettings,
}

/// The history-derived part of [`RefreshStats`].
#[derive(Debug, Clone, PartialEq)]
pub(super) struct HistorySummary {
    pub(super) total: usize,
    pub(super) successful: usize,
    pub(super) success_rate: f64,
    pub(super) average_duration_ms: u64,
    pub(super) recent: Vec<RefreshPass>,
}

pub(super) fn summarize(history: &VecDeque<RefreshPass>) -> HistorySummary {
    let total = history.len();
    let successful = history.iter().filter(|p| p.success).count();

    let (success_rate, average_duration_ms) = if total == 0 {
        (0.0, 0)
    } else {
        let rate = (successful as f64 / total as f64 * 1000.0).round() / 10.0;
        let sum: u64 = history.iter().map(|p| p.total_duration_ms).sum();
        (rate, sum / total as u64)
    };

    HistorySummary {
        total,
        successful,
        success_rate,
        average_duration_ms,
        recent: history.iter().rev().take(RECENT_REFRESHES).cloned().collect(),
    }
}
