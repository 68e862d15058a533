//! Canonical test configurations.
//!
//! Single source of truth for config structs used across tests.
//! Avoids each test module defining its own slightly-different defaults.

use std::collections::BTreeMap;
use std::time::Duration;

use crate::domain::{CascadeConfig, CascadePlan, ComponentRef, DelayedWave};
use crate::infrastructure::config::RefreshSettings;

/// Per-task timeout used by [`refresh`]. Short enough for paused-clock tests
/// to reason about, long enough that scripted delays in the tens of
/// milliseconds never trip it.
pub const TEST_TIMEOUT: Duration = Duration::from_millis(1_000);

/// Refresh settings with a 1s timeout, notifications on, and everything else
/// at production defaults.
pub fn refresh() -> RefreshSettings {
    RefreshSettings {
        auto_refresh_enabled: false,
        auto_refresh_interval_ms: 60_000,
        max_concurrent_refresh: 5,
        refresh_timeout_ms: TEST_TIMEOUT.as_millis() as u64,
        max_history: 100,
        operation_retention_secs: 300,
        show_notifications: Some(true),
    }
}

/// Refresh settings with a specific worker-pool width.
pub fn refresh_with_concurrency(max_concurrent_refresh: usize) -> RefreshSettings {
    RefreshSettings {
        max_concurrent_refresh,
        ..refresh()
    }
}

fn refs(ids: &[&str]) -> Vec<ComponentRef> {
    ids.iter().map(|id| ComponentRef::from(*id)).collect()
}

/// A delayed wave over `ids`. `"all"` becomes [`ComponentRef::All`].
pub fn wave(ids: &[&str], delay_ms: u64) -> DelayedWave {
    DelayedWave::new(refs(ids), Duration::from_millis(delay_ms))
}

/// A plan with the given immediate ids and delayed waves.
pub fn plan(immediate: &[&str], delayed: Vec<DelayedWave>) -> CascadePlan {
    CascadePlan::new(refs(immediate), delayed)
}

/// Cascade config holding the given plans.
pub fn cascade(plans: Vec<(&str, CascadePlan)>) -> CascadeConfig {
    CascadeConfig::new(
        plans
            .into_iter()
            .map(|(op, plan)| (op.to_string(), plan))
            .collect::<BTreeMap<_, _>>(),
    )
}
