use std::sync::Weak;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::debug;

use crate::domain::{RefreshOptions, RefreshSource};

use super::state::CoordinatorState;
use super::RefreshCoordinator;

/// Spawn the periodic auto-refresh task.
///
/// Holds only a weak reference, so a dropped coordinator ends the task on the
/// next tick. Each tick launches a pass on its own task; a tick that lands
/// while a pass is still running collapses into an `already_refreshing` skip
/// through the in-flight guard.
pub(super) fn spawn_timer(state: Weak<CoordinatorState>, period: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = interval_at(Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            ticker.tick().await;
            let Some(state) = state.upgrade() else {
                break;
            };
            if state.is_destroyed() {
                break;
            }

            let coordinator = RefreshCoordinator::from_state(state);
            let pass = coordinator.trigger_global_refresh(RefreshOptions::from_source(
                RefreshSource::Auto,
            ));
            tokio::spawn(async move {
                if let Some(reason) = pass.await.reason() {
                    debug!(%reason, "Auto refresh tick skipped");
                }
            });
        }
    })
}
