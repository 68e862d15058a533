//! Global refresh coordination.
//!
//! [`RefreshCoordinator`] runs *passes*: one sweep over every enabled
//! component in the registry, executed by a bounded worker pool in priority
//! order. It also owns the optional auto-refresh timer and a bounded history
//! of finished passes.
//!
//! # Concurrency
//!
//! At most one pass runs at a time unless a caller forces a second one. The
//! guard is taken when [`trigger_global_refresh`] is *called*, not when its
//! future is first polled, so two back-to-back calls always see each other.
//! Each provider call runs on its own task and is raced against the per-task
//! timeout; a call that loses the race is left running, its result is
//! discarded, and it is aborted on [`destroy`].
//!
//! [`trigger_global_refresh`]: RefreshCoordinator::trigger_global_refresh
//! [`destroy`]: RefreshCoordinator::destroy

use std::future::Future;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info, warn};

use crate::domain::{
    ComponentId, ComponentStatus, RefreshOptions, RefreshOutcome, RefreshPass, SkipReason,
    SubscribeOptions,
};
use crate::infrastructure::config::RefreshSettings;
use crate::infrastructure::registry::ComponentRegistry;
use crate::port::SharedProvider;

mod auto;
mod pass;
mod state;
mod stats;

use state::{CoordinatorState, InFlightGuard};
pub use stats::{RefreshStats, RECENT_REFRESHES};

/// Schedules global refresh passes over a [`ComponentRegistry`].
///
/// Cheap to clone; clones share the same registry, history, and timer.
#[derive(Clone)]
pub struct RefreshCoordinator {
    state: Arc<CoordinatorState>,
}

impl RefreshCoordinator {
    #[must_use]
    pub fn new(registry: Arc<ComponentRegistry>, settings: RefreshSettings) -> Self {
        Self::from_state(Arc::new(CoordinatorState::new(registry, settings)))
    }

    fn from_state(state: Arc<CoordinatorState>) -> Self {
        Self { state }
    }

    #[must_use]
    pub fn registry(&self) -> &Arc<ComponentRegistry> {
        &self.state.registry
    }

    #[must_use]
    pub fn settings(&self) -> &RefreshSettings {
        &self.state.settings
    }

    /// Register or replace a component's provider.
    pub fn subscribe(
        &self,
        id: impl Into<ComponentId>,
        provider: SharedProvider,
        options: SubscribeOptions,
    ) {
        self.state.registry.subscribe(id, provider, options);
    }

    pub fn unsubscribe(&self, id: &ComponentId) -> bool {
        self.state.registry.unsubscribe(id)
    }

    /// Include or exclude a component from future passes.
    pub fn set_component_enabled(&self, id: &ComponentId, enabled: bool) -> bool {
        self.state.registry.set_enabled(id, enabled)
    }

    /// Start a global refresh pass.
    ///
    /// The in-flight guard is taken before this returns. If a pass is already
    /// running and `options.force` is false, the returned future resolves to
    /// [`RefreshOutcome::Skipped`] without touching any provider. A forced
    /// pass runs alongside the current one and keeps the guard held until it
    /// finishes too.
    ///
    /// The future is `'static` and can be spawned. Dropping it releases the
    /// guard.
    pub fn trigger_global_refresh(
        &self,
        options: RefreshOptions,
    ) -> impl Future<Output = RefreshOutcome> + Send + 'static {
        let guard = InFlightGuard::acquire(&self.state, options.force);
        if guard.is_none() {
            debug!(source = %options.source, "Refresh already in progress, skipping");
        }
        let state = Arc::clone(&self.state);

        async move {
            let Some(guard) = guard else {
                return RefreshOutcome::Skipped {
                    reason: SkipReason::AlreadyRefreshing,
                };
            };
            let pass = pass::run(state, options).await;
            drop(guard);
            RefreshOutcome::Completed(pass)
        }
    }

    /// Whether any pass is currently running.
    #[must_use]
    pub fn is_refreshing(&self) -> bool {
        self.state.in_flight.load(Ordering::SeqCst) > 0
    }

    /// Start, restart, or stop the auto-refresh timer.
    ///
    /// `interval` falls back to the configured default. Any running timer is
    /// stopped before a new one starts, so at most one is ever live. Must be
    /// called from within a tokio runtime to start a timer; outside one the
    /// request is logged and auto-refresh stays off.
    pub fn set_auto_refresh(&self, enabled: bool, interval: Option<Duration>) {
        let mut auto = self.state.auto.lock();
        let was_running = auto.stop();

        if !enabled {
            if was_running {
                info!("Auto refresh stopped");
            }
            return;
        }
        if self.state.is_destroyed() {
            warn!("Auto refresh requested on a destroyed coordinator");
            return;
        }

        let period = match interval {
            Some(period) if !period.is_zero() => period,
            Some(_) => {
                warn!("Zero auto refresh interval, using configured default");
                self.state.settings.auto_refresh_interval()
            }
            None => self.state.settings.auto_refresh_interval(),
        };

        if tokio::runtime::Handle::try_current().is_err() {
            warn!("Auto refresh needs a tokio runtime, leaving it off");
            return;
        }

        auto.handle = Some(auto::spawn_timer(Arc::downgrade(&self.state), period));
        auto.interval = Some(period);
        info!(interval_ms = period.as_millis() as u64, "Auto refresh started");
    }

    /// Current auto-refresh period, if the timer is running.
    #[must_use]
    pub fn auto_refresh_interval(&self) -> Option<Duration> {
        self.state.auto.lock().interval
    }

    /// Snapshot of pass history and coordinator state.
    #[must_use]
    pub fn refresh_stats(&self) -> RefreshStats {
        let summary = stats::summarize(&self.state.history.lock());
        let interval = self.auto_refresh_interval();

        RefreshStats {
            total_refreshes: summary.total,
            successful_refreshes: summary.successful,
            success_rate: summary.success_rate,
            average_duration_ms: summary.average_duration_ms,
            last_refresh_at: *self.state.last_refresh_at.lock(),
            is_refreshing: self.is_refreshing(),
            auto_refresh_enabled: interval.is_some(),
            auto_refresh_interval_ms: interval.map(|d| d.as_millis() as u64),
            subscriber_count: self.state.registry.len(),
            recent_refreshes: summary.recent,
            settings: self.state.settings.clone(),
        }
    }

    /// Per-component status, priority order.
    #[must_use]
    pub fn component_statuses(&self) -> Vec<ComponentStatus> {
        self.state.registry.statuses()
    }

    /// Finished passes, oldest first.
    #[must_use]
    pub fn history(&self) -> Vec<RefreshPass> {
        self.state.history.lock().iter().cloned().collect()
    }

    /// Forget pass history and the last refresh time. The registry is kept.
    pub fn reset_stats(&self) {
        self.state.history.lock().clear();
        *self.state.last_refresh_at.lock() = None;
        debug!("Refresh stats reset");
    }

    /// Tear the coordinator down.
    ///
    /// Stops the auto-refresh timer, aborts timed-out calls that are still
    /// running, and clears the registry and history. Passes already running
    /// launch nothing further. Not reversible.
    pub fn destroy(&self) {
        self.state.destroyed.store(true, Ordering::SeqCst);
        self.state.auto.lock().stop();
        let aborted = self.state.orphans.abort_all();
        self.state.registry.clear();
        self.state.history.lock().clear();
        *self.state.last_refresh_at.lock() = None;
        info!(aborted, "Refresh coordinator destroyed");
    }

    #[must_use]
    pub fn is_destroyed(&self) -> bool {
        self.state.is_destroyed()
    }

    /// Make the next pass fail internally, as a bug in the pass body would.
    #[cfg(test)]
    pub(crate) fn inject_pass_fault(&self) {
        self.state.fail_next_pass.store(true, Ordering::SeqCst);
    }
}

impl std::fmt::Debug for RefreshCoordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RefreshCoordinator")
            .field("components", &self.state.registry.len())
            .field("is_refreshing", &self.is_refreshing())
            .field("auto_refresh_interval", &self.auto_refresh_interval())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests;
