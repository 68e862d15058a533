use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use tokio::task::JoinHandle;

use crate::domain::RefreshPass;
use crate::infrastructure::config::RefreshSettings;
use crate::infrastructure::registry::ComponentRegistry;
use crate::infrastructure::task::OrphanTasks;

/// The running auto-refresh timer, if any.
#[derive(Debug, Default)]
pub(super) struct AutoRefresh {
    pub(super) handle: Option<JoinHandle<()>>,
    pub(super) interval: Option<Duration>,
}

impl AutoRefresh {
    /// Abort the timer task, leaving auto-refresh off.
    pub(super) fn stop(&mut self) -> bool {
        self.interval = None;
        match self.handle.take() {
            Some(handle) => {
                handle.abort();
                true
            }
            None => false,
        }
    }
}

/// Everything a coordinator and its background tasks share.
pub(super) struct CoordinatorState {
    pub(super) registry: Arc<ComponentRegistry>,
    pub(super) settings: RefreshSettings,
    /// Live passes. Zero means idle.
    pub(super) in_flight: AtomicUsize,
    pub(super) history: Mutex<VecDeque<RefreshPass>>,
    pub(super) last_refresh_at: Mutex<Option<DateTime<Utc>>>,
    pub(super) auto: Mutex<AutoRefresh>,
    pub(super) orphans: OrphanTasks,
    pub(super) destroyed: AtomicBool,
    /// Makes the next pass body panic before it starts any provider.
    #[cfg(test)]
    pub(super) fail_next_pass: AtomicBool,
}

impl CoordinatorState {
    pub(super) fn new(registry: Arc<ComponentRegistry>, settings: RefreshSettings) -> Self {
        Self {
            registry,
            settings,
            in_flight: AtomicUsize::new(0),
            history: Mutex::new(VecDeque::new()),
            last_refresh_at: Mutex::new(None),
            auto: Mutex::new(AutoRefresh::default()),
            orphans: OrphanTasks::default(),
            destroyed: AtomicBool::new(false),
            #[cfg(test)]
            fail_next_pass: AtomicBool::new(false),
        }
    }

    pub(super) fn is_destroyed(&self) -> bool {
        self.destroyed.load(Ordering::SeqCst)
    }

    /// Append a finished pass, evicting the oldest beyond `max_history`.
    pub(super) fn record_pass(&self, pass: RefreshPass) {
        let cap = self.settings.max_history.max(1);
        let mut history = self.history.lock();
        history.push_back(pass);
        while history.len() > cap {
            history.pop_front();
        }
    }
}

/// Scoped hold on the in-flight counter. Released on drop, so every exit
/// path of a pass (including cancellation of its future) gives it back.
pub(super) struct InFlightGuard {
    state: Arc<CoordinatorState>,
}

impl InFlightGuard {
    /// Take the guard. Without `force` this fails while any pass is live.
    pub(super) fn acquire(state: &Arc<CoordinatorState>, force: bool) -> Option<Self> {
        if force {
            state.in_flight.fetch_add(1, Ordering::SeqCst);
        } else {
            state
                .in_flight
                .compare_exchange(0, 1, Ordering::SeqCst, Ordering::SeqCst)
                .ok()?;
        }
        Some(Self {
            state: Arc::clone(state),
        })
    }
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.state.in_flight.fetch_sub(1, Ordering::SeqCst);
    }
}
