//! Running one provider call under a timeout.
//!
//! Shared by the coordinator's worker pool and the cascade scheduler's
//! targeted waves. Each call is spawned as its own tokio task so that a
//! panicking provider surfaces as a [`JoinError`](tokio::task::JoinError)
//! instead of unwinding through the caller, and so that a timed-out call can
//! be left running without being polled by anyone.

use std::any::Any;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::debug;

use crate::domain::ComponentId;
use crate::error::RefreshError;
use crate::port::{ProviderResult, SharedProvider};

/// How one provider call settled.
#[derive(Debug)]
pub(crate) enum TaskOutcome {
    Succeeded,
    /// The provider returned an error.
    Failed(RefreshError),
    /// The provider panicked.
    Panicked(RefreshError),
    /// The timeout elapsed first. The handle still owns the running call.
    TimedOut(RefreshError, JoinHandle<ProviderResult>),
}

/// Spawn `provider.refresh()` and wait for it for at most `timeout`.
pub(crate) async fn run_provider(
    component_id: &ComponentId,
    provider: SharedProvider,
    timeout: Duration,
) -> TaskOutcome {
    let mut handle = tokio::spawn(async move { provider.refresh().await });

    match tokio::time::timeout(timeout, &mut handle).await {
        Ok(Ok(Ok(()))) => TaskOutcome::Succeeded,
        Ok(Ok(Err(e))) => TaskOutcome::Failed(RefreshError::ComponentFailure {
            component_id: component_id.to_string(),
            message: format!("{e:#}"),
        }),
        Ok(Err(join_err)) if join_err.is_panic() => {
            let payload = join_err.into_panic();
            TaskOutcome::Panicked(RefreshError::ComponentFailure {
                component_id: component_id.to_string(),
                message: format!("provider panicked: {}", panic_message(payload.as_ref())),
            })
        }
        Ok(Err(_cancelled)) => TaskOutcome::Failed(RefreshError::ComponentFailure {
            component_id: component_id.to_string(),
            message: "provider task was cancelled".to_string(),
        }),
        Err(_elapsed) => TaskOutcome::TimedOut(
            RefreshError::ComponentTimeout {
                component_id: component_id.to_string(),
                timeout_ms: u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX),
            },
            handle,
        ),
    }
}

/// Best-effort text of a panic payload.
pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_string()
    }
}

/// Milliseconds since `started`, saturating.
pub(crate) fn elapsed_ms(started: Instant) -> u64 {
    u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX)
}

/// Provider calls that outlived their timeout.
///
/// Their results are discarded when they settle. Finished handles are pruned
/// on every insert; whatever is still running is aborted by [`abort_all`].
///
/// [`abort_all`]: OrphanTasks::abort_all
#[derive(Debug, Default)]
pub(crate) struct OrphanTasks {
    handles: Mutex<Vec<JoinHandle<ProviderResult>>>,
}

impl OrphanTasks {
    pub(crate) fn adopt(&self, component_id: &ComponentId, handle: JoinHandle<ProviderResult>) {
        let mut handles = self.handles.lock();
        handles.retain(|h| !h.is_finished());
        handles.push(handle);
        debug!(
            component_id = %component_id,
            orphans = handles.len(),
            "Timed-out call left running"
        );
    }

    pub(crate) fn abort_all(&self) -> usize {
        let handles: Vec<_> = self.handles.lock().drain(..).collect();
        let count = handles.len();
        for handle in handles {
            handle.abort();
        }
        count
    }

    pub(crate) fn len(&self) -> usize {
        let mut handles = self.handles.lock();
        handles.retain(|h| !h.is_finished());
        handles.len()
    }
}
