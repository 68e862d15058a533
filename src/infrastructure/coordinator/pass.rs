use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use futures_util::{stream, FutureExt, StreamExt};
use parking_lot::Mutex;
use tokio::time::Instant;
use tracing::{debug, error, info, warn};

use crate::domain::{
    ComponentFailed, ComponentRefreshed, FailureKind, PassId, RefreshOptions, RefreshPass,
};
use crate::error::RefreshError;
use crate::infrastructure::registry::ComponentRecord;
use crate::infrastructure::task::{elapsed_ms, panic_message, run_provider, TaskOutcome};

use super::state::CoordinatorState;

/// Outcomes collected while a pass runs. Kept outside the guarded body so
/// that whatever settled before an internal panic is still reported.
#[derive(Default)]
struct PassLog {
    results: Vec<ComponentRefreshed>,
    errors: Vec<ComponentFailed>,
}

enum ComponentOutcome {
    Refreshed(ComponentRefreshed),
    Failed(ComponentFailed),
}

/// Run one full pass over the enabled components and record it.
///
/// Never panics: an unexpected panic in the pass body is caught here and
/// reported through `global_error`.
pub(super) async fn run(state: Arc<CoordinatorState>, options: RefreshOptions) -> RefreshPass {
    let id = PassId::generate();
    let start_time = Utc::now();
    let started = Instant::now();
    let log = Mutex::new(PassLog::default());

    let body = AssertUnwindSafe(execute(&state, &id, &log)).catch_unwind().await;
    let global_error = match body {
        Ok(()) => None,
        Err(payload) => {
            let err = RefreshError::InternalScheduler(panic_message(payload.as_ref()));
            error!(pass_id = %id, error = %err, "Refresh pass aborted");
            Some(err.detail())
        }
    };

    let PassLog { results, errors } = log.into_inner();
    let end_time = Utc::now();
    let pass = RefreshPass {
        id,
        source: options.source,
        silent: options.silent,
        notify: state.settings.notifications_enabled() && !options.silent,
        start_time,
        end_time,
        success: errors.is_empty() && global_error.is_none(),
        total_duration_ms: elapsed_ms(started),
        results,
        errors,
        global_error,
    };

    info!(
        pass_id = %pass.id,
        source = %pass.source,
        succeeded = pass.results.len(),
        failed = pass.errors.len(),
        duration_ms = pass.total_duration_ms,
        success = pass.success,
        "Refresh pass completed"
    );

    if !state.is_destroyed() {
        *state.last_refresh_at.lock() = Some(end_time);
        state.record_pass(pass.clone());
    }
    pass
}

async fn execute(state: &Arc<CoordinatorState>, id: &PassId, log: &Mutex<PassLog>) {
    #[cfg(test)]
    if state.fail_next_pass.swap(false, std::sync::atomic::Ordering::SeqCst) {
        panic!("injected pass fault");
    }

    let records = state.registry.list_enabled();
    let timeout = state.settings.refresh_timeout();
    let width = state.settings.max_concurrent_refresh.max(1);

    debug!(pass_id = %id, components = records.len(), width, "Refresh pass started");

    // Lazily pulled: the next record is only taken when a slot frees up, so
    // launch order follows priority while completion order is free.
    let mut settled = stream::iter(records)
        .map(|record| refresh_component(state, record, timeout))
        .buffer_unordered(width);

    while let Some(outcome) = settled.next().await {
        let mut log = log.lock();
        match outcome {
            Some(ComponentOutcome::Refreshed(done)) => log.results.push(done),
            Some(ComponentOutcome::Failed(failed)) => log.errors.push(failed),
            None => {}
        }
    }
}

/// Refresh one component. Returns `None` if the coordinator was destroyed
/// before the call could launch.
async fn refresh_component(
    state: &Arc<CoordinatorState>,
    record: ComponentRecord,
    timeout: Duration,
) -> Option<ComponentOutcome> {
    if state.is_destroyed() {
        debug!(component_id = %record.id, "Skipping launch after destroy");
        return None;
    }

    let started = Instant::now();
    let outcome = run_provider(&record.id, Arc::clone(&record.provider), timeout).await;
    let duration_ms = elapsed_ms(started);
    let timestamp = Utc::now();

    let (kind, err) = match outcome {
        TaskOutcome::Succeeded => {
            state
                .registry
                .record_success(&record.id, record.sequence, timestamp);
            debug!(component_id = %record.id, duration_ms, "Component refreshed");
            return Some(ComponentOutcome::Refreshed(ComponentRefreshed {
                component_id: record.id,
                duration_ms,
                timestamp,
            }));
        }
        TaskOutcome::Failed(err) | TaskOutcome::Panicked(err) => (FailureKind::Failure, err),
        TaskOutcome::TimedOut(err, handle) => {
            state.orphans.adopt(&record.id, handle);
            (FailureKind::Timeout, err)
        }
    };

    let retry_count =
        state
            .registry
            .record_failure(&record.id, record.sequence, record.retry_count);
    warn!(
        component_id = %record.id,
        retry_count,
        duration_ms,
        error = %err,
        "Component refresh failed"
    );

    Some(ComponentOutcome::Failed(ComponentFailed {
        component_id: record.id,
        kind,
        error_message: err.detail(),
        duration_ms,
        retry_count_at_failure: retry_count,
        timestamp,
    }))
}
