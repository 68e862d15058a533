use std::sync::Arc;

use futures_util::future::join_all;
use tracing::{debug, error, info, warn};

use crate::domain::{
    ComponentId, ComponentRef, DelayedWave, OperationId, RefreshOptions, RefreshOutcome,
    RefreshSource,
};
use crate::error::RefreshError;
use crate::infrastructure::task::{run_provider, TaskOutcome};

use super::SchedulerState;

pub(super) const IMMEDIATE: &str = "immediate";

/// Label used for a delayed wave in logs and pass sources.
pub(super) fn delayed_label(wave: &DelayedWave) -> String {
    format!("delayed-{}ms", wave.delay.as_millis())
}

/// Tally of one settled wave.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub(super) struct WaveSummary {
    pub(super) succeeded: usize,
    pub(super) failed: usize,
    /// The wave asked for a global pass but one was already running.
    pub(super) collapsed: bool,
}

/// Run one wave and wait for everything it launched to settle.
///
/// `All` (however often it is listed) becomes one global pass; named ids
/// are called concurrently alongside it, each under the per-task timeout.
/// Provider errors and timeouts are logged and counted. A provider panic or
/// an aborted global pass fails the wave.
pub(super) async fn run(
    state: &Arc<SchedulerState>,
    refs: &[ComponentRef],
    operation_type: &str,
    label: &str,
) -> Result<WaveSummary, RefreshError> {
    let mut global = false;
    let mut targets: Vec<ComponentId> = Vec::new();
    for component in refs {
        match component {
            ComponentRef::All => global = true,
            ComponentRef::Named(id) if !targets.contains(id) => targets.push(id.clone()),
            ComponentRef::Named(_) => {}
        }
    }

    let mut calls = Vec::with_capacity(targets.len());
    for id in targets {
        match state.resolve(&id) {
            Some(provider) => calls.push((id, provider)),
            None => warn!(
                operation_type,
                wave = label,
                component_id = %id,
                "No provider registered for component, skipping"
            ),
        }
    }

    let global_pass = async {
        if !global {
            return None;
        }
        let options = RefreshOptions::from_source(RefreshSource::Operation {
            operation_type: operation_type.to_string(),
            wave: label.to_string(),
        });
        Some(state.coordinator.trigger_global_refresh(options).await)
    };
    let targeted = join_all(
        calls
            .iter()
            .map(|(id, provider)| run_provider(id, Arc::clone(provider), state.timeout)),
    );
    let (global_outcome, outcomes) = tokio::join!(global_pass, targeted);

    let mut summary = WaveSummary::default();
    let mut fatal: Option<RefreshError> = None;

    for ((id, _), outcome) in calls.iter().zip(outcomes) {
        match outcome {
            TaskOutcome::Succeeded => summary.succeeded += 1,
            TaskOutcome::Failed(err) => {
                summary.failed += 1;
                warn!(
                    operation_type,
                    wave = label,
                    component_id = %id,
                    error = %err,
                    "Targeted refresh failed"
                );
            }
            TaskOutcome::TimedOut(err, handle) => {
                summary.failed += 1;
                state.orphans.adopt(id, handle);
                warn!(
                    operation_type,
                    wave = label,
                    component_id = %id,
                    error = %err,
                    "Targeted refresh timed out"
                );
            }
            TaskOutcome::Panicked(err) => {
                summary.failed += 1;
                error!(
                    operation_type,
                    wave = label,
                    component_id = %id,
                    error = %err,
                    "Targeted refresh panicked"
                );
                fatal.get_or_insert(err);
            }
        }
    }

    match global_outcome {
        Some(RefreshOutcome::Completed(pass)) => {
            summary.succeeded += pass.results.len();
            summary.failed += pass.errors.len();
            if let Some(message) = pass.global_error {
                fatal.get_or_insert(RefreshError::InternalScheduler(message));
            }
        }
        Some(RefreshOutcome::Skipped { reason }) => {
            summary.collapsed = true;
            debug!(
                operation_type,
                wave = label,
                %reason,
                "Global refresh collapsed into running pass"
            );
        }
        None => {}
    }

    info!(
        operation_type,
        wave = label,
        succeeded = summary.succeeded,
        failed = summary.failed,
        collapsed = summary.collapsed,
        "Refresh wave settled"
    );

    match fatal {
        Some(err) => Err(err),
        None => Ok(summary),
    }
}

/// Spawn the timer for one delayed wave. Its outcome is only logged.
pub(super) fn schedule_delayed(
    state: &Arc<SchedulerState>,
    wave: DelayedWave,
    operation_type: &str,
) {
    let weak = Arc::downgrade(state);
    let operation_type = operation_type.to_string();
    let label = delayed_label(&wave);

    let handle = tokio::spawn(async move {
        tokio::time::sleep(wave.delay).await;
        let Some(state) = weak.upgrade() else {
            return;
        };
        if state.is_destroyed() {
            return;
        }
        if let Err(err) = run(&state, &wave.components, &operation_type, &label).await {
            error!(
                operation_type = %operation_type,
                wave = %label,
                error = %err,
                "Delayed refresh wave failed"
            );
        }
    });
    state.track(handle);
}

/// Spawn the timer that drops a terminal record after the retention period.
pub(super) fn schedule_purge(state: &Arc<SchedulerState>, id: OperationId) {
    let weak = Arc::downgrade(state);
    let retention = state.retention;

    let handle = tokio::spawn(async move {
        tokio::time::sleep(retention).await;
        let Some(state) = weak.upgrade() else {
            return;
        };
        if state.operations.lock().remove(&id).is_some() {
            debug!(operation_id = %id, "Operation record purged");
        }
    });
    state.track(handle);
}
