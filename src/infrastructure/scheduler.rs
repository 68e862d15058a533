//! Operation-triggered cascade refreshes.
//!
//! When the user performs a mutating operation (deploying a model, launching
//! a cluster), the views it affects should refresh right away and again a
//! little later, once the backend has caught up. [`OperationCascadeScheduler`]
//! looks up the operation's [`CascadePlan`](crate::domain::CascadePlan), runs
//! the immediate wave, and arms one timer per delayed wave.
//!
//! Named components resolve against the scheduler's own operation-local
//! providers first, then against the coordinator's registry. `All` delegates
//! to [`RefreshCoordinator::trigger_global_refresh`], so it is subject to the
//! coordinator's in-flight guard.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use parking_lot::{Mutex, RwLock};
use serde::Serialize;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::domain::{
    CascadeConfig, ComponentId, OperationId, OperationRecord, OperationStatus,
};
use crate::error::RefreshError;
use crate::infrastructure::coordinator::RefreshCoordinator;
use crate::infrastructure::event::{EventBus, ListenerId, OperationEvent, OperationEventKind};
use crate::infrastructure::task::OrphanTasks;
use crate::port::SharedProvider;

mod wave;

/// Read-only summary of tracked operations.
#[derive(Debug, Clone, Serialize)]
pub struct OperationStats {
    pub total: usize,
    pub running: usize,
    pub completed: usize,
    pub failed: usize,
    /// Operation-local providers.
    pub subscriber_count: usize,
    pub active_operations: Vec<OperationRecord>,
}

struct SchedulerState {
    coordinator: RefreshCoordinator,
    plans: CascadeConfig,
    local: RwLock<HashMap<ComponentId, SharedProvider>>,
    events: EventBus,
    operations: Mutex<HashMap<OperationId, OperationRecord>>,
    /// Delayed-wave and purge timers.
    timers: Mutex<Vec<JoinHandle<()>>>,
    orphans: OrphanTasks,
    timeout: Duration,
    retention: Duration,
    next_seq: AtomicU64,
    destroyed: AtomicBool,
}

impl SchedulerState {
    fn is_destroyed(&self) -> bool {
        self.destroyed.load(Ordering::SeqCst)
    }

    /// Operation-local provider, else the registry's.
    fn resolve(&self, id: &ComponentId) -> Option<SharedProvider> {
        if let Some(provider) = self.local.read().get(id) {
            return Some(Arc::clone(provider));
        }
        self.coordinator.registry().provider(id)
    }

    fn track(&self, handle: JoinHandle<()>) {
        let mut timers = self.timers.lock();
        timers.retain(|h| !h.is_finished());
        timers.push(handle);
    }

    /// Apply a terminal transition to a still-tracked record.
    fn finish(&self, id: &OperationId, transition: impl FnOnce(&mut OperationRecord) -> bool) {
        let mut operations = self.operations.lock();
        let Some(record) = operations.get_mut(id) else {
            debug!(operation_id = %id, "Operation record already purged or cleared");
            return;
        };
        if !transition(record) {
            debug!(operation_id = %id, status = ?record.status, "Operation already terminal");
        }
    }

    /// Mark the operation failed, log it, and emit `operation-error`.
    fn fail(
        &self,
        id: &OperationId,
        operation_type: &str,
        payload: &serde_json::Value,
        err: &RefreshError,
    ) {
        let ended = Utc::now();
        let message = err.to_string();
        self.finish(id, |record| record.fail(message.clone(), ended));
        error!(operation_id = %id, operation_type, error = %err, "Operation refresh failed");
        self.emit(
            OperationEventKind::OperationError,
            id,
            operation_type,
            payload,
            Some(message),
        );
    }

    fn emit(
        &self,
        kind: OperationEventKind,
        id: &OperationId,
        operation_type: &str,
        payload: &serde_json::Value,
        error: Option<String>,
    ) {
        let event = OperationEvent {
            operation_id: id.clone(),
            operation_type: operation_type.to_string(),
            payload: payload.clone(),
            error,
        };
        self.events.emit(kind, &event);
    }
}

/// Settles an operation whose trigger future is dropped before the immediate
/// wave finishes: the record fails, `operation-error` is emitted, and the
/// retention purge is armed.
struct PendingOperation<'a> {
    state: &'a Arc<SchedulerState>,
    id: &'a OperationId,
    operation_type: &'a str,
    payload: &'a serde_json::Value,
    settled: bool,
}

impl PendingOperation<'_> {
    fn settle(mut self) {
        self.settled = true;
    }
}

impl Drop for PendingOperation<'_> {
    fn drop(&mut self) {
        if self.settled || self.state.is_destroyed() {
            return;
        }
        let err = RefreshError::InternalScheduler(
            "operation cancelled before its immediate wave settled".to_string(),
        );
        self.state.fail(self.id, self.operation_type, self.payload, &err);
        if tokio::runtime::Handle::try_current().is_ok() {
            wave::schedule_purge(self.state, self.id.clone());
        }
    }
}

/// Runs cascade plans in response to operations.
///
/// Cheap to clone; clones share state.
#[derive(Clone)]
pub struct OperationCascadeScheduler {
    state: Arc<SchedulerState>,
}

impl OperationCascadeScheduler {
    /// Build a scheduler over `coordinator`, using its timeout and retention
    /// settings.
    #[must_use]
    pub fn new(coordinator: RefreshCoordinator, plans: CascadeConfig) -> Self {
        let settings = coordinator.settings();
        let timeout = settings.refresh_timeout();
        let retention = settings.operation_retention();
        Self {
            state: Arc::new(SchedulerState {
                coordinator,
                plans,
                local: RwLock::new(HashMap::new()),
                events: EventBus::new(),
                operations: Mutex::new(HashMap::new()),
                timers: Mutex::new(Vec::new()),
                orphans: OrphanTasks::default(),
                timeout,
                retention,
                next_seq: AtomicU64::new(0),
                destroyed: AtomicBool::new(false),
            }),
        }
    }

    #[must_use]
    pub fn plans(&self) -> &CascadeConfig {
        &self.state.plans
    }

    #[must_use]
    pub fn coordinator(&self) -> &RefreshCoordinator {
        &self.state.coordinator
    }

    /// Register an operation-local provider. It shadows any registry provider
    /// with the same id during cascades, and is never part of global passes.
    pub fn subscribe(&self, id: impl Into<ComponentId>, provider: SharedProvider) {
        self.state.local.write().insert(id.into(), provider);
    }

    pub fn unsubscribe(&self, id: &ComponentId) -> bool {
        self.state.local.write().remove(id).is_some()
    }

    pub fn on<F>(&self, kind: OperationEventKind, listener: F) -> ListenerId
    where
        F: Fn(&OperationEvent) + Send + Sync + 'static,
    {
        self.state.events.on(kind, listener)
    }

    pub fn off(&self, kind: OperationEventKind, id: ListenerId) -> bool {
        self.state.events.off(kind, id)
    }

    pub fn emit(&self, kind: OperationEventKind, event: &OperationEvent) -> usize {
        self.state.events.emit(kind, event)
    }

    #[must_use]
    pub fn events(&self) -> &EventBus {
        &self.state.events
    }

    /// Run the cascade for `operation_type`.
    ///
    /// Resolves once the immediate wave has settled and every delayed wave
    /// is armed; delayed waves are never awaited. Returns `None` when no plan
    /// exists for `operation_type` (logged, nothing refreshed) or the
    /// scheduler was destroyed. Failures surface through the record and the
    /// `operation-error` event, never through the return value.
    pub async fn trigger_operation_refresh(
        &self,
        operation_type: &str,
        payload: serde_json::Value,
    ) -> Option<OperationId> {
        let state = &self.state;
        let Some(plan) = state.plans.plan(operation_type).cloned() else {
            let err = RefreshError::UnknownOperationType(operation_type.to_string());
            warn!(operation_type, error = %err, "Ignoring operation without refresh plan");
            return None;
        };
        if state.is_destroyed() {
            warn!(operation_type, "Operation refresh requested after destroy");
            return None;
        }

        let started = Utc::now();
        let seq = state.next_seq.fetch_add(1, Ordering::Relaxed);
        let id = OperationId::generate(operation_type, started.timestamp_millis(), seq);
        state.operations.lock().insert(
            id.clone(),
            OperationRecord::start(id.clone(), operation_type, payload.clone(), started),
        );

        info!(
            operation_id = %id,
            operation_type,
            delayed_waves = plan.delayed.len(),
            "Operation refresh started"
        );
        state.emit(OperationEventKind::OperationStart, &id, operation_type, &payload, None);

        let pending = PendingOperation {
            state,
            id: &id,
            operation_type,
            payload: &payload,
            settled: false,
        };
        let outcome = wave::run(state, &plan.immediate, operation_type, wave::IMMEDIATE).await;
        pending.settle();

        match outcome {
            Ok(_) => {
                for delayed in plan.delayed {
                    wave::schedule_delayed(state, delayed, operation_type);
                }
                let ended = Utc::now();
                state.finish(&id, |record| record.complete(ended));
                info!(operation_id = %id, operation_type, "Operation refresh completed");
                state.emit(
                    OperationEventKind::OperationComplete,
                    &id,
                    operation_type,
                    &payload,
                    None,
                );
            }
            Err(err) => state.fail(&id, operation_type, &payload, &err),
        }

        wave::schedule_purge(state, id.clone());
        Some(id)
    }

    /// Tracked records, oldest first.
    #[must_use]
    pub fn active_operations(&self) -> Vec<OperationRecord> {
        let mut records: Vec<OperationRecord> =
            self.state.operations.lock().values().cloned().collect();
        records.sort_by(|a, b| {
            a.start_time
                .cmp(&b.start_time)
                .then_with(|| a.id.as_str().cmp(b.id.as_str()))
        });
        records
    }

    #[must_use]
    pub fn operation(&self, id: &OperationId) -> Option<OperationRecord> {
        self.state.operations.lock().get(id).cloned()
    }

    #[must_use]
    pub fn operation_stats(&self) -> OperationStats {
        let active_operations = self.active_operations();
        let count = |status: OperationStatus| {
            active_operations
                .iter()
                .filter(|r| r.status == status)
                .count()
        };
        OperationStats {
            total: active_operations.len(),
            running: count(OperationStatus::Running),
            completed: count(OperationStatus::Completed),
            failed: count(OperationStatus::Failed),
            subscriber_count: self.state.local.read().len(),
            active_operations,
        }
    }

    /// Forget every tracked record. Armed waves still fire.
    pub fn clear_active_operations(&self) {
        self.state.operations.lock().clear();
    }

    /// Cancel every armed wave and purge timer, abort timed-out calls, and
    /// drop local providers, listeners, and records. Not reversible.
    ///
    /// The coordinator is left alone; destroy it separately.
    pub fn destroy(&self) {
        let state = &self.state;
        state.destroyed.store(true, Ordering::SeqCst);
        let timers: Vec<_> = state.timers.lock().drain(..).collect();
        let cancelled = timers.len();
        for timer in timers {
            timer.abort();
        }
        let aborted = state.orphans.abort_all();
        state.local.write().clear();
        state.events.clear();
        state.operations.lock().clear();
        info!(cancelled, aborted, "Cascade scheduler destroyed");
    }

    #[must_use]
    pub fn is_destroyed(&self) -> bool {
        self.state.is_destroyed()
    }
}

impl std::fmt::Debug for OperationCascadeScheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OperationCascadeScheduler")
            .field("plans", &self.state.plans.len())
            .field("local_providers", &self.state.local.read().len())
            .field("operations", &self.state.operations.lock().len())
            .finish_non_exhaustive()
    }
}
