//! Synchronous fan-out of operation lifecycle events.
//!
//! Listeners run on the emitting task, in registration order. A panicking
//! listener is caught and logged; the remaining listeners still run and the
//! emitter never sees the panic.

use std::collections::HashMap;
use std::fmt;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::RwLock;
use serde::Serialize;
use tracing::{debug, error};

use crate::domain::OperationId;
use crate::infrastructure::task::panic_message;

/// Lifecycle event kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum OperationEventKind {
    OperationStart,
    OperationComplete,
    OperationError,
}

impl OperationEventKind {
    pub const ALL: [Self; 3] = [
        Self::OperationStart,
        Self::OperationComplete,
        Self::OperationError,
    ];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::OperationStart => "operation-start",
            Self::OperationComplete => "operation-complete",
            Self::OperationError => "operation-error",
        }
    }
}

impl fmt::Display for OperationEventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Payload delivered to listeners.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OperationEvent {
    pub operation_id: OperationId,
    pub operation_type: String,
    pub payload: serde_json::Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Handle returned by [`EventBus::on`], used to remove the listener again.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

pub type Listener = Arc<dyn Fn(&OperationEvent) + Send + Sync>;

#[derive(Default)]
pub struct EventBus {
    listeners: RwLock<HashMap<OperationEventKind, Vec<(ListenerId, Listener)>>>,
    next_id: AtomicU64,
}

impl EventBus {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `listener` for `kind`.
    pub fn on<F>(&self, kind: OperationEventKind, listener: F) -> ListenerId
    where
        F: Fn(&OperationEvent) + Send + Sync + 'static,
    {
        let id = ListenerId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.listeners
            .write()
            .entry(kind)
            .or_default()
            .push((id, Arc::new(listener)));
        id
    }

    /// Remove a listener. Returns false if it was not registered for `kind`.
    pub fn off(&self, kind: OperationEventKind, id: ListenerId) -> bool {
        let mut listeners = self.listeners.write();
        let Some(entries) = listeners.get_mut(&kind) else {
            return false;
        };
        let before = entries.len();
        entries.retain(|(existing, _)| *existing != id);
        before != entries.len()
    }

    /// Deliver `event` to every listener of `kind`. Returns how many returned
    /// normally.
    ///
    /// Listeners are snapshotted first, so a listener may call `on` or `off`
    /// without deadlocking; such changes apply from the next emit.
    pub fn emit(&self, kind: OperationEventKind, event: &OperationEvent) -> usize {
        let snapshot: Vec<Listener> = self
            .listeners
            .read()
            .get(&kind)
            .map(|entries| entries.iter().map(|(_, l)| Arc::clone(l)).collect())
            .unwrap_or_default();

        let mut delivered = 0;
        for listener in snapshot {
            match catch_unwind(AssertUnwindSafe(|| (listener.as_ref())(event))) {
                Ok(()) => delivered += 1,
                Err(payload) => error!(
                    event = %kind,
                    operation_id = %event.operation_id,
                    error = %panic_message(payload.as_ref()),
                    "Event listener panicked"
                ),
            }
        }
        debug!(event = %kind, operation_id = %event.operation_id, delivered, "Event emitted");
        delivered
    }

    #[must_use]
    pub fn listener_count(&self, kind: OperationEventKind) -> usize {
        self.listeners.read().get(&kind).map_or(0, Vec::len)
    }

    /// Drop every listener.
    pub fn clear(&self) {
        self.listeners.write().clear();
    }
}

impl fmt::Debug for EventBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut map = f.debug_map();
        for kind in OperationEventKind::ALL {
            map.entry(&kind.as_str(), &self.listener_count(kind));
        }
        map.finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;

    fn event() -> OperationEvent {
        OperationEvent {
            operation_id: OperationId::generate("model-deploy", 1_700_000_000_000, 0),
            operation_type: "model-deploy".into(),
            payload: serde_json::json!({ "model": "llama" }),
            error: None,
        }
    }

    #[test]
    fn emit_reaches_listeners_of_that_kind_only() {
        let bus = EventBus::new();
        let seen = Arc::new(Mutex::new(Vec::new()));

        let s = Arc::clone(&seen);
        bus.on(OperationEventKind::OperationStart, move |e| {
            s.lock().push(e.operation_type.clone());
        });
        let s = Arc::clone(&seen);
        bus.on(OperationEventKind::OperationError, move |_| {
            s.lock().push("error".to_string());
        });

        assert_eq!(bus.emit(OperationEventKind::OperationStart, &event()), 1);
        assert_eq!(*seen.lock(), vec!["model-deploy"]);
    }

    #[test]
    fn panicking_listener_is_isolated() {
        let bus = EventBus::new();
        let calls = Arc::new(AtomicU64::new(0));

        let c = Arc::clone(&calls);
        bus.on(OperationEventKind::OperationComplete, move |_| {
            c.fetch_add(1, Ordering::SeqCst);
        });
        bus.on(OperationEventKind::OperationComplete, |_| panic!("listener bug"));
        let c = Arc::clone(&calls);
        bus.on(OperationEventKind::OperationComplete, move |_| {
            c.fetch_add(1, Ordering::SeqCst);
        });

        assert_eq!(bus.emit(OperationEventKind::OperationComplete, &event()), 2);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn off_removes_only_the_given_listener() {
        let bus = EventBus::new();
        let first = bus.on(OperationEventKind::OperationStart, |_| {});
        bus.on(OperationEventKind::OperationStart, |_| {});

        assert!(!bus.off(OperationEventKind::OperationError, first));
        assert!(bus.off(OperationEventKind::OperationStart, first));
        assert!(!bus.off(OperationEventKind::OperationStart, first));
        assert_eq!(bus.listener_count(OperationEventKind::OperationStart), 1);
    }

    #[test]
    fn listener_may_unsubscribe_itself() {
        let bus = Arc::new(EventBus::new());
        let slot: Arc<Mutex<Option<ListenerId>>> = Arc::new(Mutex::new(None));

        let b = Arc::clone(&bus);
        let s = Arc::clone(&slot);
        let id = bus.on(OperationEventKind::OperationStart, move |_| {
            if let Some(id) = *s.lock() {
                b.off(OperationEventKind::OperationStart, id);
            }
        });
        *slot.lock() = Some(id);

        assert_eq!(bus.emit(OperationEventKind::OperationStart, &event()), 1);
        assert_eq!(bus.emit(OperationEventKind::OperationStart, &event()), 0);
    }

    #[test]
    fn kinds_use_kebab_case_names() {
        assert_eq!(OperationEventKind::OperationStart.to_string(), "operation-start");
        assert_eq!(
            serde_json::to_value(OperationEventKind::OperationError).unwrap(),
            "operation-error"
        );
    }
}
