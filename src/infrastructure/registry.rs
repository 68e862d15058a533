//! Component registry: named, prioritized refresh providers.
//!
//! Pure bookkeeping. Scheduling lives in the coordinator; the registry only
//! answers "who is subscribed, in what order" and records refresh outcomes.

use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use tracing::debug;

use crate::domain::{ComponentId, ComponentStatus, SubscribeOptions};
use crate::infrastructure::config::PriorityTable;
use crate::port::SharedProvider;

/// One subscribed component.
#[derive(Clone)]
pub struct ComponentRecord {
    pub id: ComponentId,
    pub priority: i32,
    pub enabled: bool,
    pub provider: SharedProvider,
    pub last_refresh_at: Option<DateTime<Utc>>,
    pub retry_count: u32,
    /// Insertion counter; breaks priority ties first-registered-first.
    pub sequence: u64,
}

impl fmt::Debug for ComponentRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ComponentRecord")
            .field("id", &self.id)
            .field("priority", &self.priority)
            .field("enabled", &self.enabled)
            .field("last_refresh_at", &self.last_refresh_at)
            .field("retry_count", &self.retry_count)
            .field("sequence", &self.sequence)
            .finish_non_exhaustive()
    }
}

impl ComponentRecord {
    fn status(&self) -> ComponentStatus {
        ComponentStatus {
            id: self.id.clone(),
            enabled: self.enabled,
            priority: self.priority,
            last_refresh_at: self.last_refresh_at,
            retry_count: self.retry_count,
        }
    }
}

/// Registry of refresh providers keyed by component id.
pub struct ComponentRegistry {
    records: RwLock<HashMap<ComponentId, ComponentRecord>>,
    priorities: PriorityTable,
    next_sequence: AtomicU64,
}

impl ComponentRegistry {
    /// Create an empty registry that resolves default priorities from
    /// `priorities`.
    #[must_use]
    pub fn new(priorities: PriorityTable) -> Self {
        Self {
            records: RwLock::new(HashMap::new()),
            priorities,
            next_sequence: AtomicU64::new(0),
        }
    }

    /// Insert or fully replace the record for `id`.
    ///
    /// A replacement is a fresh record: retry count and last refresh time
    /// start over.
    pub fn subscribe(
        &self,
        id: impl Into<ComponentId>,
        provider: SharedProvider,
        options: SubscribeOptions,
    ) {
        let id = id.into();
        let priority = options
            .priority
            .unwrap_or_else(|| self.priorities.priority_for(&id));
        let sequence = self.next_sequence.fetch_add(1, Ordering::Relaxed);

        debug!(component_id = %id, priority, enabled = options.enabled, "Component subscribed");

        let record = ComponentRecord {
            id: id.clone(),
            priority,
            enabled: options.enabled,
            provider,
            last_refresh_at: None,
            retry_count: 0,
            sequence,
        };
        self.records.write().insert(id, record);
    }

    /// Remove the record for `id`. Returns whether anything was removed.
    pub fn unsubscribe(&self, id: &ComponentId) -> bool {
        let removed = self.records.write().remove(id).is_some();
        if removed {
            debug!(component_id = %id, "Component unsubscribed");
        }
        removed
    }

    /// Toggle inclusion in passes. Returns false if `id` is not subscribed.
    pub fn set_enabled(&self, id: &ComponentId, enabled: bool) -> bool {
        let mut records = self.records.write();
        let Some(record) = records.get_mut(id) else {
            return false;
        };
        record.enabled = enabled;
        debug!(component_id = %id, enabled, "Component refresh toggled");
        true
    }

    /// Enabled records, priority descending, ties by insertion order.
    #[must_use]
    pub fn list_enabled(&self) -> Vec<ComponentRecord> {
        let mut enabled: Vec<ComponentRecord> = self
            .records
            .read()
            .values()
            .filter(|r| r.enabled)
            .cloned()
            .collect();
        enabled.sort_by(|a, b| {
            b.priority
                .cmp(&a.priority)
                .then_with(|| a.sequence.cmp(&b.sequence))
        });
        enabled
    }

    /// The provider registered for `id`, enabled or not.
    #[must_use]
    pub fn provider(&self, id: &ComponentId) -> Option<SharedProvider> {
        self.records.read().get(id).map(|r| r.provider.clone())
    }

    /// Stamp a success on the record, if it is still the same subscription.
    pub fn record_success(&self, id: &ComponentId, sequence: u64, at: DateTime<Utc>) {
        let mut records = self.records.write();
        if let Some(record) = records.get_mut(id).filter(|r| r.sequence == sequence) {
            record.last_refresh_at = Some(at);
            record.retry_count = 0;
        }
    }

    /// Count a failure on the record and return the new retry count.
    ///
    /// If the record was replaced or removed meanwhile, nothing is updated
    /// and the count the failed subscription would have reached is returned.
    pub fn record_failure(&self, id: &ComponentId, sequence: u64, previous: u32) -> u32 {
        let mut records = self.records.write();
        match records.get_mut(id).filter(|r| r.sequence == sequence) {
            Some(record) => {
                record.retry_count = record.retry_count.saturating_add(1);
                record.retry_count
            }
            None => previous.saturating_add(1),
        }
    }

    /// Status projection for every record, priority order.
    #[must_use]
    pub fn statuses(&self) -> Vec<ComponentStatus> {
        let mut records: Vec<ComponentRecord> = self.records.read().values().cloned().collect();
        records.sort_by(|a, b| {
            b.priority
                .cmp(&a.priority)
                .then_with(|| a.sequence.cmp(&b.sequence))
        });
        records.iter().map(ComponentRecord::status).collect()
    }

    #[must_use]
    pub fn contains(&self, id: &ComponentId) -> bool {
        self.records.read().contains_key(id)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.records.read().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.read().is_empty()
    }

    /// Drop every record.
    pub fn clear(&self) {
        self.records.write().clear();
    }

    #[must_use]
    pub const fn priorities(&self) -> &PriorityTable {
        &self.priorities
    }
}

impl Default for ComponentRegistry {
    fn default() -> Self {
        Self::new(PriorityTable::default())
    }
}
