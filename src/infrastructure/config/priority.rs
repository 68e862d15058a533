//! Default component priorities.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::domain::ComponentId;

/// Built-in component catalog with its refresh priorities.
const DEFAULT_PRIORITIES: &[(&str, i32)] = &[
    ("cluster-management", 10),
    ("app-status", 9),
    ("cluster-status", 9),
    ("pods-services", 8),
    ("training-monitor", 8),
    ("deployment-manager", 7),
    ("s3-storage-manager", 6),
    ("training-history", 6),
    ("status-monitor", 4),
    ("config-panel", 2),
    ("test-components", 1),
];

/// Component id to default priority. Higher runs first.
///
/// Also serves as the catalog of known components that cascade plans may
/// reference.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PriorityTable(BTreeMap<String, i32>);

impl PriorityTable {
    #[must_use]
    pub fn new(entries: BTreeMap<String, i32>) -> Self {
        Self(entries)
    }

    /// Priority for a component, or 0 when it is not listed.
    #[must_use]
    pub fn priority_for(&self, id: &ComponentId) -> i32 {
        self.0.get(id.as_str()).copied().unwrap_or(0)
    }

    #[must_use]
    pub fn contains(&self, id: &str) -> bool {
        self.0.contains_key(id)
    }

    /// Component ids in lexical order.
    pub fn component_ids(&self) -> impl Iterator<Item = ComponentId> + '_ {
        self.0.keys().map(|k| ComponentId::new(k.as_str()))
    }

    /// Entries ordered by priority descending, then id.
    #[must_use]
    pub fn ranked(&self) -> Vec<(&str, i32)> {
        let mut ranked: Vec<_> = self.0.iter().map(|(k, v)| (k.as_str(), *v)).collect();
        ranked.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)));
        ranked
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl Default for PriorityTable {
    fn default() -> Self {
        Self(
            DEFAULT_PRIORITIES
                .iter()
                .map(|(id, p)| ((*id).to_string(), *p))
                .collect(),
        )
    }
}

impl<const N: usize> From<[(&str, i32); N]> for PriorityTable {
    fn from(entries: [(&str, i32); N]) -> Self {
        Self(
            entries
                .into_iter()
                .map(|(id, p)| (id.to_string(), p))
                .collect(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_component_defaults_to_zero() {
        let table = PriorityTable::default();
        assert_eq!(table.priority_for(&ComponentId::new("nodegroup-manager")), 0);
        assert_eq!(table.priority_for(&ComponentId::new("cluster-management")), 10);
    }

    #[test]
    fn ranked_orders_by_priority_then_id() {
        let table = PriorityTable::default();
        let ranked = table.ranked();
        assert_eq!(ranked[0], ("cluster-management", 10));
        assert_eq!(ranked[1], ("app-status", 9));
        assert_eq!(ranked[2], ("cluster-status", 9));
        assert_eq!(ranked.last(), Some(&("test-components", 1)));
    }
}
