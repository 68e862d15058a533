//! Operation cascade plan configuration.
//!
//! Plans are parsed from `[operations.<type>]` tables and resolved into a
//! [`CascadeConfig`] once at load. Every problem is reported here, never at
//! trigger time.

use std::collections::BTreeMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::priority::PriorityTable;
use crate::domain::{CascadeConfig, CascadePlan, ComponentRef, DelayedWave};
use crate::error::{ConfigError, Result};

/// One delayed wave as written in the config file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DelayedWaveConfig {
    pub components: Vec<ComponentRef>,
    /// Signed so that negative values can be rejected with a clear error.
    pub delay_ms: i64,
}

/// One operation's plan as written in the config file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlanConfig {
    #[serde(default)]
    pub immediate: Vec<ComponentRef>,
    #[serde(default)]
    pub delayed: Vec<DelayedWaveConfig>,
}

fn named(ids: &[&str]) -> Vec<ComponentRef> {
    ids.iter().map(|id| ComponentRef::from(*id)).collect()
}

fn wave(ids: &[&str], delay_ms: i64) -> DelayedWaveConfig {
    DelayedWaveConfig {
        components: named(ids),
        delay_ms,
    }
}

fn plan(immediate: &[&str], delayed: Vec<DelayedWaveConfig>) -> PlanConfig {
    PlanConfig {
        immediate: named(immediate),
        delayed,
    }
}

/// The built-in plans for the dashboard's cluster, model, and training
/// operations.
#[must_use]
pub fn default_operations() -> BTreeMap<String, PlanConfig> {
    let pods = ["status-monitor", "app-status", "pods-services"];
    let training = [
        "training-monitor",
        "status-monitor",
        "app-status",
        "pods-services",
    ];
    let deletion = [
        "training-monitor",
        "training-history",
        "status-monitor",
        "app-status",
        "pods-services",
    ];

    let mut ops = BTreeMap::new();
    ops.insert(
        "cluster-launch".to_string(),
        plan(
            &["cluster-status"],
            vec![
                wave(&["cluster-status"], 5_000),
                wave(&["all"], 30_000),
                wave(&["all"], 120_000),
            ],
        ),
    );
    ops.insert(
        "cluster-configure".to_string(),
        plan(
            &["cluster-status"],
            vec![wave(&["cluster-status"], 5_000), wave(&["all"], 30_000)],
        ),
    );
    ops.insert(
        "model-deploy".to_string(),
        plan(
            &["deployment-manager", "status-monitor", "pods-services"],
            vec![
                wave(&["status-monitor", "cluster-status"], 3_000),
                wave(&["all"], 10_000),
            ],
        ),
    );
    ops.insert(
        "model-undeploy".to_string(),
        plan(
            &[
                "deployment-manager",
                "status-monitor",
                "app-status",
                "pods-services",
            ],
            vec![wave(&["cluster-status"], 3_000), wave(&["all"], 8_000)],
        ),
    );
    ops.insert(
        "model-download".to_string(),
        plan(
            &pods,
            vec![
                wave(&["cluster-status", "deployment-manager"], 3_000),
                wave(&["all"], 8_000),
            ],
        ),
    );
    ops.insert(
        "training-start".to_string(),
        plan(
            &training,
            vec![wave(&["cluster-status"], 5_000), wave(&["all"], 10_000)],
        ),
    );
    ops.insert(
        "training-stop".to_string(),
        plan(
            &training,
            vec![wave(&["cluster-status"], 3_000), wave(&["all"], 5_000)],
        ),
    );
    ops.insert(
        "rayjob-delete".to_string(),
        plan(
            &deletion,
            vec![wave(&["cluster-status"], 5_000), wave(&["all"], 10_000)],
        ),
    );
    ops.insert(
        "training-delete".to_string(),
        plan(
            &deletion,
            vec![wave(&["cluster-status"], 5_000), wave(&["all"], 10_000)],
        ),
    );
    ops
}

fn check_refs(operation: &str, refs: &[ComponentRef], catalog: &PriorityTable) -> Result<()> {
    if refs.is_empty() {
        return Err(ConfigError::InvalidValue {
            field: "components",
            reason: format!("operation '{operation}' has a delayed wave with no components"),
        }
        .into());
    }
    for component in refs {
        let ComponentRef::Named(id) = component else {
            continue;
        };
        if id.as_str().trim().is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "components",
                reason: format!("operation '{operation}' has an empty component id"),
            }
            .into());
        }
        if !catalog.contains(id.as_str()) {
            return Err(ConfigError::UnknownComponent {
                operation: operation.to_string(),
                component: id.to_string(),
            }
            .into());
        }
    }
    Ok(())
}

/// Validate raw plans against the component catalog and resolve them.
///
/// # Errors
///
/// Returns an error if:
/// - An operation type is empty
/// - A plan has no waves at all
/// - A wave references a component missing from the catalog
/// - A delayed wave has a negative delay or no components
pub fn resolve_operations(
    raw: &BTreeMap<String, PlanConfig>,
    catalog: &PriorityTable,
) -> Result<CascadeConfig> {
    let mut plans = BTreeMap::new();

    for (operation, config) in raw {
        if operation.trim().is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "operations",
                reason: "operation type cannot be empty".to_string(),
            }
            .into());
        }
        if config.immediate.is_empty() && config.delayed.is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "operations",
                reason: format!("operation '{operation}' defines no refresh waves"),
            }
            .into());
        }
        if !config.immediate.is_empty() {
            check_refs(operation, &config.immediate, catalog)?;
        }

        let mut delayed = Vec::with_capacity(config.delayed.len());
        for wave in &config.delayed {
            let delay_ms = u64::try_from(wave.delay_ms).map_err(|_| ConfigError::NegativeDelay {
                operation: operation.clone(),
                delay_ms: wave.delay_ms,
            })?;
            check_refs(operation, &wave.components, catalog)?;
            delayed.push(DelayedWave::new(
                wave.components.clone(),
                Duration::from_millis(delay_ms),
            ));
        }

        plans.insert(
            operation.clone(),
            CascadePlan::new(config.immediate.clone(), delayed),
        );
    }

    Ok(CascadeConfig::new(plans))
}
