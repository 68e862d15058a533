//! Handlers for `show config` and `show plan`.

use std::path::Path;

use serde_json::json;
use tabled::{Table, Tabled};

use crate::adapter::inbound::cli::{load_config, output};
use crate::domain::{CascadePlan, ComponentRef};
use crate::error::{RefreshError, Result};

#[derive(Tabled)]
struct PriorityRow {
    #[tabled(rename = "Component")]
    component: String,
    #[tabled(rename = "Priority")]
    priority: i32,
}

#[derive(Tabled)]
struct OperationRow {
    #[tabled(rename = "Operation")]
    operation: String,
    #[tabled(rename = "Immediate")]
    immediate: String,
    #[tabled(rename = "Delayed waves")]
    delayed: usize,
}

#[derive(Tabled)]
struct WaveRow {
    #[tabled(rename = "Wave")]
    wave: String,
    #[tabled(rename = "Delay")]
    delay: String,
    #[tabled(rename = "Components")]
    components: String,
}

fn join_refs(refs: &[ComponentRef]) -> String {
    if refs.is_empty() {
        return "-".to_string();
    }
    refs.iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Display refresh settings, priorities, and the configured operations.
pub fn execute_config(path: Option<&Path>) -> Result<()> {
    let config = load_config(path)?;

    if output::is_json() {
        output::json_output(&json!({
            "command": "show.config",
            "environment": config.environment.to_string(),
            "refresh": config.refresh,
            "priorities": config.priorities,
            "operations": config.cascade(),
        }));
        return Ok(());
    }

    output::header();
    output::section("Refresh");
    let refresh = &config.refresh;
    output::field("Environment", config.environment);
    output::field("Auto refresh", refresh.auto_refresh_enabled);
    output::field("Interval", format!("{}ms", refresh.auto_refresh_interval_ms));
    output::field("Max concurrent", refresh.max_concurrent_refresh);
    output::field("Timeout", format!("{}ms", refresh.refresh_timeout_ms));
    output::field("History", refresh.max_history);
    output::field("Retention", format!("{}s", refresh.operation_retention_secs));
    output::field("Notifications", refresh.notifications_enabled());

    output::section("Priorities");
    let rows: Vec<PriorityRow> = config
        .priorities
        .ranked()
        .into_iter()
        .map(|(component, priority)| PriorityRow {
            component: component.to_string(),
            priority,
        })
        .collect();
    output::lines(&Table::new(rows).to_string());

    output::section("Operations");
    let rows: Vec<OperationRow> = config
        .cascade()
        .iter()
        .map(|(operation, plan)| OperationRow {
            operation: operation.to_string(),
            immediate: join_refs(&plan.immediate),
            delayed: plan.delayed.len(),
        })
        .collect();
    output::lines(&Table::new(rows).to_string());

    Ok(())
}

fn wave_rows(plan: &CascadePlan) -> Vec<WaveRow> {
    let mut rows = vec![WaveRow {
        wave: "immediate".to_string(),
        delay: "0ms".to_string(),
        components: join_refs(&plan.immediate),
    }];
    rows.extend(plan.delayed.iter().enumerate().map(|(i, wave)| WaveRow {
        wave: format!("delayed #{}", i + 1),
        delay: format!("{}ms", wave.delay.as_millis()),
        components: join_refs(&wave.components),
    }));
    rows
}

/// Display the waves of one operation's cascade plan.
///
/// # Errors
///
/// Returns [`RefreshError::UnknownOperationType`] if no plan is configured.
pub fn execute_plan(operation: &str, path: Option<&Path>) -> Result<()> {
    let config = load_config(path)?;
    let plan = config
        .cascade()
        .plan(operation)
        .ok_or_else(|| RefreshError::UnknownOperationType(operation.to_string()))?;

    if output::is_json() {
        output::json_output(&json!({
            "command": "show.plan",
            "operation": operation,
            "plan": plan,
        }));
        return Ok(());
    }

    output::section(&format!("Cascade plan for {}", output::highlight(operation)));
    output::lines(&Table::new(wave_rows(plan)).to_string());
    if plan.references().any(ComponentRef::is_all) {
        output::field("", output::muted("\"all\" runs one global refresh pass"));
    }

    Ok(())
}
