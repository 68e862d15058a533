//! Handler for `check config`.

use std::path::Path;

use serde_json::json;

use crate::adapter::inbound::cli::{load_config, output};
use crate::error::Result;

/// Validate a configuration file without starting anything.
pub fn execute_config(path: Option<&Path>) -> Result<()> {
    let config = load_config(path)?;
    let source = path.map_or_else(|| "built-in defaults".to_string(), |p| p.display().to_string());

    if output::is_json() {
        output::json_output(&json!({
            "command": "check.config",
            "valid": true,
            "config": source,
            "environment": config.environment.to_string(),
            "components": config.priorities.len(),
            "operations": config.cascade().len(),
        }));
        return Ok(());
    }

    output::section("Configuration Check");
    output::field("Config", &source);
    output::success("Configuration file is valid");

    output::section("Summary");
    output::field("Environment", config.environment);
    output::field("Components", config.priorities.len());
    output::field("Operations", config.cascade().len());
    output::field(
        "Notifications",
        if config.refresh.notifications_enabled() {
            "shown"
        } else {
            "hidden"
        },
    );
    if config.refresh.auto_refresh_enabled {
        output::field(
            "Auto refresh",
            format!("every {}ms", config.refresh.auto_refresh_interval_ms),
        );
    } else {
        output::field("Auto refresh", "disabled");
    }

    Ok(())
}
