//! Shared helpers for integration tests.

#![allow(dead_code)]

use std::io::Write;

use hyperdash::infrastructure::bootstrap::RefreshCore;
use hyperdash::infrastructure::config::Config;
use tempfile::NamedTempFile;

/// A small catalog with one two-wave plan, tuned for paused-clock tests.
pub const CONFIG: &str = r#"
[refresh]
max_concurrent_refresh = 2
refresh_timeout_ms = 500
max_history = 10
operation_retention_secs = 60
show_notifications = true

[priorities]
cluster-status = 9
pods-services = 8
status-monitor = 4

[operations.model-deploy]
immediate = ["pods-services", "status-monitor"]

[[operations.model-deploy.delayed]]
components = ["cluster-status"]
delay_ms = 100

[[operations.model-deploy.delayed]]
components = ["all"]
delay_ms = 250
"#;

pub fn write_temp_config(contents: &str) -> NamedTempFile {
    let mut file = tempfile::Builder::new()
        .prefix("hyperdash-test-")
        .suffix(".toml")
        .tempfile()
        .expect("create temp config");
    file.write_all(contents.as_bytes()).expect("write temp config");
    file
}

pub fn config() -> Config {
    Config::parse_toml(CONFIG).expect("test config parses")
}

pub fn core() -> RefreshCore {
    RefreshCore::from_config(&config())
}
