//! Terminal output for CLI handlers.
//!
//! Human-readable, colored lines by default. With `--json` every call prints
//! one `{"type": ..., "payload": ...}` object per line instead, so scripts
//! can consume the same handlers. `--quiet` suppresses everything except
//! warnings, errors, and JSON.

use std::fmt::Display;
use std::sync::{OnceLock, RwLock};

use owo_colors::OwoColorize;
use serde_json::{json, Value};

/// Runtime output configuration shared by CLI handlers.
#[derive(Debug, Clone, Copy, Default)]
pub struct OutputConfig {
    pub json: bool,
    pub quiet: bool,
}

impl OutputConfig {
    #[must_use]
    pub const fn new(json: bool, quiet: bool) -> Self {
        Self { json, quiet }
    }
}

static OUTPUT_CONFIG: OnceLock<RwLock<OutputConfig>> = OnceLock::new();

fn config_cell() -> &'static RwLock<OutputConfig> {
    OUTPUT_CONFIG.get_or_init(|| RwLock::new(OutputConfig::default()))
}

fn read_config() -> OutputConfig {
    match config_cell().read() {
        Ok(config) => *config,
        Err(poisoned) => *poisoned.into_inner(),
    }
}

/// Apply output settings from global CLI flags.
pub fn configure(config: OutputConfig) {
    match config_cell().write() {
        Ok(mut current) => *current = config,
        Err(poisoned) => *poisoned.into_inner() = config,
    }
}

#[must_use]
pub fn is_json() -> bool {
    read_config().json
}

#[must_use]
pub fn is_quiet() -> bool {
    read_config().quiet
}

/// Print `kind`/`payload` as a JSON line, or run `human` unless quiet.
fn emit(kind: &str, payload: Value, always: bool, human: impl FnOnce()) {
    let config = read_config();
    if config.json {
        println!("{}", json!({ "type": kind, "payload": payload }));
    } else if always || !config.quiet {
        human();
    }
}

/// Print the application name and version.
pub fn header() {
    let version = env!("CARGO_PKG_VERSION");
    emit(
        "header",
        json!({ "app": "hyperdash", "version": version }),
        false,
        || {
            println!("{} {}", "hyperdash".bold(), version.dimmed());
            println!();
        },
    );
}

pub fn section(title: &str) {
    emit("section", json!({ "title": title }), false, || {
        println!("{}", title.bold());
    });
}

/// Print a labeled value.
pub fn field(label: &str, value: impl Display) {
    let value = value.to_string();
    emit(
        "field",
        json!({ "label": label, "value": value }),
        false,
        || println!("  {:<22} {}", label.dimmed(), value),
    );
}

pub fn success(message: &str) {
    emit("success", json!({ "message": message }), false, || {
        println!("  {} {}", "✓".green(), message);
    });
}

pub fn warning(message: &str) {
    emit("warning", json!({ "message": message }), true, || {
        println!("  {} {}", "⚠".yellow(), message);
    });
}

/// Print an error to stderr. Shown even when quiet.
pub fn error(message: &str) {
    if is_json() {
        eprintln!("{}", json!({ "type": "error", "payload": { "message": message } }));
        return;
    }
    eprintln!("  {} {}", "×".red(), message);
}

/// Print pre-rendered multi-line content such as a table.
pub fn lines(content: &str) {
    emit("lines", json!({ "content": content }), false, || {
        for line in content.lines() {
            println!("  {line}");
        }
    });
}

/// Emit a JSON value directly, for commands with a custom JSON shape.
pub fn json_output(value: &Value) {
    println!("{value}");
}

#[must_use]
pub fn highlight(value: impl Display) -> String {
    let value = value.to_string();
    if is_json() {
        return value;
    }
    format!("{}", value.cyan())
}

#[must_use]
pub fn muted(value: impl Display) -> String {
    let value = value.to_string();
    if is_json() {
        return value;
    }
    format!("{}", value.dimmed())
}
