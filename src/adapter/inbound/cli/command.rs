//! Command-line interface definitions.
//!
//! `run` drives a refresh core from stdin; `check` and `show` inspect a
//! configuration file without running anything.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

/// Priority-scheduled refresh coordination for dashboard views
#[derive(Parser, Debug)]
#[command(name = "hyperdash")]
#[command(version)]
pub struct Cli {
    /// JSON output for scripting
    #[arg(long, global = true)]
    pub json: bool,

    /// Decrease output verbosity
    #[arg(short, long, global = true)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// Top-level subcommands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the refresh core, reading push messages as JSON lines from stdin
    Run(RunArgs),

    /// Run diagnostic checks
    #[command(subcommand)]
    Check(CheckCommand),

    /// Display effective settings
    #[command(subcommand)]
    Show(ShowCommand),
}

/// Subcommands for `hyperdash check`.
#[derive(Subcommand, Debug)]
pub enum CheckCommand {
    /// Validate the configuration file syntax and semantics.
    Config(ConfigPathArg),
}

/// Subcommands for `hyperdash show`.
#[derive(Subcommand, Debug)]
pub enum ShowCommand {
    /// Display refresh settings and the component priority ranking.
    Config(ConfigPathArg),
    /// Display the cascade plan for one operation type.
    Plan(PlanArgs),
}

/// Shared argument for commands that only need a configuration path.
#[derive(Args, Debug)]
pub struct ConfigPathArg {
    /// Path to the configuration file (built-in defaults when omitted).
    #[arg(short, long)]
    pub config: Option<PathBuf>,
}

/// Arguments for `show plan`.
#[derive(Args, Debug)]
pub struct PlanArgs {
    /// Operation type, e.g. "model-deploy".
    pub operation: String,

    #[command(flatten)]
    pub config: ConfigPathArg,
}

/// Arguments for `run`.
#[derive(Args, Debug)]
pub struct RunArgs {
    /// Path to the configuration file (built-in defaults when omitted).
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Log level override (e.g. "debug", "hyperdash=trace").
    #[arg(long)]
    pub log_level: Option<String>,

    /// Emit logs as JSON.
    #[arg(long)]
    pub json_logs: bool,

    /// Enable auto-refresh with this interval in milliseconds.
    #[arg(long, value_parser = clap::value_parser!(u64).range(1..))]
    pub auto_refresh_ms: Option<u64>,
}
