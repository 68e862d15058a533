//! Handler for the `run` command.
//!
//! Builds a refresh core from the config, backs every catalogued component
//! with a [`LogProvider`], and feeds stdin lines to a [`PushDispatcher`]
//! until EOF or Ctrl-C.

use std::time::Duration;

use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::signal;
use tracing::{debug, info, warn};

use crate::adapter::inbound::cli::command::RunArgs;
use crate::adapter::inbound::cli::{load_config, output};
use crate::adapter::inbound::push::{Dispatched, PushDispatcher};
use crate::adapter::outbound::logging::LogProvider;
use crate::domain::SubscribeOptions;
use crate::error::Result;
use crate::infrastructure::bootstrap::RefreshCore;
use crate::infrastructure::config::Config;

/// Execute the run command.
pub async fn execute(args: &RunArgs) -> Result<()> {
    let mut config = load_config(args.config.as_deref())?;
    apply_overrides(&mut config, args);
    config.init_logging();

    let core = RefreshCore::from_config(&config);
    for id in config.priorities.component_ids() {
        let provider = LogProvider::shared(id.clone());
        core.coordinator()
            .subscribe(id, provider, SubscribeOptions::default());
    }
    core.start();
    if let Some(ms) = args.auto_refresh_ms {
        core.coordinator()
            .set_auto_refresh(true, Some(Duration::from_millis(ms)));
    }

    if !output::is_quiet() && !args.json_logs {
        output::header();
        output::field("Components", core.registry().len());
        output::field("Operations", core.scheduler().plans().len());
        output::field(
            "Auto refresh",
            core.coordinator().auto_refresh_interval().map_or_else(
                || "disabled".to_string(),
                |d| format!("every {}ms", d.as_millis()),
            ),
        );
    }
    info!(components = core.registry().len(), "hyperdash running");

    let dispatcher = PushDispatcher::new(core.coordinator().clone())
        .with_scheduler(core.scheduler().clone());
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        tokio::select! {
            line = lines.next_line() => match line {
                Ok(Some(line)) if line.trim().is_empty() => {}
                Ok(Some(line)) => {
                    let dispatcher = dispatcher.clone();
                    tokio::spawn(async move { handle_line(&dispatcher, &line).await });
                }
                Ok(None) => {
                    info!("Input closed");
                    break;
                }
                Err(e) => {
                    warn!(error = %e, "Failed to read input");
                    break;
                }
            },
            _ = signal::ctrl_c() => {
                info!("Shutdown signal received");
                break;
            }
        }
    }

    let stats = core.coordinator().refresh_stats();
    core.destroy();
    info!(
        passes = stats.total_refreshes,
        success_rate = stats.success_rate,
        "hyperdash stopped"
    );
    Ok(())
}

fn apply_overrides(config: &mut Config, args: &RunArgs) {
    if let Some(level) = &args.log_level {
        config.logging.level.clone_from(level);
    }
    if args.json_logs {
        config.logging.format = "json".to_string();
    }
}

async fn handle_line(dispatcher: &PushDispatcher, line: &str) {
    match dispatcher.dispatch(line).await {
        Ok(Dispatched::Refreshed(outcome)) => match outcome.pass() {
            Some(pass) => debug!(pass_id = %pass.id, success = pass.success, "Push refresh done"),
            None => debug!("Push refresh skipped, pass already running"),
        },
        Ok(Dispatched::Cascade(Some(id))) => debug!(operation_id = %id, "Push cascade started"),
        Ok(Dispatched::Cascade(None)) => debug!("Push cascade had no plan"),
        Ok(Dispatched::Ignored { kind }) => debug!(kind = %kind, "Push message ignored"),
        Err(e) => warn!(error = %e, "Malformed push message"),
    }
}
