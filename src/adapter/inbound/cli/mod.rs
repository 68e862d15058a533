//! CLI module graph.

pub mod check;
pub mod command;
pub mod output;
pub mod run;
pub mod show;

use std::path::Path;

use crate::error::Result;
use crate::infrastructure::config::Config;

/// Load `path`, or the built-in defaults when no path is given.
///
/// Defaults still go through [`Config::parse_toml`] so that `HYPERDASH_ENV`
/// applies either way.
pub fn load_config(path: Option<&Path>) -> Result<Config> {
    match path {
        Some(path) => Config::load(path),
        None => Config::parse_toml(""),
    }
}
