//! Infrastructure configuration modules.

pub mod cascade;
pub mod logging;
pub mod priority;
pub mod refresh;
pub mod settings;

pub use cascade::{DelayedWaveConfig, PlanConfig};
pub use logging::LoggingConfig;
pub use priority::PriorityTable;
pub use refresh::RefreshSettings;
pub use settings::{Config, Environment};
