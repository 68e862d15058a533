//! Hyperdash - priority-scheduled refresh coordination for dashboard views.
//!
//! A dashboard is made of independently loading views (cluster status, pod
//! lists, training monitors). This crate keeps them fresh without storms of
//! overlapping requests:
//!
//! - **Global passes** refresh every subscribed component with bounded
//!   concurrency, highest priority first, at most one pass at a time.
//! - **Operation cascades** refresh just the views a user operation affects,
//!   immediately and again on delayed timers while the backend catches up.
//!
//! # Modules
//!
//! - [`domain`] - Plain data: ids, plans, pass results, operation records
//! - [`port`] - The [`RefreshProvider`](port::RefreshProvider) capability
//! - [`infrastructure`] - Config, registry, coordinator, scheduler, events
//! - [`adapter`] - Push message dispatch, CLI, and a logging provider
//! - [`error`] - Error types for the crate
//!
//! # Example
//!
//! ```no_run
//! use hyperdash::domain::{RefreshOptions, SubscribeOptions};
//! use hyperdash::infrastructure::bootstrap::RefreshCore;
//! use hyperdash::infrastructure::config::Config;
//! use hyperdash::port::provider_fn;
//!
//! # async fn demo() -> hyperdash::error::Result<()> {
//! let config = Config::load("hyperdash.toml")?;
//! let core = RefreshCore::from_config(&config);
//!
//! core.coordinator().subscribe(
//!     "cluster-status",
//!     provider_fn(|| async { Ok(()) }),
//!     SubscribeOptions::default(),
//! );
//!
//! let outcome = core
//!     .coordinator()
//!     .trigger_global_refresh(RefreshOptions::default())
//!     .await;
//! assert!(outcome.success());
//!
//! core.scheduler()
//!     .trigger_operation_refresh("model-deploy", serde_json::json!({ "model": "llama" }))
//!     .await;
//! core.destroy();
//! # Ok(())
//! # }
//! ```

pub mod adapter;
pub mod domain;
pub mod error;
pub mod infrastructure;
pub mod port;

#[cfg(any(test, feature = "testkit"))]
pub mod testkit;
