//! Infrastructure layer.
//!
//! Everything stateful: configuration, the component registry, the refresh
//! coordinator, the cascade scheduler, and the event bus they report through.
//!
//! # Submodules
//!
//! - [`bootstrap`] - Composition root wiring one refresh core per config
//! - [`config`] - Configuration loading and validation
//! - [`coordinator`] - Global refresh passes and auto-refresh
//! - [`event`] - Operation lifecycle event bus
//! - [`registry`] - Component registry
//! - [`scheduler`] - Operation cascade scheduler

pub mod bootstrap;
pub mod config;
pub mod coordinator;
pub mod event;
pub mod registry;
pub mod scheduler;

pub(crate) mod task;
