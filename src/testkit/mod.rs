//! Shared test utilities available to both unit and integration tests.
//!
//! Enabled via `#[cfg(test)]` (unit tests) or the `testkit` feature
//! (integration tests).
//!
//! # Modules
//!
//! - [`provider`] - Scripted [`RefreshProvider`](crate::port::RefreshProvider)
//!   implementations: succeed, succeed after a delay, fail, hang, panic.
//! - [`config`] - Canonical test configurations (refresh settings, plans).

pub mod config;
pub mod provider;
