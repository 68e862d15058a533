//! Outbound adapters (driven side).

pub mod logging;
