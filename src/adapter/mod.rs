//! Adapters around the refresh core.

pub mod inbound;
pub mod outbound;
