//! Ports: capability interfaces implemented outside the scheduler core.

pub mod refresh;

pub use refresh::{provider_fn, FnProvider, ProviderResult, RefreshProvider, SharedProvider};
