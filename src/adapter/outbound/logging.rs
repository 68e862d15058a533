//! A provider that only logs.
//!
//! Stands in for a real data source when the binary runs without a UI: each
//! refresh is one structured log line, which makes pass scheduling and
//! cascade timing visible from the terminal.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use tracing::info;

use crate::domain::ComponentId;
use crate::port::{ProviderResult, RefreshProvider, SharedProvider};

pub struct LogProvider {
    component_id: ComponentId,
    refreshes: AtomicU64,
}

impl LogProvider {
    #[must_use]
    pub fn new(component_id: ComponentId) -> Self {
        Self {
            component_id,
            refreshes: AtomicU64::new(0),
        }
    }

    #[must_use]
    pub fn shared(component_id: ComponentId) -> SharedProvider {
        Arc::new(Self::new(component_id))
    }

    /// Refreshes served so far.
    #[must_use]
    pub fn refreshes(&self) -> u64 {
        self.refreshes.load(Ordering::Relaxed)
    }
}

#[async_trait]
impl RefreshProvider for LogProvider {
    async fn refresh(&self) -> ProviderResult {
        let refreshes = self.refreshes.fetch_add(1, Ordering::Relaxed) + 1;
        info!(component_id = %self.component_id, refreshes, "Component data refreshed");
        Ok(())
    }
}
