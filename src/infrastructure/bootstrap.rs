//! Composition root: one registry, coordinator, and scheduler per [`Config`].

use std::sync::Arc;

use tracing::info;

use crate::infrastructure::config::Config;
use crate::infrastructure::coordinator::RefreshCoordinator;
use crate::infrastructure::registry::ComponentRegistry;
use crate::infrastructure::scheduler::OperationCascadeScheduler;

/// The wired refresh core.
///
/// Independent instances share nothing, so tests can build as many as they
/// like.
#[derive(Debug, Clone)]
pub struct RefreshCore {
    coordinator: RefreshCoordinator,
    scheduler: OperationCascadeScheduler,
}

impl RefreshCore {
    #[must_use]
    pub fn from_config(config: &Config) -> Self {
        let registry = Arc::new(ComponentRegistry::new(config.priorities.clone()));
        let coordinator = RefreshCoordinator::new(registry, config.refresh.clone());
        let scheduler =
            OperationCascadeScheduler::new(coordinator.clone(), config.cascade().clone());

        info!(
            environment = %config.environment,
            catalog = config.priorities.len(),
            operations = config.cascade().len(),
            max_concurrent = config.refresh.max_concurrent_refresh,
            timeout_ms = config.refresh.refresh_timeout_ms,
            "Refresh core built"
        );

        Self {
            coordinator,
            scheduler,
        }
    }

    /// Start whatever the config asks to run in the background. Needs a
    /// tokio runtime.
    pub fn start(&self) {
        if self.coordinator.settings().auto_refresh_enabled {
            self.coordinator.set_auto_refresh(true, None);
        }
    }

    #[must_use]
    pub fn registry(&self) -> &Arc<ComponentRegistry> {
        self.coordinator.registry()
    }

    #[must_use]
    pub const fn coordinator(&self) -> &RefreshCoordinator {
        &self.coordinator
    }

    #[must_use]
    pub const fn scheduler(&self) -> &OperationCascadeScheduler {
        &self.scheduler
    }

    /// Destroy the scheduler, then the coordinator.
    pub fn destroy(&self) {
        self.scheduler.destroy();
        self.coordinator.destroy();
    }
}
