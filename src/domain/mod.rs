//! Scheduler domain types: identifiers, plans, passes, and operations.

pub mod component;
pub mod id;
pub mod operation;
pub mod pass;
pub mod plan;

pub use component::{ComponentStatus, SubscribeOptions};
pub use id::{ComponentId, OperationId, PassId};
pub use operation::{OperationRecord, OperationStatus};
pub use pass::{
    ComponentFailed, ComponentRefreshed, FailureKind, RefreshOptions, RefreshOutcome, RefreshPass,
    RefreshSource, SkipReason,
};
pub use plan::{CascadeConfig, CascadePlan, ComponentRef, DelayedWave, ALL_COMPONENTS};
