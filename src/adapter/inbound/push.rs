//! Server push messages.
//!
//! The backend's status channel sends JSON objects tagged by `type`. A
//! status-update broadcast becomes a silent global refresh; an
//! operation-completed notice runs that operation's cascade. Anything else is
//! logged and ignored so that new server-side message types never break an
//! older client.

use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, info};

use crate::domain::{OperationId, RefreshOptions, RefreshOutcome, RefreshSource};
use crate::error::Result;
use crate::infrastructure::coordinator::RefreshCoordinator;
use crate::infrastructure::scheduler::OperationCascadeScheduler;

/// Messages the dispatcher understands.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PushMessage {
    RequestStatusUpdateBroadcast,
    OperationCompleted {
        operation_type: String,
        #[serde(default)]
        payload: Value,
    },
    #[serde(other)]
    Unknown,
}

/// What a dispatched message did.
#[derive(Debug, Clone, PartialEq)]
pub enum Dispatched {
    Refreshed(RefreshOutcome),
    /// `None` when no plan exists for the operation type.
    Cascade(Option<OperationId>),
    /// The message type is not handled, or no scheduler is attached.
    Ignored { kind: String },
}

/// Routes push messages into the refresh core.
#[derive(Debug, Clone)]
pub struct PushDispatcher {
    coordinator: RefreshCoordinator,
    scheduler: Option<OperationCascadeScheduler>,
}

impl PushDispatcher {
    #[must_use]
    pub const fn new(coordinator: RefreshCoordinator) -> Self {
        Self {
            coordinator,
            scheduler: None,
        }
    }

    /// Also route operation notices to `scheduler`.
    #[must_use]
    pub fn with_scheduler(mut self, scheduler: OperationCascadeScheduler) -> Self {
        self.scheduler = Some(scheduler);
        self
    }

    /// Parse and handle one raw message.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Json`](crate::error::Error::Json) if `raw` is not a
    /// JSON object with a string `type` field.
    pub async fn dispatch(&self, raw: &str) -> Result<Dispatched> {
        let value: Value = serde_json::from_str(raw)?;
        let kind = value
            .get("type")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();
        let message: PushMessage = serde_json::from_value(value)?;
        Ok(self.handle(message, kind).await)
    }

    async fn handle(&self, message: PushMessage, kind: String) -> Dispatched {
        match message {
            PushMessage::RequestStatusUpdateBroadcast => {
                debug!("Status update broadcast received");
                let options =
                    RefreshOptions::from_source(RefreshSource::WebsocketBroadcast).silent();
                Dispatched::Refreshed(self.coordinator.trigger_global_refresh(options).await)
            }
            PushMessage::OperationCompleted {
                operation_type,
                payload,
            } => match &self.scheduler {
                Some(scheduler) => Dispatched::Cascade(
                    scheduler
                        .trigger_operation_refresh(&operation_type, payload)
                        .await,
                ),
                None => {
                    debug!(
                        operation_type = %operation_type,
                        "No scheduler attached, ignoring operation notice"
                    );
                    Dispatched::Ignored { kind }
                }
            },
            PushMessage::Unknown => {
                info!(kind = %kind, "Ignoring unhandled push message");
                Dispatched::Ignored { kind }
            }
        }
    }
}
