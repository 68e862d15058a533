//! Operation records tracked by the cascade scheduler.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::id::OperationId;

/// Lifecycle state of an operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum OperationStatus {
    Running,
    Completed,
    Failed,
}

impl OperationStatus {
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        !matches!(self, Self::Running)
    }
}

impl fmt::Display for OperationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Running => f.write_str("running"),
            Self::Completed => f.write_str("completed"),
            Self::Failed => f.write_str("failed"),
        }
    }
}

/// One triggered operation and the state of its immediate wave.
///
/// `Running` moves to exactly one of `Completed` or `Failed`; both are final.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OperationRecord {
    pub id: OperationId,
    #[serde(rename = "type")]
    pub operation_type: String,
    pub payload: serde_json::Value,
    pub start_time: DateTime<Utc>,
    pub end_time: Option<DateTime<Utc>>,
    pub status: OperationStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl OperationRecord {
    #[must_use]
    pub fn start(
        id: OperationId,
        operation_type: impl Into<String>,
        payload: serde_json::Value,
        start_time: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            operation_type: operation_type.into(),
            payload,
            start_time,
            end_time: None,
            status: OperationStatus::Running,
            error: None,
        }
    }

    /// Move to `Completed`. Returns false if the record was already terminal.
    pub fn complete(&mut self, at: DateTime<Utc>) -> bool {
        if self.status.is_terminal() {
            return false;
        }
        self.status = OperationStatus::Completed;
        self.end_time = Some(at);
        true
    }

    /// Move to `Failed`. Returns false if the record was already terminal.
    pub fn fail(&mut self, error: impl Into<String>, at: DateTime<Utc>) -> bool {
        if self.status.is_terminal() {
            return false;
        }
        self.status = OperationStatus::Failed;
        self.error = Some(error.into());
        self.end_time = Some(at);
        true
    }
}
