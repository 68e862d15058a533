use thiserror::Error;

/// Configuration-related errors with structured variants.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("missing required field: {field}")]
    MissingField { field: &'static str },

    #[error("invalid value for {field}: {reason}")]
    InvalidValue { field: &'static str, reason: String },

    #[error("operation '{operation}' references unknown component '{component}'")]
    UnknownComponent {
        operation: String,
        component: String,
    },

    #[error("operation '{operation}' has negative delay {delay_ms}ms")]
    NegativeDelay { operation: String, delay_ms: i64 },

    #[error("failed to read config file: {0}")]
    ReadFile(#[source] std::io::Error),

    #[error("failed to parse config: {0}")]
    Parse(#[source] toml::de::Error),
}

/// Refresh scheduling errors.
///
/// Component-level variants never escape a refresh pass; they are recorded
/// in the pass and logged.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RefreshError {
    #[error("refresh timeout for {component_id} after {timeout_ms}ms")]
    ComponentTimeout {
        component_id: String,
        timeout_ms: u64,
    },

    #[error("refresh failed for {component_id}: {message}")]
    ComponentFailure {
        component_id: String,
        message: String,
    },

    #[error("no refresh plan configured for operation: {0}")]
    UnknownOperationType(String),

    #[error("internal scheduler error: {0}")]
    InternalScheduler(String),
}

impl RefreshError {
    /// The error text without the component prefix.
    #[must_use]
    pub fn detail(&self) -> String {
        match self {
            Self::ComponentTimeout { timeout_ms, .. } => format!("timed out after {timeout_ms}ms"),
            Self::ComponentFailure { message, .. } => message.clone(),
            Self::UnknownOperationType(op) => format!("unknown operation type {op}"),
            Self::InternalScheduler(message) => message.clone(),
        }
    }
}

#[derive(Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Refresh(#[from] RefreshError),

    #[error("JSON parsing error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
