//! Error types for the router plugins

/// Result type alias using the router's Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for masking, guardrail and assembly operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Configuration and pipeline assembly errors
    #[error("configuration error: {0}")]
    Config(String),

    /// Rule construction errors (pattern compilation)
    #[error("rule error: {0}")]
    Rule(String),

    /// Unexpected fault inside a stage
    #[error("stage error: {0}")]
    Stage(String),

    /// Remote guardrail failures (transport, non-2xx, malformed body)
    #[error("guardrail error: {0}")]
    Guardrail(String),

    /// Network/IO errors
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization errors
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Timeout errors
    #[error("operation timed out")]
    Timeout,

    /// Generic internal errors
    #[error("internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Create a new configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create a new rule error
    pub fn rule(msg: impl Into<String>) -> Self {
        Self::Rule(msg.into())
    }

    /// Create a new stage error
    pub fn stage(msg: impl Into<String>) -> Self {
        Self::Stage(msg.into())
    }

    /// Create a new guardrail error
    pub fn guardrail(msg: impl Into<String>) -> Self {
        Self::Guardrail(msg.into())
    }

    /// Create a new internal error
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    /// Whether this error was raised while assembling pipelines
    pub fn is_config(&self) -> bool {
        matches!(self, Self::Config(_))
    }
}
