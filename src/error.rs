//! Error types for the knowledge base agent

use thiserror::Error;

/// Result type alias for agent operations
pub type Result<T> = std::result::Result<T, AgentError>;

/// Errors that can occur while dispatching agent operations
#[derive(Error, Debug)]
pub enum AgentError {
    /// Inbound payload or envelope failed schema validation
    #[error("Validation error: {0}")]
    Validation(String),

    /// `func_name` is not one of the dispatchable operations
    #[error("Invalid function name: {0}")]
    UnknownOperation(String),

    /// The node reply did not match its declared shape
    #[error("Malformed knowledge base reply: {0}")]
    Decode(String),

    /// The node reported a failure
    #[error("Knowledge base error: {0}")]
    Backend(String),

    #[error("Transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Signing error: {0}")]
    Signing(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl AgentError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn decode(msg: impl Into<String>) -> Self {
        Self::Decode(msg.into())
    }

    pub fn backend(msg: impl Into<String>) -> Self {
        Self::Backend(msg.into())
    }

    pub fn signing(msg: impl Into<String>) -> Self {
        Self::Signing(msg.into())
    }

    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }
}
