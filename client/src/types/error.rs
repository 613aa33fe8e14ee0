//! Process-level error types
//!
//! Handshake steps never fail through this type: they report a
//! [`StepResult`](super::StepResult) instead. `EngineError` covers what
//! happens around the handshake:
//! - Loading and parsing configuration
//! - Validating the server url
//! - Misusing the engine (starting it twice)

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Engine error type for setup and lifecycle operations
#[derive(Debug, Clone, Error, Serialize, Deserialize)]
#[serde(tag = "type", content = "message")]
pub enum EngineError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("No configuration file found")]
    ConfigNotFound,

    #[error("Handshake already in progress")]
    AlreadyRunning,

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("IO error: {0}")]
    Io(String),

    #[error("{0}")]
    Other(String),
}

impl From<std::io::Error> for EngineError {
    fn from(err: std::io::Error) -> Self {
        EngineError::Io(err.to_string())
    }
}

impl From<toml::de::Error> for EngineError {
    fn from(err: toml::de::Error) -> Self {
        EngineError::Config(err.to_string())
    }
}

impl From<serde_json::Error> for EngineError {
    fn from(err: serde_json::Error) -> Self {
        EngineError::Parse(err.to_string())
    }
}

impl From<url::ParseError> for EngineError {
    fn from(err: url::ParseError) -> Self {
        EngineError::Config(format!("Invalid server url: {}", err))
    }
}

/// Result type alias using EngineError
pub type Result<T> = std::result::Result<T, EngineError>;
