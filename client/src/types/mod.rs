pub mod error;

use serde::{Deserialize, Serialize};
use std::fmt;

/// Classification of a handshake step outcome
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StatusCode {
    Success,
    /// Transient connectivity or HTTP-layer failure
    NetworkError,
    /// Bad or missing credentials, the end user has to act
    UserFixRequired,
    /// No compatible protocol or server misconfiguration, an operator has to act
    AdminFixRequired,
}

impl StatusCode {
    /// Classify a non-2xx HTTP status returned by the server
    pub fn from_http_status(status: u16) -> Self {
        match status {
            401 => Self::UserFixRequired,
            403 => Self::AdminFixRequired,
            _ => Self::NetworkError,
        }
    }
}

impl fmt::Display for StatusCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Success => "success",
            Self::NetworkError => "network error",
            Self::UserFixRequired => "user fix required",
            Self::AdminFixRequired => "admin fix required",
        };
        f.write_str(s)
    }
}

/// Outcome of a single handshake step
///
/// `detail` is only ever set on non-success.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepResult {
    pub status: StatusCode,
    pub detail: Option<String>,
}

impl StepResult {
    pub fn success() -> Self {
        Self {
            status: StatusCode::Success,
            detail: None,
        }
    }

    pub fn failure(status: StatusCode, detail: impl Into<String>) -> Self {
        debug_assert_ne!(status, StatusCode::Success);
        Self {
            status,
            detail: Some(detail.into()),
        }
    }

    pub fn network_error(detail: impl Into<String>) -> Self {
        Self::failure(StatusCode::NetworkError, detail)
    }

    pub fn user_fix(detail: impl Into<String>) -> Self {
        Self::failure(StatusCode::UserFixRequired, detail)
    }

    pub fn admin_fix(detail: impl Into<String>) -> Self {
        Self::failure(StatusCode::AdminFixRequired, detail)
    }

    pub fn is_success(&self) -> bool {
        self.status == StatusCode::Success
    }
}

impl fmt::Display for StepResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.detail {
            Some(detail) => write!(f, "{} ({})", self.status, detail),
            None => write!(f, "{}", self.status),
        }
    }
}
