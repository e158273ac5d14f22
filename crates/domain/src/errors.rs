//! Error types used throughout the application

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Main error type for OrderBridge
#[derive(Error, Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "message")]
pub enum BridgeError {
    /// Network or HTTP failure reaching the remote system. Retryable.
    #[error("Transport error: {0}")]
    Transport(String),

    /// The remote system returned a declared business error
    /// (`status == "ERROR"` in the response body).
    #[error("Remote error {code}: {message}")]
    Remote { code: String, message: String },

    /// A referenced entity is absent locally. Treated as deferral by the
    /// processors, never as a failure.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Malformed inbound payload. Rejected, not retried.
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl BridgeError {
    /// Whether the router may re-queue work that failed with this error.
    ///
    /// Auth-class remote errors and validation failures never heal on their
    /// own, so retrying them only burns the retry budget.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Transport(_) | Self::Database(_) | Self::Internal(_) => true,
            Self::Remote { code, .. } => !is_auth_code(code),
            Self::NotFound(_) | Self::Validation(_) | Self::Config(_) => false,
        }
    }
}

fn is_auth_code(code: &str) -> bool {
    let upper = code.to_ascii_uppercase();
    upper.starts_with("ERROR_AUTH") || upper == "ERROR_BAD_TOKEN"
}

/// Result type alias for OrderBridge operations
pub type Result<T> = std::result::Result<T, BridgeError>;
