//! Error types used throughout the application

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A single field-level rejection returned by the remote CRM for a write.
///
/// Mirrors the Salesforce REST error body
/// (`[{"message": ..., "errorCode": ..., "fields": [...]}]`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteFieldError {
    pub error_code: String,
    pub message: String,
    #[serde(default)]
    pub fields: Vec<String>,
}

impl std::fmt::Display for RemoteFieldError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.fields.is_empty() {
            write!(f, "{}: {}", self.error_code, self.message)
        } else {
            write!(f, "{} [{}]: {}", self.error_code, self.fields.join(", "), self.message)
        }
    }
}

/// Main error type for DealSync
#[derive(Error, Debug, Serialize, Deserialize)]
#[serde(tag = "type", content = "message")]
pub enum DealSyncError {
    #[error("Database error: {0}")]
    Database(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Authentication error: {0}")]
    Auth(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// The remote system rejected a create/update with field-level messages.
    #[error("Remote validation failed: {}", format_remote_errors(.errors))]
    RemoteRejected { errors: Vec<RemoteFieldError> },

    #[error("Internal error: {0}")]
    Internal(String),
}

fn format_remote_errors(errors: &[RemoteFieldError]) -> String {
    errors.iter().map(ToString::to_string).collect::<Vec<_>>().join("; ")
}

/// Result type alias for DealSync operations
pub type Result<T> = std::result::Result<T, DealSyncError>;
