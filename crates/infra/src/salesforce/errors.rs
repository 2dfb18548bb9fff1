//! Salesforce-specific error classification.
//!
//! Distinguishes the failure classes the engines care about: expired or
//! invalid credentials (trigger a refresh, then become fatal), rate limits
//! and server trouble (transient), and per-record validation rejections
//! carrying Salesforce's field-level messages.

use dealsync_domain::{DealSyncError, RemoteFieldError};
use reqwest::StatusCode;
use serde::Deserialize;
use thiserror::Error;

/// Wire shape of one entry in a Salesforce error body.
#[derive(Debug, Deserialize)]
struct ApiError {
    #[serde(rename = "errorCode")]
    error_code: Option<String>,
    message: Option<String>,
    #[serde(default)]
    fields: Vec<String>,
}

/// Classified Salesforce API failure.
#[derive(Debug, Error)]
pub enum SalesforceError {
    #[error("authentication rejected: {0}")]
    Auth(String),

    #[error("rate limited: {0}")]
    RateLimited(String),

    /// Write rejected with field-level messages.
    #[error("validation rejected")]
    Validation(Vec<RemoteFieldError>),

    #[error("server error: {0}")]
    Server(String),

    #[error("unexpected response: {0}")]
    Unexpected(String),
}

impl SalesforceError {
    /// Classify a non-success HTTP response by status and body.
    pub fn from_response(status: StatusCode, body: &str) -> Self {
        match status.as_u16() {
            401 | 403 => Self::Auth(format!("HTTP {status}: {}", summarize(body))),
            429 => Self::RateLimited(summarize(body)),
            400 | 404 | 422 => match parse_field_errors(body) {
                Some(errors) => Self::Validation(errors),
                None => Self::Unexpected(format!("HTTP {status}: {}", summarize(body))),
            },
            500..=599 => Self::Server(format!("HTTP {status}: {}", summarize(body))),
            _ => Self::Unexpected(format!("HTTP {status}: {}", summarize(body))),
        }
    }

    /// Convert into the domain error taxonomy.
    pub fn into_domain_error(self) -> DealSyncError {
        match self {
            Self::Auth(message) => DealSyncError::Auth(message),
            Self::Validation(errors) => DealSyncError::RemoteRejected { errors },
            Self::RateLimited(message) | Self::Server(message) => DealSyncError::Network(message),
            Self::Unexpected(message) => DealSyncError::Internal(message),
        }
    }
}

impl From<SalesforceError> for DealSyncError {
    fn from(err: SalesforceError) -> Self {
        err.into_domain_error()
    }
}

/// Salesforce returns validation failures as a JSON array of
/// `{message, errorCode, fields}` objects.
fn parse_field_errors(body: &str) -> Option<Vec<RemoteFieldError>> {
    let entries: Vec<ApiError> = serde_json::from_str(body).ok()?;
    if entries.is_empty() {
        return None;
    }

    Some(
        entries
            .into_iter()
            .map(|entry| RemoteFieldError {
                error_code: entry.error_code.unwrap_or_else(|| "UNKNOWN".to_string()),
                message: entry.message.unwrap_or_default(),
                fields: entry.fields,
            })
            .collect(),
    )
}

fn summarize(body: &str) -> String {
    const MAX_LEN: usize = 256;
    let trimmed = body.trim();
    if trimmed.len() <= MAX_LEN {
        trimmed.to_string()
    } else {
        let mut cut = MAX_LEN;
        while !trimmed.is_char_boundary(cut) {
            cut -= 1;
        }
        format!("{}...", &trimmed[..cut])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_401_maps_to_auth() {
        let err = SalesforceError::from_response(StatusCode::UNAUTHORIZED, "Session expired");
        assert!(matches!(err, SalesforceError::Auth(_)));
        assert!(matches!(err.into_domain_error(), DealSyncError::Auth(_)));
    }

    #[test]
    fn status_429_maps_to_network() {
        let err = SalesforceError::from_response(StatusCode::TOO_MANY_REQUESTS, "slow down");
        assert!(matches!(err, SalesforceError::RateLimited(_)));
        assert!(matches!(err.into_domain_error(), DealSyncError::Network(_)));
    }

    #[test]
    fn validation_body_parses_field_messages() {
        let body = r#"[{
            "message": "Required fields are missing: [CloseDate]",
            "errorCode": "REQUIRED_FIELD_MISSING",
            "fields": ["CloseDate"]
        }]"#;

        let err = SalesforceError::from_response(StatusCode::BAD_REQUEST, body);
        match err {
            SalesforceError::Validation(errors) => {
                assert_eq!(errors.len(), 1);
                assert_eq!(errors[0].error_code, "REQUIRED_FIELD_MISSING");
                assert_eq!(errors[0].fields, vec!["CloseDate".to_string()]);
            }
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[test]
    fn validation_converts_to_remote_rejected() {
        let body = r#"[{"message": "bad email", "errorCode": "INVALID_EMAIL_ADDRESS"}]"#;
        let err = SalesforceError::from_response(StatusCode::BAD_REQUEST, body);
        match err.into_domain_error() {
            DealSyncError::RemoteRejected { errors } => {
                assert_eq!(errors[0].error_code, "INVALID_EMAIL_ADDRESS");
            }
            other => panic!("expected RemoteRejected, got {other:?}"),
        }
    }

    #[test]
    fn unparseable_400_body_is_unexpected_not_validation() {
        let err = SalesforceError::from_response(StatusCode::BAD_REQUEST, "<html>oops</html>");
        assert!(matches!(err, SalesforceError::Unexpected(_)));
    }

    #[test]
    fn status_503_maps_to_server() {
        let err = SalesforceError::from_response(StatusCode::SERVICE_UNAVAILABLE, "maintenance");
        assert!(matches!(err, SalesforceError::Server(_)));
        assert!(matches!(err.into_domain_error(), DealSyncError::Network(_)));
    }

    #[test]
    fn long_bodies_are_truncated() {
        let body = "x".repeat(1000);
        let err = SalesforceError::from_response(StatusCode::INTERNAL_SERVER_ERROR, &body);
        let rendered = err.to_string();
        assert!(rendered.len() < 400);
        assert!(rendered.contains("..."));
    }
}
