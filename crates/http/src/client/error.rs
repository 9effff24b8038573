//! Client error types

use std::sync::Arc;
use thiserror::Error;
use todo_core::CoreError;

/// Client error types
#[derive(Debug, Error)]
pub enum ClientError {
    /// Network or transport failure; never retried
    #[error("Request failed: {0}")]
    Network(#[from] reqwest::Error),

    /// 401 `token.expired` that survived a refresh and replay
    #[error("Access token expired")]
    AuthExpired,

    /// 401 with any other code, or none; the session has been invalidated
    #[error("Authentication rejected ({})", .code.as_deref().unwrap_or("no code"))]
    AuthInvalid { code: Option<String> },

    /// The refresh call failed; shared by every request queued behind it
    #[error("Token refresh failed: {0}")]
    RefreshFailed(Arc<ClientError>),

    /// No refresh token is stored
    #[error("No refresh token available")]
    MissingRefreshToken,

    /// The refresh driver went away without settling the request
    #[error("Token refresh was abandoned")]
    RefreshAborted,

    /// The session was signed out while a refresh was in flight
    #[error("Session was invalidated during refresh")]
    SessionInvalidated,

    /// Sign-in rejected by the server
    #[error("Invalid credentials: {0}")]
    InvalidCredentials(String),

    /// Server returned an error status
    #[error("Server error {status}: {message}")]
    Status { status: u16, message: String },

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Credential store failure
    #[error("Credential store error: {0}")]
    Store(#[from] CoreError),

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    Configuration(String),
}

impl ClientError {
    /// Create error from HTTP status code
    pub fn from_status(status: reqwest::StatusCode, message: String) -> Self {
        Self::Status {
            status: status.as_u16(),
            message,
        }
    }

    /// HTTP status carried by the error, if any
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Status { status, .. } => Some(*status),
            Self::AuthExpired | Self::AuthInvalid { .. } => Some(401),
            Self::Network(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }

    /// Whether the access token expired and could not be renewed
    pub fn is_auth_expired(&self) -> bool {
        matches!(self, Self::AuthExpired)
    }

    /// Whether the error ended the session
    pub fn is_auth_failure(&self) -> bool {
        matches!(
            self,
            Self::AuthInvalid { .. } | Self::RefreshFailed(_) | Self::SessionInvalidated
        )
    }
}

impl From<::config::ConfigError> for ClientError {
    fn from(err: ::config::ConfigError) -> Self {
        Self::Configuration(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn auth_invalid_display_names_the_code() {
        let err = ClientError::AuthInvalid {
            code: Some("token.invalid".into()),
        };
        assert_eq!(err.to_string(), "Authentication rejected (token.invalid)");

        let err = ClientError::AuthInvalid { code: None };
        assert_eq!(err.to_string(), "Authentication rejected (no code)");
    }

    #[test]
    fn refresh_failure_wraps_cause() {
        let err = ClientError::RefreshFailed(Arc::new(ClientError::MissingRefreshToken));
        assert!(err.is_auth_failure());
        assert_eq!(
            err.to_string(),
            "Token refresh failed: No refresh token available"
        );
    }

    #[test]
    fn status_classification() {
        let err = ClientError::from_status(reqwest::StatusCode::NOT_FOUND, "missing".into());
        assert_eq!(err.status(), Some(404));
        assert!(!err.is_auth_failure());
        assert_eq!(ClientError::AuthExpired.status(), Some(401));
    }
}
