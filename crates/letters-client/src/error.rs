//! API client error types.

use thiserror::Error;

/// Message used when a failed response carries no readable detail.
pub const UNKNOWN_SERVER_ERROR: &str = "An unknown server error occurred.";

/// Errors surfaced by the letters API client.
///
/// Every variant is `Clone` so a single refresh outcome can be handed to all
/// callers queued behind it.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ApiError {
    /// Transport-level failure (connection refused, timeout, reset).
    #[error("Network error: {0}")]
    Network(String),

    /// The access token was rejected. Absorbed by the refresh coordinator.
    #[error("Access token expired")]
    AuthExpired,

    /// The session can no longer be recovered; the user must log in again.
    #[error("Session expired: {0}")]
    SessionInvalid(String),

    /// Any other non-2xx response.
    #[error("{message}")]
    Server { status: u16, message: String },

    /// Success status, but the body was not the JSON we expected.
    #[error("Malformed response: {0}")]
    MalformedResponse(String),

    /// Session store read/write failure.
    #[error("Storage error: {0}")]
    Storage(String),

    /// Invalid client configuration.
    #[error("Configuration error: {0}")]
    Configuration(String),
}

impl ApiError {
    /// True when the view layer should drop its state and return to login.
    pub fn is_session_invalid(&self) -> bool {
        matches!(self, ApiError::SessionInvalid(_))
    }

    /// HTTP status of a server error, if any.
    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::Server { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Build a [`ApiError::Server`] from a failed response body.
    ///
    /// Prefers a `detail` field, then `error`, then the raw JSON text. A body
    /// that is not JSON at all yields [`UNKNOWN_SERVER_ERROR`].
    pub fn from_error_body(status: u16, body: &str) -> Self {
        let message = match serde_json::from_str::<serde_json::Value>(body) {
            Ok(value) => error_detail(&value).unwrap_or_else(|| value.to_string()),
            Err(_) => UNKNOWN_SERVER_ERROR.to_string(),
        };
        ApiError::Server { status, message }
    }
}

fn error_detail(value: &serde_json::Value) -> Option<String> {
    ["detail", "error"].iter().find_map(|key| match value.get(*key)? {
        serde_json::Value::Null => None,
        serde_json::Value::String(s) if s.is_empty() => None,
        serde_json::Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    })
}

impl From<reqwest::Error> for ApiError {
    fn from(e: reqwest::Error) -> Self {
        ApiError::Network(e.to_string())
    }
}

impl From<serde_json::Error> for ApiError {
    fn from(e: serde_json::Error) -> Self {
        ApiError::MalformedResponse(e.to_string())
    }
}

impl From<std::io::Error> for ApiError {
    fn from(e: std::io::Error) -> Self {
        ApiError::Storage(e.to_string())
    }
}
