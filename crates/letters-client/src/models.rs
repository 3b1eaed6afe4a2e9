//! Wire types for the letters API.

use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};

/// A registered outbound letter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Letter {
    /// Server identifier.
    pub id: i64,

    /// Register number. Assigned by the server, reusable once cancelled.
    pub number: i64,

    pub subject: String,

    pub addressee: String,

    /// Registration timestamp, kept in the offset the server sent.
    pub registered_at: DateTime<FixedOffset>,

    /// Username of the registering user.
    pub registered_by_username: String,

    /// Whether the letter has been cancelled.
    #[serde(rename = "isCancelled", alias = "is_cancelled", default)]
    pub is_cancelled: bool,
}

/// Access/refresh pair returned by `POST /api/token/`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenPair {
    pub access: String,
    pub refresh: String,
}

/// Body returned by `POST /api/token/refresh/`.
///
/// `refresh` is only present when the server rotates refresh tokens.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RefreshedToken {
    pub access: String,
    #[serde(default)]
    pub refresh: Option<String>,
}

/// Body returned by `POST /api/password-reset/`.
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct MessageBody {
    pub message: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_letter_deserialization() {
        let json = serde_json::json!({
            "id": 17,
            "number": 42,
            "subject": "Policy renewal",
            "addressee": "ACME Ltd",
            "registered_at": "2024-03-05T09:30:00+03:00",
            "registered_by_username": "alice",
            "isCancelled": false
        });

        let letter: Letter = serde_json::from_value(json).unwrap();
        assert_eq!(letter.id, 17);
        assert_eq!(letter.number, 42);
        assert!(!letter.is_cancelled);
        assert_eq!(letter.registered_at.offset().local_minus_utc(), 3 * 3600);
    }

    #[test]
    fn test_letter_snake_case_flag() {
        let json = serde_json::json!({
            "id": 1,
            "number": 1,
            "subject": "s",
            "addressee": "a",
            "registered_at": "2024-03-05T09:30:00Z",
            "registered_by_username": "bob",
            "is_cancelled": true
        });

        let letter: Letter = serde_json::from_value(json).unwrap();
        assert!(letter.is_cancelled);
    }

    #[test]
    fn test_refreshed_token_without_rotation() {
        let token: RefreshedToken = serde_json::from_str(r#"{"access":"A2"}"#).unwrap();
        assert_eq!(token.access, "A2");
        assert_eq!(token.refresh, None);
    }
}
