//! Session state and its persistence.
//!
//! A [`Session`] holds the token pair plus the username it was issued to.
//! Stores implement [`SessionStore`]; the client only ever talks to the
//! trait, so tests swap in [`MemorySessionStore`] and binaries use
//! [`FileSessionStore`].

mod file;
mod memory;

pub use file::FileSessionStore;
pub use memory::MemorySessionStore;

use serde::{Deserialize, Serialize};

use crate::error::ApiError;
use crate::models::{RefreshedToken, TokenPair};

/// Authenticated identity held by the client.
///
/// The access token and username are either both present or both absent.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    access_token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    refresh_token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    username: Option<String>,
}

impl Session {
    /// The unauthenticated session.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Session created by a successful login.
    pub fn new(tokens: &TokenPair, username: &str) -> Self {
        Self {
            access_token: Some(tokens.access.clone()),
            refresh_token: Some(tokens.refresh.clone()),
            username: Some(username.to_string()),
        }
    }

    pub fn access_token(&self) -> Option<&str> {
        self.access_token.as_deref()
    }

    pub fn refresh_token(&self) -> Option<&str> {
        self.refresh_token.as_deref()
    }

    pub fn username(&self) -> Option<&str> {
        self.username.as_deref()
    }

    pub fn is_authenticated(&self) -> bool {
        self.access_token.is_some() && self.username.is_some()
    }

    /// Apply a refresh result. An unauthenticated session stays empty.
    pub fn refreshed(mut self, token: &RefreshedToken) -> Self {
        if !self.is_authenticated() {
            return Self::empty();
        }
        self.access_token = Some(token.access.clone());
        if let Some(refresh) = &token.refresh {
            self.refresh_token = Some(refresh.clone());
        }
        self
    }

    /// Drop records that break the access-token/username pairing.
    pub(crate) fn normalized(self) -> Self {
        if self.is_authenticated() {
            self
        } else {
            Self::empty()
        }
    }
}

/// Durable holder of the current [`Session`].
pub trait SessionStore: Send + Sync {
    /// Current session (empty when logged out).
    fn get(&self) -> Session;

    /// Replace the stored session.
    fn set(&self, session: Session) -> Result<(), ApiError>;

    /// Remove every stored field.
    ///
    /// Returns `true` if an authenticated session was removed. Of several
    /// concurrent callers at most one sees `true`.
    fn clear(&self) -> Result<bool, ApiError>;
}

/// Receives session lifecycle events from the client.
///
/// All methods default to no-ops.
pub trait SessionListener: Send + Sync {
    fn on_login(&self, _tokens: &TokenPair, _username: &str) {}

    fn on_logout(&self) {}

    /// The session was torn down because it could not be refreshed.
    fn on_session_expired(&self) {}
}

/// Listener that ignores every event.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopListener;

impl SessionListener for NoopListener {}

#[cfg(test)]
mod tests {
    use super::*;

    fn tokens() -> TokenPair {
        TokenPair {
            access: "A1".to_string(),
            refresh: "R1".to_string(),
        }
    }

    #[test]
    fn test_new_session_populates_all_fields() {
        let session = Session::new(&tokens(), "alice");
        assert_eq!(session.access_token(), Some("A1"));
        assert_eq!(session.refresh_token(), Some("R1"));
        assert_eq!(session.username(), Some("alice"));
        assert!(session.is_authenticated());
        assert!(!Session::empty().is_authenticated());
    }

    #[test]
    fn test_refreshed_keeps_refresh_token() {
        let session = Session::new(&tokens(), "alice").refreshed(&RefreshedToken {
            access: "A2".to_string(),
            refresh: None,
        });
        assert_eq!(session.access_token(), Some("A2"));
        assert_eq!(session.refresh_token(), Some("R1"));
        assert_eq!(session.username(), Some("alice"));
    }

    #[test]
    fn test_refreshed_rotates_refresh_token() {
        let session = Session::new(&tokens(), "alice").refreshed(&RefreshedToken {
            access: "A2".to_string(),
            refresh: Some("R2".to_string()),
        });
        assert_eq!(session.refresh_token(), Some("R2"));
    }

    #[test]
    fn test_refreshed_empty_stays_empty() {
        let session = Session::empty().refreshed(&RefreshedToken {
            access: "A2".to_string(),
            refresh: None,
        });
        assert_eq!(session, Session::empty());
    }

    #[test]
    fn test_persisted_keys() {
        let json = serde_json::to_value(Session::new(&tokens(), "alice")).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"accessToken": "A1", "refreshToken": "R1", "username": "alice"})
        );
        assert_eq!(serde_json::to_string(&Session::empty()).unwrap(), "{}");
    }

    #[test]
    fn test_normalized_drops_half_sessions() {
        let half: Session = serde_json::from_str(r#"{"accessToken":"A1"}"#).unwrap();
        assert_eq!(half.normalized(), Session::empty());

        let full = Session::new(&tokens(), "alice");
        assert_eq!(full.clone().normalized(), full);
    }
}
