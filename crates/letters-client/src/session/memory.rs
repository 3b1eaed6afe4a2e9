//! In-process session store.

use std::sync::{PoisonError, RwLock};

use super::{Session, SessionStore};
use crate::error::ApiError;

/// Session store that lives only as long as the process.
#[derive(Debug, Default)]
pub struct MemorySessionStore {
    session: RwLock<Session>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store pre-populated with `session`.
    pub fn with_session(session: Session) -> Self {
        Self {
            session: RwLock::new(session.normalized()),
        }
    }
}

impl SessionStore for MemorySessionStore {
    fn get(&self) -> Session {
        self.session
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn set(&self, session: Session) -> Result<(), ApiError> {
        *self.session.write().unwrap_or_else(PoisonError::into_inner) = session.normalized();
        Ok(())
    }

    fn clear(&self) -> Result<bool, ApiError> {
        let mut session = self.session.write().unwrap_or_else(PoisonError::into_inner);
        let removed = std::mem::take(&mut *session);
        Ok(removed.is_authenticated())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::TokenPair;

    #[test]
    fn test_set_get_clear() {
        let store = MemorySessionStore::new();
        assert_eq!(store.get(), Session::empty());

        let tokens = TokenPair {
            access: "A1".to_string(),
            refresh: "R1".to_string(),
        };
        store.set(Session::new(&tokens, "alice")).unwrap();
        assert_eq!(store.get().access_token(), Some("A1"));

        assert!(store.clear().unwrap());
        assert_eq!(store.get(), Session::empty());
        assert!(!store.clear().unwrap());
    }
}
