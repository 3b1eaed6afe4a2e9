//! Typed letters API operations.

use std::sync::Arc;

use serde::de::DeserializeOwned;

use super::executor::{ApiRequest, RawResponse, RequestExecutor};
use super::refresh::RefreshCoordinator;
use super::{cancel_path, restore_path, LETTERS_PATH, PASSWORD_RESET_PATH, SIGNUP_PATH, TOKEN_PATH};
use crate::config::ClientConfig;
use crate::error::ApiError;
use crate::models::{Letter, MessageBody, TokenPair};
use crate::session::{NoopListener, Session, SessionListener, SessionStore};

/// Client for the letters register API.
///
/// Cheap to clone; clones share the session store and the refresh state.
#[derive(Clone)]
pub struct LettersClient {
    coordinator: RefreshCoordinator,
    store: Arc<dyn SessionStore>,
    listener: Arc<dyn SessionListener>,
}

impl LettersClient {
    /// Create a client that reports no session events.
    pub fn new(config: &ClientConfig, store: Arc<dyn SessionStore>) -> Result<Self, ApiError> {
        Self::with_listener(config, store, Arc::new(NoopListener))
    }

    pub fn with_listener(
        config: &ClientConfig,
        store: Arc<dyn SessionStore>,
        listener: Arc<dyn SessionListener>,
    ) -> Result<Self, ApiError> {
        let executor = RequestExecutor::new(config, Arc::clone(&store))?;
        let coordinator =
            RefreshCoordinator::new(executor, Arc::clone(&store), Arc::clone(&listener));

        Ok(Self {
            coordinator,
            store,
            listener,
        })
    }

    pub fn base_url(&self) -> &str {
        self.coordinator.executor().base_url()
    }

    pub fn coordinator(&self) -> &RefreshCoordinator {
        &self.coordinator
    }

    /// Currently stored session.
    pub fn session(&self) -> Session {
        self.store.get()
    }

    /// Exchange credentials for a token pair without touching the session.
    pub async fn authenticate(&self, username: &str, password: &str) -> Result<TokenPair, ApiError> {
        let request = ApiRequest::post(TOKEN_PATH)
            .with_body(serde_json::json!({
                "username": username,
                "password": password,
            }))
            .public();

        let response = self.coordinator.execute(request).await?;
        expect_body(&response, "login")
    }

    /// Authenticate and make the result the current session.
    pub async fn login(&self, username: &str, password: &str) -> Result<Session, ApiError> {
        let tokens = self.authenticate(username, password).await?;
        let session = Session::new(&tokens, username);
        self.store.set(session.clone())?;

        tracing::info!(username, "Logged in");
        self.listener.on_login(&tokens, username);
        Ok(session)
    }

    /// Forget the current session.
    pub fn logout(&self) -> Result<(), ApiError> {
        self.store.clear()?;
        tracing::info!("Logged out");
        self.listener.on_logout();
        Ok(())
    }

    /// Ask the server to email fresh credentials to `email`.
    pub async fn request_signup(&self, email: &str) -> Result<(), ApiError> {
        let request = ApiRequest::post(SIGNUP_PATH)
            .with_body(serde_json::json!({ "email": email }))
            .public();

        self.coordinator.execute(request).await?;
        Ok(())
    }

    /// Ask for a password reset link; returns the server's message.
    pub async fn request_password_reset(&self, email: &str) -> Result<String, ApiError> {
        let request = ApiRequest::post(PASSWORD_RESET_PATH)
            .with_body(serde_json::json!({ "email": email }))
            .public();

        let response = self.coordinator.execute(request).await?;
        let body: MessageBody = expect_body(&response, "password reset")?;
        Ok(body.message)
    }

    /// All letters, in server order.
    pub async fn list_letters(&self) -> Result<Vec<Letter>, ApiError> {
        let response = self
            .coordinator
            .execute(ApiRequest::get(LETTERS_PATH))
            .await?;
        expect_body(&response, "letter list")
    }

    /// Register a new letter; the server assigns its number.
    pub async fn create_letter(&self, subject: &str, addressee: &str) -> Result<Letter, ApiError> {
        let request = ApiRequest::post(LETTERS_PATH).with_body(serde_json::json!({
            "subject": subject,
            "addressee": addressee,
        }));

        let response = self.coordinator.execute(request).await?;
        let letter: Letter = expect_body(&response, "new letter")?;
        tracing::info!(id = letter.id, number = letter.number, "Letter registered");
        Ok(letter)
    }

    pub async fn cancel_letter(&self, letter_id: i64) -> Result<(), ApiError> {
        self.coordinator
            .execute(ApiRequest::post(cancel_path(letter_id)))
            .await?;
        tracing::info!(id = letter_id, "Letter cancelled");
        Ok(())
    }

    pub async fn restore_letter(&self, letter_id: i64) -> Result<(), ApiError> {
        self.coordinator
            .execute(ApiRequest::post(restore_path(letter_id)))
            .await?;
        tracing::info!(id = letter_id, "Letter restored");
        Ok(())
    }
}

fn expect_body<T: DeserializeOwned>(response: &RawResponse, what: &str) -> Result<T, ApiError> {
    response
        .json()?
        .ok_or_else(|| ApiError::MalformedResponse(format!("empty {} response", what)))
}
