//! Token refresh coordination.
//!
//! At most one refresh call is in flight at a time. Callers that see a 401
//! while a refresh is running wait on the same shared future and then replay
//! their own request once.

use std::sync::{Arc, Weak};

use futures::future::{BoxFuture, FutureExt, Shared};
use tokio::sync::Mutex;

use super::executor::{ApiRequest, RawResponse, RequestExecutor};
use super::TOKEN_REFRESH_PATH;
use crate::error::ApiError;
use crate::models::RefreshedToken;
use crate::session::{SessionListener, SessionStore};

type RefreshFuture = Shared<BoxFuture<'static, Result<String, ApiError>>>;
type PendingSlot = Mutex<Option<RefreshFuture>>;

/// Whether a refresh call is currently outstanding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshState {
    Idle,
    Refreshing,
}

/// Runs requests, recovering from expired access tokens.
#[derive(Clone)]
pub struct RefreshCoordinator {
    executor: RequestExecutor,
    store: Arc<dyn SessionStore>,
    listener: Arc<dyn SessionListener>,
    pending: Arc<PendingSlot>,
}

impl RefreshCoordinator {
    pub fn new(
        executor: RequestExecutor,
        store: Arc<dyn SessionStore>,
        listener: Arc<dyn SessionListener>,
    ) -> Self {
        Self {
            executor,
            store,
            listener,
            pending: Arc::new(Mutex::new(None)),
        }
    }

    pub fn executor(&self) -> &RequestExecutor {
        &self.executor
    }

    pub async fn state(&self) -> RefreshState {
        if self.pending.lock().await.is_some() {
            RefreshState::Refreshing
        } else {
            RefreshState::Idle
        }
    }

    /// Send `request`, refreshing the access token and replaying once on 401.
    ///
    /// Public requests are sent as-is and never refresh.
    pub async fn execute(&self, request: ApiRequest) -> Result<RawResponse, ApiError> {
        if !request.is_authenticated() {
            return self.executor.send(&request).await?.check(false);
        }

        let mut request = request;
        loop {
            let response = self.executor.send(&request).await?;
            let sent_with = response.sent_with().map(str::to_owned);

            match response.check(true) {
                Err(ApiError::AuthExpired) if request.is_retry() => {
                    let reason = "access token rejected after refresh";
                    expire_session(self.store.as_ref(), self.listener.as_ref(), reason);
                    return Err(ApiError::SessionInvalid(reason.to_string()));
                }
                Err(ApiError::AuthExpired) => {
                    tracing::debug!(
                        path = %request.path(),
                        "Access token rejected, refreshing"
                    );
                    self.refresh(sent_with.as_deref()).await?;
                    request = request.into_retry();
                }
                other => return other,
            }
        }
    }

    /// Obtain a fresh access token.
    ///
    /// `stale` is the token the failed request was sent with. If the store
    /// already holds a different one, another caller refreshed in the
    /// meantime and that token is returned without a network call.
    pub async fn refresh(&self, stale: Option<&str>) -> Result<String, ApiError> {
        let inflight = {
            let mut pending = self.pending.lock().await;
            match pending.as_ref() {
                Some(inflight) => {
                    tracing::debug!("Joining in-flight token refresh");
                    inflight.clone()
                }
                None => {
                    let session = self.store.get();
                    if let Some(current) = session.access_token() {
                        if Some(current) != stale {
                            return Ok(current.to_string());
                        }
                    }
                    let inflight = self.start_refresh();
                    *pending = Some(inflight.clone());
                    inflight
                }
            }
        };

        inflight.await
    }

    fn start_refresh(&self) -> RefreshFuture {
        let executor = self.executor.clone();
        let store = Arc::clone(&self.store);
        let listener = Arc::clone(&self.listener);
        let pending: Weak<PendingSlot> = Arc::downgrade(&self.pending);

        async move {
            let outcome = match perform_refresh(&executor, store.as_ref()).await {
                Ok(access) => {
                    tracing::info!("Access token refreshed");
                    Ok(access)
                }
                Err(e) => {
                    let reason = format!("token refresh failed: {}", e);
                    expire_session(store.as_ref(), listener.as_ref(), &reason);
                    Err(match e {
                        ApiError::SessionInvalid(_) => e,
                        _ => ApiError::SessionInvalid(reason),
                    })
                }
            };

            if let Some(pending) = pending.upgrade() {
                *pending.lock().await = None;
            }
            outcome
        }
        .boxed()
        .shared()
    }
}

async fn perform_refresh(
    executor: &RequestExecutor,
    store: &dyn SessionStore,
) -> Result<String, ApiError> {
    let session = store.get();
    let refresh_token = session
        .refresh_token()
        .ok_or_else(|| ApiError::SessionInvalid("no refresh token stored".to_string()))?;

    let request = ApiRequest::post(TOKEN_REFRESH_PATH)
        .with_body(serde_json::json!({ "refresh": refresh_token }))
        .public();

    let response = executor.send(&request).await?.check(false)?;
    let token: RefreshedToken = response.json()?.ok_or_else(|| {
        ApiError::MalformedResponse("empty token refresh response".to_string())
    })?;

    store.set(store.get().refreshed(&token))?;
    Ok(token.access)
}

/// Clear every stored credential and tell the listener, if there was a
/// session to lose.
fn expire_session(store: &dyn SessionStore, listener: &dyn SessionListener, reason: &str) {
    match store.clear() {
        Ok(true) => {
            tracing::warn!(reason, "Session expired, credentials cleared");
            listener.on_session_expired();
        }
        Ok(false) => {}
        Err(e) => {
            // The in-memory copy is already gone, so the session is over.
            tracing::error!(error = %e, "Failed to clear session store");
            listener.on_session_expired();
        }
    }
}
