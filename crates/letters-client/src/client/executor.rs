//! Single-request HTTP executor.
//!
//! Sends exactly one request and reports what came back. Deciding what a 401
//! means is left to the [`RefreshCoordinator`](super::RefreshCoordinator).

use std::sync::Arc;

use reqwest::header::{CONTENT_LENGTH, CONTENT_TYPE};
use reqwest::{Method, StatusCode};
use serde::de::DeserializeOwned;

use crate::config::ClientConfig;
use crate::error::ApiError;
use crate::session::SessionStore;

/// One API call, described independently of any HTTP client.
#[derive(Debug, Clone)]
pub struct ApiRequest {
    method: Method,
    path: String,
    body: Option<serde_json::Value>,
    authenticated: bool,
    retry: bool,
}

impl ApiRequest {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            body: None,
            authenticated: true,
            retry: false,
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::GET, path)
    }

    pub fn post(path: impl Into<String>) -> Self {
        Self::new(Method::POST, path)
    }

    /// Attach a JSON body.
    pub fn with_body(mut self, body: serde_json::Value) -> Self {
        self.body = Some(body);
        self
    }

    /// Mark the request as not needing a session: a 401 is reported as a
    /// plain server error instead of triggering a token refresh.
    pub fn public(mut self) -> Self {
        self.authenticated = false;
        self
    }

    /// The replay of this request after a refresh. Replays never refresh.
    pub(crate) fn into_retry(mut self) -> Self {
        self.retry = true;
        self
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn body(&self) -> Option<&serde_json::Value> {
        self.body.as_ref()
    }

    pub fn is_authenticated(&self) -> bool {
        self.authenticated
    }

    pub fn is_retry(&self) -> bool {
        self.retry
    }
}

/// Fully-read response to an [`ApiRequest`].
#[derive(Debug, Clone)]
pub struct RawResponse {
    status: StatusCode,
    content_length: Option<u64>,
    body: String,
    sent_with: Option<String>,
}

impl RawResponse {
    pub(crate) fn new(
        status: StatusCode,
        content_length: Option<u64>,
        body: String,
        sent_with: Option<String>,
    ) -> Self {
        Self {
            status,
            content_length,
            body,
            sent_with,
        }
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn body(&self) -> &str {
        &self.body
    }

    /// Access token the request carried, if any.
    pub fn sent_with(&self) -> Option<&str> {
        self.sent_with.as_deref()
    }

    /// 204, an explicit zero `Content-Length`, or no bytes at all.
    pub fn is_empty(&self) -> bool {
        self.status == StatusCode::NO_CONTENT
            || self.content_length == Some(0)
            || self.body.trim().is_empty()
    }

    /// Turn a non-2xx status into an error.
    ///
    /// For authenticated requests a 401 becomes [`ApiError::AuthExpired`];
    /// otherwise it is an ordinary [`ApiError::Server`].
    pub fn check(self, authenticated: bool) -> Result<Self, ApiError> {
        if self.status.is_success() {
            return Ok(self);
        }
        if authenticated && self.status == StatusCode::UNAUTHORIZED {
            return Err(ApiError::AuthExpired);
        }
        Err(ApiError::from_error_body(self.status.as_u16(), &self.body))
    }

    /// Decode the body, yielding `None` for empty success responses.
    pub fn json<T: DeserializeOwned>(&self) -> Result<Option<T>, ApiError> {
        if self.is_empty() {
            return Ok(None);
        }
        serde_json::from_str(&self.body)
            .map(Some)
            .map_err(|e| ApiError::MalformedResponse(e.to_string()))
    }
}

/// Sends [`ApiRequest`]s against a fixed base URL.
#[derive(Clone)]
pub struct RequestExecutor {
    client: reqwest::Client,
    base_url: String,
    store: Arc<dyn SessionStore>,
}

impl RequestExecutor {
    pub fn new(config: &ClientConfig, store: Arc<dyn SessionStore>) -> Result<Self, ApiError> {
        config.validate()?;
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .user_agent(config.user_agent.clone())
            .build()
            .map_err(|e| ApiError::Configuration(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            store,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Send one request with the currently stored access token.
    pub async fn send(&self, request: &ApiRequest) -> Result<RawResponse, ApiError> {
        let access_token = self.store.get().access_token().map(str::to_owned);

        let mut builder = self
            .client
            .request(request.method.clone(), self.url(&request.path))
            .header(CONTENT_TYPE, "application/json");

        if let Some(token) = &access_token {
            builder = builder.bearer_auth(token);
        }
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        tracing::debug!(
            method = %request.method,
            path = %request.path,
            retry = request.retry,
            authorized = access_token.is_some(),
            "Sending request"
        );

        let response = builder.send().await?;
        let status = response.status();
        let content_length = response
            .headers()
            .get(CONTENT_LENGTH)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.parse().ok());
        let body = response.text().await?;

        tracing::debug!(
            method = %request.method,
            path = %request.path,
            status = status.as_u16(),
            "Received response"
        );

        Ok(RawResponse::new(status, content_length, body, access_token))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::MemorySessionStore;

    fn response(status: u16, content_length: Option<u64>, body: &str) -> RawResponse {
        RawResponse::new(
            StatusCode::from_u16(status).unwrap(),
            content_length,
            body.to_string(),
            None,
        )
    }

    #[test]
    fn test_request_builders() {
        let request = ApiRequest::post("/api/token/")
            .with_body(serde_json::json!({"username": "alice"}))
            .public();
        assert_eq!(request.method(), &Method::POST);
        assert_eq!(request.path(), "/api/token/");
        assert!(!request.is_authenticated());
        assert!(!request.is_retry());
        assert!(request.body().is_some());

        let retry = ApiRequest::get("/api/letters/").into_retry();
        assert!(retry.is_authenticated());
        assert!(retry.is_retry());
    }

    #[test]
    fn test_no_content_is_empty() {
        let resp = response(204, None, "");
        assert!(resp.is_empty());
        let value: Option<serde_json::Value> = resp.json().unwrap();
        assert!(value.is_none());
    }

    #[test]
    fn test_zero_content_length_is_empty() {
        let resp = response(200, Some(0), "");
        let value: Option<serde_json::Value> = resp.json().unwrap();
        assert!(value.is_none());
    }

    #[test]
    fn test_json_body_decoded() {
        let resp = response(200, Some(15), r#"{"message":"ok"}"#);
        let value: Option<serde_json::Value> = resp.json().unwrap();
        assert_eq!(value, Some(serde_json::json!({"message": "ok"})));
    }

    #[test]
    fn test_malformed_body() {
        let resp = response(200, Some(5), "nope!");
        let result: Result<Option<serde_json::Value>, _> = resp.json();
        assert!(matches!(result, Err(ApiError::MalformedResponse(_))));
    }

    #[test]
    fn test_check_classifies_401() {
        let err = response(401, None, r#"{"detail":"Token expired"}"#)
            .check(true)
            .unwrap_err();
        assert_eq!(err, ApiError::AuthExpired);

        let err = response(401, None, r#"{"detail":"No active account"}"#)
            .check(false)
            .unwrap_err();
        assert_eq!(err.to_string(), "No active account");
        assert_eq!(err.status(), Some(401));
    }

    #[test]
    fn test_check_passes_success() {
        assert!(response(201, None, "{}").check(true).is_ok());
        let err = response(500, None, "oops").check(true).unwrap_err();
        assert_eq!(err.status(), Some(500));
    }

    #[test]
    fn test_executor_url() {
        let store = Arc::new(MemorySessionStore::new());
        let executor =
            RequestExecutor::new(&ClientConfig::new("http://localhost:8000/"), store).unwrap();
        assert_eq!(executor.base_url(), "http://localhost:8000");
        assert_eq!(
            executor.url("/api/letters/"),
            "http://localhost:8000/api/letters/"
        );
    }

    #[test]
    fn test_executor_rejects_bad_config() {
        let store = Arc::new(MemorySessionStore::new());
        let result = RequestExecutor::new(&ClientConfig::new("ftp://example.com"), store);
        assert!(matches!(result, Err(ApiError::Configuration(_))));
    }
}
