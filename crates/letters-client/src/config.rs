//! Client configuration.

use std::time::Duration;

use crate::error::ApiError;

/// Default letters API deployment.
pub const DEFAULT_BASE_URL: &str = "https://letter-app-24x3.onrender.com";

/// Letters API client configuration.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// API base URL, without a trailing slash.
    pub base_url: String,

    /// Per-request timeout.
    pub timeout: Duration,

    /// User agent sent with every request.
    pub user_agent: String,
}

impl ClientConfig {
    /// Create a configuration for the given base URL with default settings.
    pub fn new(base_url: &str) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            ..Self::default()
        }
    }

    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ApiError> {
        let config = Self::from_env_unvalidated();
        config.validate()?;
        Ok(config)
    }

    /// Like [`ClientConfig::from_env`], leaving validation to the caller so
    /// overrides can be applied first.
    pub fn from_env_unvalidated() -> Self {
        let base_url = std::env::var("LETTERS_API_URL")
            .unwrap_or_else(|_| DEFAULT_BASE_URL.to_string());

        let timeout_secs: u64 = std::env::var("LETTERS_HTTP_TIMEOUT")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(30);

        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            timeout: Duration::from_secs(timeout_secs),
            ..Self::default()
        }
    }

    /// Override the base URL.
    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.base_url = base_url.trim_end_matches('/').to_string();
        self
    }

    /// Override the request timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Check that the base URL is usable.
    pub fn validate(&self) -> Result<(), ApiError> {
        if !(self.base_url.starts_with("http://") || self.base_url.starts_with("https://")) {
            return Err(ApiError::Configuration(format!(
                "base URL must start with http:// or https://, got '{}'",
                self.base_url
            )));
        }
        Ok(())
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout: Duration::from_secs(30),
            user_agent: format!("letters-client/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_default() {
        let config = ClientConfig::default();
        assert_eq!(config.base_url, DEFAULT_BASE_URL);
        assert_eq!(config.timeout, Duration::from_secs(30));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_trailing_slash_trimmed() {
        let config = ClientConfig::new("http://localhost:8000/");
        assert_eq!(config.base_url, "http://localhost:8000");

        let config = ClientConfig::default().with_base_url("http://localhost:8000//");
        assert_eq!(config.base_url, "http://localhost:8000");
    }

    #[test]
    fn test_override_replaces_invalid_base_url() {
        let config = ClientConfig::new("not a url")
            .with_base_url("http://localhost:8000")
            .with_timeout(Duration::from_secs(5));
        assert!(config.validate().is_ok());
        assert_eq!(config.timeout, Duration::from_secs(5));
    }

    #[test]
    fn test_validate_rejects_bad_scheme() {
        let config = ClientConfig::new("localhost:8000");
        assert!(matches!(config.validate(), Err(ApiError::Configuration(_))));
    }
}
