//! Server configuration. Credentials are resolved once at startup and fail
//! fast, not at first use.

use crate::error::{Result, RetouchError};
use std::time::Duration;

/// Default upstream API base.
const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com";

/// Model used for image edits.
const DEFAULT_EDIT_MODEL: &str = "gemini-2.5-flash-image-preview";

/// Model used for change summaries.
const DEFAULT_TEXT_MODEL: &str = "gemini-2.5-flash";

/// Model used for text-to-image creation.
const DEFAULT_IMAGEN_MODEL: &str = "imagen-4.0-generate-001";

/// The hosting environment time-boxes a request to roughly one minute;
/// upstream calls get the same budget.
const DEFAULT_UPSTREAM_TIMEOUT: Duration = Duration::from_secs(60);

/// Configuration for the orchestration handler.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Upstream API key.
    pub api_key: String,
    /// Upstream API base URL (overridable for tests).
    pub base_url: String,
    /// Model identifier for image edits.
    pub edit_model: String,
    /// Model identifier for summaries.
    pub text_model: String,
    /// Model identifier for text-to-image creation.
    pub imagen_model: String,
    /// Time budget for one upstream call.
    pub upstream_timeout: Duration,
}

impl ServerConfig {
    /// Creates a configuration with the given API key and default models.
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
            edit_model: DEFAULT_EDIT_MODEL.to_string(),
            text_model: DEFAULT_TEXT_MODEL.to_string(),
            imagen_model: DEFAULT_IMAGEN_MODEL.to_string(),
            upstream_timeout: DEFAULT_UPSTREAM_TIMEOUT,
        }
    }

    /// Resolves the configuration from the environment. Errors immediately
    /// when `API_KEY` is unset so a misconfigured deployment cannot start.
    pub fn from_env() -> Result<Self> {
        let api_key = std::env::var("API_KEY")
            .ok()
            .filter(|key| !key.is_empty())
            .ok_or_else(|| {
                RetouchError::Config("API_KEY environment variable not set".into())
            })?;
        Ok(Self::new(api_key))
    }

    /// Overrides the upstream base URL.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Overrides the upstream time budget.
    pub fn with_upstream_timeout(mut self, timeout: Duration) -> Self {
        self.upstream_timeout = timeout;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ServerConfig::new("test-key");
        assert_eq!(config.api_key, "test-key");
        assert_eq!(config.base_url, DEFAULT_BASE_URL);
        assert_eq!(config.edit_model, "gemini-2.5-flash-image-preview");
        assert_eq!(config.imagen_model, "imagen-4.0-generate-001");
        assert_eq!(config.upstream_timeout, Duration::from_secs(60));
    }

    #[test]
    fn test_from_env_fails_fast_without_key() {
        // Single test covers both paths to avoid races on the shared
        // environment.
        std::env::remove_var("API_KEY");
        let err = ServerConfig::from_env().unwrap_err();
        assert!(matches!(err, RetouchError::Config(_)));

        std::env::set_var("API_KEY", "from-env");
        let config = ServerConfig::from_env().unwrap();
        assert_eq!(config.api_key, "from-env");
        std::env::remove_var("API_KEY");
    }

    #[test]
    fn test_overrides() {
        let config = ServerConfig::new("k")
            .with_base_url("http://localhost:1234")
            .with_upstream_timeout(Duration::from_secs(5));
        assert_eq!(config.base_url, "http://localhost:1234");
        assert_eq!(config.upstream_timeout, Duration::from_secs(5));
    }
}
