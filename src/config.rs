use std::env;
use std::time::Duration;

pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
pub const DEFAULT_MODEL_ID: &str = "gemini-2.5-flash-image";

/// Upper bound on a single generation call. A hung call past this point is
/// reported as a transient service error rather than waiting forever.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(25);

#[derive(Debug, Clone)]
pub struct GeminiConfig {
    pub api_key: Option<String>,
    pub base_url: String,
    pub model_id: String,
    pub request_timeout: Duration,
    /// Optional style line prefixed to every prompt before it is sent.
    pub style_preamble: Option<String>,
}

impl Default for GeminiConfig {
    fn default() -> Self {
        GeminiConfig {
            api_key: None,
            base_url: DEFAULT_BASE_URL.to_string(),
            model_id: DEFAULT_MODEL_ID.to_string(),
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            style_preamble: None,
        }
    }
}

impl GeminiConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_env() -> Self {
        let api_key = env::var("GEMINI_API_KEY")
            .or_else(|_| env::var("API_KEY"))
            .ok();
        let base_url = env::var("GEMINI_BASE_URL").unwrap_or_else(|_| DEFAULT_BASE_URL.to_string());
        let model_id = env::var("GEMINI_MODEL_ID").unwrap_or_else(|_| DEFAULT_MODEL_ID.to_string());
        let request_timeout = env::var("GEMINI_REQUEST_TIMEOUT_SECS")
            .ok()
            .and_then(|s| s.parse().ok())
            .map(Duration::from_secs)
            .unwrap_or(DEFAULT_REQUEST_TIMEOUT);
        let style_preamble = env::var("GEMINI_STYLE_PREAMBLE").ok();

        GeminiConfig {
            api_key,
            base_url,
            model_id,
            request_timeout,
            style_preamble,
        }
    }

    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_model(mut self, model_id: impl Into<String>) -> Self {
        self.model_id = model_id.into();
        self
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    pub fn with_style_preamble(mut self, preamble: impl Into<String>) -> Self {
        self.style_preamble = Some(preamble.into());
        self
    }

    /// The key actually used for outbound calls, if one is configured.
    pub fn usable_api_key(&self) -> Option<&str> {
        self.api_key.as_deref().filter(|key| !key.trim().is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = GeminiConfig::new();
        assert_eq!(config.base_url, DEFAULT_BASE_URL);
        assert_eq!(config.model_id, DEFAULT_MODEL_ID);
        assert_eq!(config.request_timeout, DEFAULT_REQUEST_TIMEOUT);
        assert!(config.api_key.is_none());
        assert!(config.style_preamble.is_none());
    }

    #[test]
    fn test_builder_chain() {
        let config = GeminiConfig::new()
            .with_api_key("k-123")
            .with_model("gemini-x")
            .with_request_timeout(Duration::from_secs(5))
            .with_style_preamble("Soft natural light.");
        assert_eq!(config.usable_api_key(), Some("k-123"));
        assert_eq!(config.model_id, "gemini-x");
        assert_eq!(config.request_timeout, Duration::from_secs(5));
        assert_eq!(config.style_preamble.as_deref(), Some("Soft natural light."));
    }

    #[test]
    fn test_blank_api_key_is_not_usable() {
        let config = GeminiConfig::new().with_api_key("   ");
        assert_eq!(config.usable_api_key(), None);
    }
}
