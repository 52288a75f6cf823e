//! Connection settings for an OpenAI-compatible provider.

use serde::{Deserialize, Serialize};

const XAI_BASE_URL: &str = "https://api.x.ai/v1";
const XAI_DEFAULT_MODEL: &str = "grok-4-fast-reasoning";

/// Connection settings for an OpenAI-compatible chat-completions API.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(default)]
pub struct ProviderConfig {
    /// Provider label used in logs
    pub provider: String,
    /// Base URL without the `/chat/completions` suffix
    pub base_url: String,
    /// Model identifier
    pub model: String,
    /// Bearer token
    #[serde(skip_serializing)]
    pub api_key: Option<String>,
    /// Upper bound on output tokens for any single call
    pub max_output_tokens_cap: u32,
    /// Retries after a transient failure (0 disables retry)
    pub max_retries: usize,
    /// Initial retry backoff in milliseconds
    pub retry_backoff_ms: u64,
    /// Per-request timeout in seconds
    pub timeout_secs: u64,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            provider: "xai".to_string(),
            base_url: XAI_BASE_URL.to_string(),
            model: XAI_DEFAULT_MODEL.to_string(),
            api_key: None,
            max_output_tokens_cap: 8192,
            max_retries: 1,
            retry_backoff_ms: 500,
            timeout_secs: 120,
        }
    }
}

impl ProviderConfig {
    /// xAI defaults with the given key.
    pub fn xai(api_key: impl Into<String>) -> Self {
        Self {
            api_key: Some(api_key.into()),
            ..Self::default()
        }
    }

    /// Set the base URL.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Set the model identifier.
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Set the retry count.
    pub fn with_max_retries(mut self, max_retries: usize) -> Self {
        self.max_retries = max_retries;
        self
    }

    /// Full chat-completions endpoint.
    pub fn completions_url(&self) -> String {
        format!("{}/chat/completions", self.base_url.trim_end_matches('/'))
    }
}
