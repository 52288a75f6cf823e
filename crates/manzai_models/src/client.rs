//! Generic client for OpenAI-compatible chat-completions endpoints.

use crate::{ChatCompletionRequest, ChatCompletionResponse, ChatMessage, ProviderConfig};
use async_trait::async_trait;
use manzai_core::CompletionRequest;
use manzai_error::{GeneratorError, GeneratorErrorKind, RetryableError};
use manzai_interface::TextGenerator;
use std::time::Duration;
use tracing::{debug, error, instrument, warn};

/// Client for any provider speaking the OpenAI chat-completions dialect.
#[derive(Debug, Clone)]
pub struct OpenAICompatibleClient {
    config: ProviderConfig,
    client: reqwest::Client,
}

impl OpenAICompatibleClient {
    /// Create a new client.
    ///
    /// # Errors
    ///
    /// Returns an error if no API key is configured or the HTTP client
    /// cannot be built.
    #[instrument(skip(config), fields(provider = %config.provider, model = %config.model))]
    pub fn new(config: ProviderConfig) -> Result<Self, GeneratorError> {
        if config.api_key.as_deref().is_none_or(str::is_empty) {
            return Err(GeneratorError::new(GeneratorErrorKind::MissingApiKey(
                config.provider.clone(),
            )));
        }

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| {
                GeneratorError::new(GeneratorErrorKind::Http(format!(
                    "Failed to build HTTP client: {}",
                    e
                )))
            })?;

        debug!("Creating OpenAI-compatible client");
        Ok(Self { config, client })
    }

    /// Get the provider configuration
    pub fn config(&self) -> &ProviderConfig {
        &self.config
    }

    fn to_chat_request(&self, req: &CompletionRequest) -> ChatCompletionRequest {
        let max_tokens = (*req.max_tokens()).min(self.config.max_output_tokens_cap);
        ChatCompletionRequest {
            model: self.config.model.clone(),
            messages: req.messages().iter().map(ChatMessage::from).collect(),
            temperature: *req.temperature(),
            max_tokens,
            max_output_tokens: max_tokens,
        }
    }

    /// Send one chat completion request without retry.
    #[instrument(skip(self, request), fields(model = %request.model, max_tokens = request.max_tokens))]
    pub async fn chat_completion(
        &self,
        request: &ChatCompletionRequest,
    ) -> Result<ChatCompletionResponse, GeneratorError> {
        let url = self.config.completions_url();
        debug!("Sending chat completion request to {}", url);

        let mut req = self
            .client
            .post(&url)
            .json(request)
            .header("Content-Type", "application/json");

        if let Some(api_key) = &self.config.api_key {
            req = req.header("Authorization", format!("Bearer {}", api_key));
        }

        let response = req.send().await.map_err(|e| {
            error!("Request failed: {}", e);
            GeneratorError::new(GeneratorErrorKind::Http(format!("Request failed: {}", e)))
        })?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            error!(status = %status, body = %body, "Provider returned error");
            return Err(GeneratorError::new(GeneratorErrorKind::Api {
                status: status.as_u16(),
                message: body,
            }));
        }

        let result = response.json().await.map_err(|e| {
            error!("Failed to parse response: {}", e);
            GeneratorError::new(GeneratorErrorKind::Deserialization(format!(
                "Failed to parse response: {}",
                e
            )))
        })?;

        debug!("Chat completion successful");
        Ok(result)
    }

    /// Send a request, retrying transient failures with jittered backoff.
    async fn chat_completion_with_retry(
        &self,
        request: &ChatCompletionRequest,
    ) -> Result<ChatCompletionResponse, GeneratorError> {
        use tokio_retry2::{Retry, RetryError, strategy::ExponentialBackoff, strategy::jitter};

        let retry_strategy = ExponentialBackoff::from_millis(self.config.retry_backoff_ms)
            .factor(2)
            .max_delay(Duration::from_secs(8))
            .map(jitter)
            .take(self.config.max_retries);

        Retry::spawn(retry_strategy, move || async move {
            match self.chat_completion(request).await {
                Ok(response) => Ok(response),
                Err(e) => {
                    if e.is_retryable() {
                        warn!(error = %e, "Transient provider error, will retry");
                        Err(RetryError::Transient {
                            err: e,
                            retry_after: None,
                        })
                    } else {
                        Err(RetryError::Permanent(e))
                    }
                }
            }
        })
        .await
    }
}

#[async_trait]
impl TextGenerator for OpenAICompatibleClient {
    #[instrument(skip(self, req), fields(provider = %self.config.provider, model = %self.config.model))]
    async fn complete(&self, req: &CompletionRequest) -> Result<String, GeneratorError> {
        let chat_request = self.to_chat_request(req);
        let response = self.chat_completion_with_retry(&chat_request).await?;

        if let Some(usage) = &response.usage {
            debug!(
                prompt_tokens = usage.prompt_tokens,
                completion_tokens = usage.completion_tokens,
                "Token usage"
            );
        }

        response
            .first_text()
            .ok_or_else(|| GeneratorError::new(GeneratorErrorKind::EmptyResponse))
    }

    fn provider_name(&self) -> &'static str {
        "openai-compatible"
    }

    fn model_name(&self) -> &str {
        &self.config.model
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use manzai_core::Message;

    #[test]
    fn missing_api_key_is_rejected() {
        let err = OpenAICompatibleClient::new(ProviderConfig::default()).unwrap_err();
        assert!(matches!(err.kind, GeneratorErrorKind::MissingApiKey(_)));
    }

    #[test]
    fn chat_request_caps_tokens_and_maps_roles() {
        let mut config = ProviderConfig::xai("key");
        config.max_output_tokens_cap = 1000;
        let client = OpenAICompatibleClient::new(config).unwrap();

        let req = CompletionRequest::new(
            vec![Message::system("persona"), Message::user("prompt")],
            0.8,
            5000,
        );
        let chat = client.to_chat_request(&req);

        assert_eq!(chat.max_tokens, 1000);
        assert_eq!(chat.max_output_tokens, 1000);
        assert_eq!(chat.messages[0].role, "system");
        assert_eq!(chat.messages[1].role, "user");
        assert_eq!(chat.model, "grok-4-fast-reasoning");
    }

    #[test]
    fn completions_url_tolerates_trailing_slash() {
        let config = ProviderConfig::xai("k").with_base_url("http://localhost:9000/v1/");
        assert_eq!(
            config.completions_url(),
            "http://localhost:9000/v1/chat/completions"
        );
    }
}
