//! Provider-neutral completion request.

use crate::Message;
use derive_getters::Getters;
use serde::{Deserialize, Serialize};

/// One call to a text generator: ordered messages plus sampling bounds.
///
/// # Examples
///
/// ```
/// use manzai_core::{CompletionRequest, Message};
///
/// let request = CompletionRequest::builder()
///     .messages(vec![Message::user("Hello!")])
///     .temperature(0.8f32)
///     .max_tokens(1024u32)
///     .build()
///     .unwrap();
///
/// assert_eq!(request.messages().len(), 1);
/// assert_eq!(*request.max_tokens(), 1024);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Getters, derive_builder::Builder)]
#[builder(setter(into))]
pub struct CompletionRequest {
    /// The conversation messages to send
    messages: Vec<Message>,
    /// Sampling temperature
    temperature: f32,
    /// Maximum number of output tokens
    max_tokens: u32,
}

impl CompletionRequest {
    /// Start building a request.
    pub fn builder() -> CompletionRequestBuilder {
        CompletionRequestBuilder::default()
    }

    /// Build a request directly from its parts.
    pub fn new(messages: Vec<Message>, temperature: f32, max_tokens: u32) -> Self {
        Self {
            messages,
            temperature,
            max_tokens,
        }
    }
}
