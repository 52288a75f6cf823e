//! Text generator adapters for the manzai service.
//!
//! The pipeline only needs one capability from a provider: turn an ordered
//! list of role-tagged messages into a single text blob. This crate ships an
//! adapter for OpenAI-compatible chat-completions endpoints, which covers
//! xAI (the default), OpenAI itself, Groq, and self-hosted servers.
//!
//! # Example
//!
//! ```no_run
//! use manzai_core::{CompletionRequest, Message};
//! use manzai_interface::TextGenerator;
//! use manzai_models::{OpenAICompatibleClient, ProviderConfig};
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = ProviderConfig::xai("xai-...");
//! let client = OpenAICompatibleClient::new(config)?;
//! let request = CompletionRequest::new(vec![Message::user("こんにちは")], 0.8, 512);
//! let text = client.complete(&request).await?;
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod client;
mod config;
mod request;
mod response;

pub use client::OpenAICompatibleClient;
pub use config::ProviderConfig;
pub use request::{ChatCompletionRequest, ChatMessage};
pub use response::{ChatCompletionResponse, Choice, ChoiceMessage, Usage};
