//! Core data types for the manzai script generation service.
//!
//! This crate provides the plain data shared by every other crate: chat
//! messages sent to a text generator, the per-request generation parameters,
//! the character-count band, the draft script, and the per-user usage row.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod band;
mod draft;
mod generation;
mod message;
mod request;
mod role;
mod usage;

pub use band::{LengthBand, LengthSettings, TolerancePolicy};
pub use draft::{ScriptDraft, char_len};
pub use generation::{GenerationRequest, TechniqueCategory, TechniqueSelection};
pub use message::Message;
pub use request::{CompletionRequest, CompletionRequestBuilder};
pub use role::Role;
pub use usage::UsageRecord;
