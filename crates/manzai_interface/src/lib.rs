//! Capability traits for the manzai service.
//!
//! The pipeline talks to the outside world only through these seams:
//! a text generator, a usage row store, and a source of random choices.
//! Swapping a provider or store means swapping the implementation, never
//! the orchestrator.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod traits;

pub use traits::{RandomPicker, TechniquePicker, TextGenerator, UsageStore};
