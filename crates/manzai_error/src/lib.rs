//! Error types for the manzai service.
//!
//! This crate provides the foundation error types used throughout the workspace.
//!
//! # Error Hierarchy
//!
//! All errors follow the `ErrorKind` + wrapper struct pattern:
//! - `*ErrorKind` enum defines specific error conditions
//! - `*Error` struct wraps the kind with source location tracking
//! - All constructors use `#[track_caller]` for automatic location capture
//!
//! # Examples
//!
//! ```
//! use manzai_error::{ManzaiResult, ConfigError};
//!
//! fn load() -> ManzaiResult<String> {
//!     Err(ConfigError::new("model.api_key missing"))?
//! }
//!
//! match load() {
//!     Ok(value) => println!("Got: {}", value),
//!     Err(e) => eprintln!("Error: {}", e),
//! }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod config;
mod error;
mod generator;
mod ledger;
mod pipeline;
mod storage;

pub use config::ConfigError;
pub use error::{ManzaiError, ManzaiErrorKind, ManzaiResult};
pub use generator::{GeneratorError, GeneratorErrorKind, RetryableError};
pub use ledger::{LedgerError, LedgerErrorKind};
pub use pipeline::{PipelineError, PipelineErrorKind};
pub use storage::{StorageError, StorageErrorKind};
