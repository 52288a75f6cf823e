//! Script generation pipeline for the manzai service.
//!
//! - [`catalog`]: the fixed technique tables and the randomized fallback set
//! - [`prompt`]: prompt text and output-token budgets for every model call
//! - [`normalizer`]: pure, idempotent text transformations
//! - [`ScriptPipeline`]: chains one model call, the normalisers, and the
//!   optional continuation, verification, and title stages
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use manzai_core::{GenerationRequest, LengthSettings, TechniqueSelection};
//! use manzai_interface::TextGenerator;
//! use manzai_script::{PipelineSettings, ScriptPipeline};
//!
//! # async fn run(generator: Arc<dyn TextGenerator>) -> Result<(), Box<dyn std::error::Error>> {
//! let pipeline = ScriptPipeline::new(generator, PipelineSettings::default());
//! let band = LengthSettings::default().band_for(350);
//! let request = GenerationRequest::new(Some("満員電車"), None, None, 350, TechniqueSelection::default());
//!
//! let script = pipeline.generate(&request, band).await?;
//! println!("{}\n\n{}", script.title(), script.body());
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod catalog;
pub mod normalizer;
mod orchestrator;
pub mod prompt;

pub use catalog::Technique;
pub use normalizer::{AuditFinding, ClosingLine};
pub use orchestrator::{FinishedScript, PipelineSettings, ScriptPipeline, StageTrace};
pub use prompt::{BuiltPrompt, ScriptStyle};
