//! The generation pipeline.
//!
//! One mandatory model call, then a fixed sequence of local normalisation
//! steps interleaved with optional corrective calls. Only a failed first
//! call or an empty finished body aborts a run; any other stage failure is
//! logged and the previous draft carries on.

use std::sync::Arc;

use derive_getters::Getters;
use manzai_core::{CompletionRequest, GenerationRequest, LengthBand, char_len};
use manzai_error::{PipelineError, PipelineErrorKind};
use manzai_interface::{RandomPicker, TechniquePicker, TextGenerator};
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, instrument, warn};

use crate::normalizer::{
    ClosingLine, audit, clean_title, enforce_band, enforce_single_title, finalize_band,
    has_dialogue, reshape, split_title_and_body, strip_closing_lines,
};
use crate::prompt::{
    ScriptStyle, TITLE_TOKEN_BUDGET, build_prompt, continuation_messages,
    continuation_token_budget, initial_token_budget, title_messages, verification_messages,
};

const MAX_TITLE_CHARS: usize = 40;

/// Stage switches, sampling temperatures, and script wording.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineSettings {
    /// Extend drafts that fall short of the band minimum
    pub continuation: bool,
    /// Ask the model to re-check the draft before the final band
    pub verification: bool,
    /// Ask for a title when the first response carried none
    pub title_regeneration: bool,
    /// Shortfall (in characters) above which a continuation is requested
    pub continuation_threshold: usize,
    /// Temperature for the first call
    pub initial_temperature: f32,
    /// Temperature for the continuation call
    pub continuation_temperature: f32,
    /// Temperature for the verification call
    pub verification_temperature: f32,
    /// Temperature for the title call
    pub title_temperature: f32,
    /// Upper bound for any output-token budget
    pub max_output_tokens: u32,
    /// Phrase the reactive speaker closes with
    pub closing_phrase: String,
    /// Meta words that must not appear in the body
    pub banned_words: Vec<String>,
    /// Title used when none could be produced
    pub placeholder_title: String,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            continuation: true,
            verification: false,
            title_regeneration: false,
            continuation_threshold: 30,
            initial_temperature: 0.8,
            continuation_temperature: 0.1,
            verification_temperature: 0.2,
            title_temperature: 0.7,
            max_output_tokens: 8192,
            closing_phrase: "もういいよ！".to_string(),
            banned_words: vec!["比喩".to_string(), "皮肉".to_string(), "風刺".to_string()],
            placeholder_title: "（タイトル未設定）".to_string(),
        }
    }
}

/// Which optional stages changed the draft.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct StageTrace {
    /// A continuation was merged
    pub continued: bool,
    /// A verification rewrite was accepted
    pub verified: bool,
    /// The title came from a dedicated call
    pub title_regenerated: bool,
}

/// A finished script plus the metadata the response reports.
#[derive(Debug, Clone, PartialEq, Eq, Getters)]
pub struct FinishedScript {
    /// Final title, never empty
    title: String,
    /// Final dialogue body
    body: String,
    /// Band the body was fitted to
    band: LengthBand,
    /// Technique labels used in the prompt
    techniques: Vec<String>,
    /// Structure labels used in the prompt
    structure: Vec<String>,
    /// Optional stages that took effect
    trace: StageTrace,
}

impl FinishedScript {
    /// Final body length in characters.
    pub fn length(&self) -> usize {
        char_len(&self.body)
    }
}

/// Runs a generation request against a [`TextGenerator`].
pub struct ScriptPipeline {
    generator: Arc<dyn TextGenerator>,
    picker: Arc<dyn TechniquePicker>,
    settings: PipelineSettings,
}

impl ScriptPipeline {
    /// Pipeline with the thread-RNG technique picker.
    pub fn new(generator: Arc<dyn TextGenerator>, settings: PipelineSettings) -> Self {
        Self {
            generator,
            picker: Arc::new(RandomPicker),
            settings,
        }
    }

    /// Replace the technique picker.
    pub fn with_picker(mut self, picker: Arc<dyn TechniquePicker>) -> Self {
        self.picker = picker;
        self
    }

    /// Active settings.
    pub fn settings(&self) -> &PipelineSettings {
        &self.settings
    }

    /// Generate, normalise, and finalise one script.
    #[instrument(
        skip(self, request),
        fields(
            provider = self.generator.provider_name(),
            model = self.generator.model_name(),
            target = band.target,
            min = band.min,
            max = band.max,
        )
    )]
    pub async fn generate(
        &self,
        request: &GenerationRequest,
        band: LengthBand,
    ) -> Result<FinishedScript, PipelineError> {
        let closing = ClosingLine::new(request.reactive_name(), &self.settings.closing_phrase);
        let style = ScriptStyle {
            closing: &closing,
            banned_words: &self.settings.banned_words,
        };
        let prompt = build_prompt(request, &band, &style, self.picker.as_ref());

        let completion = CompletionRequest::new(
            prompt.messages(),
            self.settings.initial_temperature,
            initial_token_budget(band.max, self.settings.max_output_tokens),
        );
        let raw = self.generator.complete(&completion).await.map_err(|e| {
            error!(error = %e, "Initial generation failed");
            PipelineError::new(PipelineErrorKind::InitialGeneration(e.to_string()))
        })?;
        if raw.trim().is_empty() {
            warn!("Initial generation returned blank text");
            return Err(PipelineError::new(PipelineErrorKind::EmptyOutput));
        }

        let (mut title, body) = split_title_and_body(&raw);
        let body = enforce_single_title(&title, &body);
        let body = enforce_band(&body, &band, true);
        let mut body = reshape(&body, &closing);
        if !has_dialogue(&body, &closing) {
            warn!("Initial generation carried no dialogue");
            return Err(PipelineError::new(PipelineErrorKind::EmptyOutput));
        }
        debug!(length = char_len(&body), has_title = !title.is_empty(), "Initial draft normalised");

        let mut trace = StageTrace::default();

        if self.settings.continuation
            && let Some(extended) = self.extend(&body, &band, &closing).await
        {
            body = extended;
            trace.continued = true;
        }

        if self.settings.verification
            && let Some(revised) = self.verify(&body, &band, &style, prompt.guideline()).await
        {
            body = revised;
            trace.verified = true;
        }

        let body = finalize_band(&body, &band, &closing);
        if !has_dialogue(&body, &closing) {
            warn!("Finished body is empty");
            return Err(PipelineError::new(PipelineErrorKind::EmptyOutput));
        }

        if title.is_empty()
            && self.settings.title_regeneration
            && let Some(generated) = self.retitle(&body, request).await
        {
            title = generated;
            trace.title_regenerated = true;
        }
        if title.is_empty() {
            title = self.settings.placeholder_title.clone();
        }

        let length = char_len(&body);
        info!(
            length,
            in_band = band.contains(length),
            continued = trace.continued,
            verified = trace.verified,
            "Script finished"
        );

        Ok(FinishedScript {
            title,
            body,
            band,
            techniques: prompt.techniques().clone(),
            structure: prompt.structure().clone(),
            trace,
        })
    }

    /// Continuation stage. `None` keeps the current draft.
    async fn extend(&self, body: &str, band: &LengthBand, closing: &ClosingLine) -> Option<String> {
        let length = char_len(body);
        let shortfall = (band.min as usize).saturating_sub(length);
        if shortfall <= self.settings.continuation_threshold {
            debug!(length, shortfall, "Draft long enough, skipping continuation");
            return None;
        }

        let seed = strip_closing_lines(body, closing);
        let remaining = (band.target.max(band.min) as usize).saturating_sub(length);
        let request = CompletionRequest::new(
            continuation_messages(&seed, remaining, closing),
            self.settings.continuation_temperature,
            continuation_token_budget(remaining, self.settings.max_output_tokens),
        );
        debug!(length, remaining, "Requesting continuation");

        let text = match self.generator.complete(&request).await {
            Ok(text) => text,
            Err(e) => {
                warn!(error = %e, "Continuation failed, keeping previous draft");
                return None;
            }
        };

        let (_, addition) = split_title_and_body(&text);
        let addition = reshape(&enforce_band(&addition, band, true), closing);
        if !has_dialogue(&addition, closing) {
            warn!("Continuation carried no dialogue, keeping previous draft");
            return None;
        }

        let merged = reshape(&format!("{seed}\n\n{addition}"), closing);
        debug!(before = length, after = char_len(&merged), "Continuation merged");
        Some(merged)
    }

    /// Verification stage. `None` keeps the current draft.
    async fn verify(
        &self,
        body: &str,
        band: &LengthBand,
        style: &ScriptStyle<'_>,
        guideline: &str,
    ) -> Option<String> {
        let findings = audit(body, band, style.closing, style.banned_words);
        debug!(findings = findings.len(), "Requesting verification");

        let request = CompletionRequest::new(
            verification_messages(body, band, style, guideline, &findings),
            self.settings.verification_temperature,
            initial_token_budget(band.max, self.settings.max_output_tokens),
        );
        let text = match self.generator.complete(&request).await {
            Ok(text) => text,
            Err(e) => {
                warn!(error = %e, "Verification failed, keeping previous draft");
                return None;
            }
        };

        let (_, revised) = split_title_and_body(&text);
        let revised = reshape(&enforce_band(&revised, band, true), style.closing);
        if !has_dialogue(&revised, style.closing) {
            warn!("Verification reply carried no dialogue, keeping previous draft");
            return None;
        }
        Some(revised)
    }

    /// Title regeneration stage.
    async fn retitle(&self, body: &str, request: &GenerationRequest) -> Option<String> {
        let completion = CompletionRequest::new(
            title_messages(body, &request.theme),
            self.settings.title_temperature,
            TITLE_TOKEN_BUDGET,
        );
        let text = match self.generator.complete(&completion).await {
            Ok(text) => text,
            Err(e) => {
                warn!(error = %e, "Title generation failed, using placeholder");
                return None;
            }
        };

        let title: String = text
            .lines()
            .map(clean_title)
            .find(|line| !line.is_empty())?
            .chars()
            .take(MAX_TITLE_CHARS)
            .collect();
        Some(title)
    }
}
