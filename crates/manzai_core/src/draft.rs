//! Script draft carried through the pipeline.

use serde::{Deserialize, Serialize};

/// Character count used for every length measurement.
///
/// Counts Unicode scalar values, so a full-width character counts as one.
pub fn char_len(text: &str) -> usize {
    text.chars().count()
}

/// Title plus dialogue body, mutated stage by stage.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ScriptDraft {
    /// Extracted title, possibly empty until finalisation
    pub title: String,
    /// Dialogue turns rendered as text
    pub body: String,
}

impl ScriptDraft {
    /// Create a draft from its parts.
    pub fn new(title: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            body: body.into(),
        }
    }

    /// Body length in characters, the quantity the band is measured against.
    pub fn length(&self) -> usize {
        char_len(&self.body)
    }

    /// Whether the body has any visible content.
    pub fn is_blank(&self) -> bool {
        self.body.trim().is_empty()
    }
}
