//! Per-request generation parameters.

use serde::{Deserialize, Serialize};

const DEFAULT_THEME: &str = "身近な題材";
const DEFAULT_GENRE: &str = "一般";
const DEFAULT_CHARACTERS: &str = "A,B";
const DEFAULT_REACTIVE_NAME: &str = "B";
const MAX_CHARACTERS: usize = 4;

/// The three fixed technique categories.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    derive_more::Display,
)]
#[serde(rename_all = "snake_case")]
pub enum TechniqueCategory {
    /// Comedic-setup techniques (ボケ)
    #[display("boke")]
    Boke,
    /// Reactive-response techniques (ツッコミ)
    #[display("tsukkomi")]
    Tsukkomi,
    /// Overall-structure techniques
    #[display("general")]
    General,
}

/// Technique identifiers chosen by the caller, partitioned by category.
///
/// Identifiers are kept verbatim; unknown ones are dropped later by the
/// catalog lookup, not here.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(default)]
pub struct TechniqueSelection {
    /// Setup technique ids
    pub boke: Vec<String>,
    /// Reactive technique ids
    pub tsukkomi: Vec<String>,
    /// Structure technique ids
    pub general: Vec<String>,
}

impl TechniqueSelection {
    /// True when the caller supplied no identifier in any category.
    pub fn is_empty(&self) -> bool {
        self.boke.is_empty() && self.tsukkomi.is_empty() && self.general.is_empty()
    }

    /// Identifiers for one category.
    pub fn ids(&self, category: TechniqueCategory) -> &[String] {
        match category {
            TechniqueCategory::Boke => &self.boke,
            TechniqueCategory::Tsukkomi => &self.tsukkomi,
            TechniqueCategory::General => &self.general,
        }
    }
}

/// Normalised generation parameters. Not persisted.
///
/// # Examples
///
/// ```
/// use manzai_core::{GenerationRequest, TechniqueSelection};
///
/// let request = GenerationRequest::new(
///     Some("  "),
///     None,
///     Some("太郎、花子, 次郎"),
///     350,
///     TechniqueSelection::default(),
/// );
/// assert_eq!(request.theme, "身近な題材");
/// assert_eq!(request.characters, vec!["太郎", "花子", "次郎"]);
/// assert_eq!(request.reactive_name(), "花子");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GenerationRequest {
    /// Subject of the script
    pub theme: String,
    /// Genre or flavour
    pub genre: String,
    /// Speaker names, 1 to 4, second entry is the reactive speaker
    pub characters: Vec<String>,
    /// Clamped target length in characters
    pub target_length: u32,
    /// Requested techniques
    pub selection: TechniqueSelection,
}

impl GenerationRequest {
    /// Build a request, substituting defaults for blank fields.
    pub fn new(
        theme: Option<&str>,
        genre: Option<&str>,
        characters: Option<&str>,
        target_length: u32,
        selection: TechniqueSelection,
    ) -> Self {
        Self {
            theme: non_blank(theme).unwrap_or(DEFAULT_THEME).to_string(),
            genre: non_blank(genre).unwrap_or(DEFAULT_GENRE).to_string(),
            characters: parse_characters(non_blank(characters).unwrap_or(DEFAULT_CHARACTERS)),
            target_length,
            selection,
        }
    }

    /// Name of the designated reactive speaker, who delivers the closing line.
    pub fn reactive_name(&self) -> &str {
        self.characters
            .get(1)
            .map(String::as_str)
            .unwrap_or(DEFAULT_REACTIVE_NAME)
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

/// Split a comma or ideographic-comma separated name list, keeping at most four.
fn parse_characters(raw: &str) -> Vec<String> {
    let names: Vec<String> = raw
        .split([',', '、'])
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .take(MAX_CHARACTERS)
        .map(str::to_string)
        .collect();

    if names.is_empty() {
        parse_characters(DEFAULT_CHARACTERS)
    } else {
        names
    }
}
