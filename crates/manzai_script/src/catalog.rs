//! Static technique tables.
//!
//! Lookups never fail: identifiers the catalog does not know are dropped
//! silently so clients holding stale identifiers keep working.

use manzai_core::{TechniqueCategory, TechniqueSelection};
use manzai_interface::TechniquePicker;

/// A named rhetorical device with its prompt description.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Technique {
    /// Stable identifier sent by clients
    pub id: &'static str,
    /// `<label>：<explanation>` text placed in the prompt
    pub description: &'static str,
}

impl Technique {
    /// Short label: the description up to the full-width colon.
    pub fn label(&self) -> &'static str {
        self.description
            .split_once('：')
            .map_or(self.description, |(label, _)| label)
    }
}

const BOKE: &[Technique] = &[
    Technique {
        id: "IIMACHIGAI",
        description: "言い間違い／聞き間違い：音韻のズレで意外性を生むボケ（例：「カニ食べ行こう」→「紙食べ行こう？」）。",
    },
    Technique {
        id: "HIYU",
        description: "比喩ボケ：比喩で誇張してのボケ",
    },
    Technique {
        id: "GYAKUSETSU",
        description: "逆説ボケ：一見正論に聞こえるが論理が破綻しているボケ。",
    },
    Technique {
        id: "GIJI_RONRI",
        description: "擬似論理ボケ：論理風だが中身がズレているボケ。",
    },
    Technique {
        id: "TSUKKOMI_BOKE",
        description: "ツッコミボケ：ツッコミの発言が次のボケの伏線になるボケ。",
    },
    Technique {
        id: "RENSA",
        description: "ボケの連鎖：ボケが次のボケを誘発するように連続させ、加速感を生むボケ。",
    },
    Technique {
        id: "KOTOBA_ASOBI",
        description: "言葉遊び：ダジャレ・韻などで言語的にふざける。",
    },
];

const TSUKKOMI: &[Technique] = &[
    Technique {
        id: "ODOROKI_GIMON",
        description: "驚き・疑問ツッコミ：観客の代弁として即時の驚き・疑問でのツッコミ。",
    },
    Technique {
        id: "AKIRE_REISEI",
        description: "呆れ・冷静ツッコミ：感情を抑えた冷静な態度でのツッコミ。",
    },
    Technique {
        id: "OKORI",
        description: "怒りツッコミ：怒ったような言い方でのツッコミ。",
    },
    Technique {
        id: "KYOKAN",
        description: "共感ツッコミ：相手の感情に一度共感してから、ツッコミをする。",
    },
    Technique {
        id: "META",
        description: "メタツッコミ：漫才の形式・構造そのものを指摘するツッコミ。",
    },
];

const GENERAL: &[Technique] = &[
    Technique {
        id: "SANDAN_OCHI",
        description: "三段オチ：1・2をフリ、3で意外なオチ。",
    },
    Technique {
        id: "GYAKUHARI",
        description: "逆張り構成：期待・常識を外して予想を逆手に取る。",
    },
    Technique {
        id: "TENKAI_HAKAI",
        description: "展開破壊：築いた流れを意図的に壊し異質な要素を挿入。",
    },
    Technique {
        id: "KANCHIGAI_TEISEI",
        description: "勘違い→訂正：ボケの勘違いをツッコミが訂正する構成。",
    },
    Technique {
        id: "SURECHIGAI",
        description: "すれ違い：互いの前提が噛み合わずズレ続けて笑いを生む。",
    },
    Technique {
        id: "TACHIBA_GYAKUTEN",
        description: "立場逆転：途中または終盤で役割・地位がひっくり返る。",
    },
];

/// Structural stages every script states, in order.
pub const BASE_STRUCTURE: [&str; 3] = ["フリ", "伏線回収", "最後のオチ"];

/// Always part of the randomized fallback set.
pub const MANDATORY_TECHNIQUE: &str = "比喩ツッコミ";

/// Pool the randomized fallback draws its extras from.
pub const FALLBACK_POOL: [&str; 7] = [
    "風刺",
    "皮肉",
    "意外性と納得感",
    "勘違い→訂正",
    "言い間違い→すれ違い",
    "立場逆転",
    "具体例の誇張",
];

const FALLBACK_MIN_EXTRA: usize = 1;
const FALLBACK_MAX_EXTRA: usize = 3;

/// Every technique in a category.
pub fn techniques(category: TechniqueCategory) -> &'static [Technique] {
    match category {
        TechniqueCategory::Boke => BOKE,
        TechniqueCategory::Tsukkomi => TSUKKOMI,
        TechniqueCategory::General => GENERAL,
    }
}

/// Look up one identifier.
///
/// # Examples
///
/// ```
/// use manzai_core::TechniqueCategory;
/// use manzai_script::catalog;
///
/// let technique = catalog::lookup(TechniqueCategory::General, "SANDAN_OCHI").unwrap();
/// assert_eq!(technique.label(), "三段オチ");
/// assert!(catalog::lookup(TechniqueCategory::General, "NO_SUCH_ID").is_none());
/// ```
pub fn lookup(category: TechniqueCategory, id: &str) -> Option<&'static Technique> {
    techniques(category).iter().find(|t| t.id == id)
}

/// Recognised techniques for one category, in request order.
pub fn recognized(selection: &TechniqueSelection, category: TechniqueCategory) -> Vec<&'static Technique> {
    selection
        .ids(category)
        .iter()
        .filter_map(|id| lookup(category, id))
        .collect()
}

/// Labels of the recognised techniques for one category.
pub fn labels(selection: &TechniqueSelection, category: TechniqueCategory) -> Vec<String> {
    recognized(selection, category)
        .into_iter()
        .map(|t| t.label().to_string())
        .collect()
}

fn section_header(category: TechniqueCategory) -> &'static str {
    match category {
        TechniqueCategory::Boke => "【ボケ技法】",
        TechniqueCategory::Tsukkomi => "【ツッコミ技法】",
        TechniqueCategory::General => "【全般の構成技法】",
    }
}

/// Guideline text listing every recognised technique under its category
/// header. Empty categories are omitted entirely.
pub fn guideline(selection: &TechniqueSelection) -> String {
    let mut parts: Vec<String> = Vec::new();
    for category in [
        TechniqueCategory::Boke,
        TechniqueCategory::Tsukkomi,
        TechniqueCategory::General,
    ] {
        let found = recognized(selection, category);
        if found.is_empty() {
            continue;
        }
        parts.push(section_header(category).to_string());
        parts.extend(found.iter().map(|t| format!("- {}", t.description)));
    }
    parts.join("\n")
}

/// Randomized default set: the mandatory technique followed by one to
/// three distinct extras from [`FALLBACK_POOL`].
pub fn fallback_techniques(picker: &dyn TechniquePicker) -> Vec<String> {
    let extra = picker
        .extra_count(FALLBACK_MIN_EXTRA, FALLBACK_MAX_EXTRA)
        .clamp(FALLBACK_MIN_EXTRA, FALLBACK_MAX_EXTRA);

    std::iter::once(MANDATORY_TECHNIQUE)
        .chain(picker.shuffle(&FALLBACK_POOL).into_iter().take(extra))
        .map(str::to_string)
        .collect()
}
