//! Prompt text for every model call the pipeline makes.

use derive_getters::Getters;
use manzai_core::{GenerationRequest, LengthBand, Message, TechniqueCategory};
use manzai_interface::TechniquePicker;

use crate::catalog;
use crate::normalizer::{AuditFinding, ClosingLine};

const SYSTEM_INITIAL: &str =
    "あなたは実力派の漫才師コンビです。舞台で即使える台本だけを出力してください。解説・メタ記述は禁止。";
const SYSTEM_CONTINUATION: &str =
    "あなたは実力派の漫才師コンビです。本文の“続き”だけを出力してください。";
const SYSTEM_VERIFICATION: &str =
    "あなたは漫才台本の校正担当です。修正後の台本本文だけを出力してください。解説は禁止。";
const SYSTEM_TITLE: &str = "あなたは漫才コンビの構成作家です。タイトルだけを出力してください。";

const MIN_DIALOGUE_LINES: usize = 12;
const CHARS_PER_LINE: usize = 35;

const INITIAL_TOKEN_FLOOR: u64 = 3500;
const CONTINUATION_TOKEN_FLOOR: u64 = 400;
const TOKENS_PER_CHAR_HEADROOM: u64 = 2;
const TOKEN_SAFETY_FACTOR: u64 = 3;

/// Token budget for title generation.
pub const TITLE_TOKEN_BUDGET: u32 = 200;

/// Wording shared by every prompt in one pipeline run.
#[derive(Debug, Clone)]
pub struct ScriptStyle<'a> {
    /// Mandatory final line
    pub closing: &'a ClosingLine,
    /// Words that must never appear in the body
    pub banned_words: &'a [String],
}

/// The initial prompt plus the metadata the response reports.
#[derive(Debug, Clone, PartialEq, Eq, Getters)]
pub struct BuiltPrompt {
    /// System message
    system: String,
    /// User message
    instruction: String,
    /// Technique labels reported back to the client
    techniques: Vec<String>,
    /// Structure labels reported back to the client
    structure: Vec<String>,
    /// Technique block the model was told to use in full
    guideline: String,
    /// Minimum dialogue line count requested from the model
    min_lines: usize,
}

impl BuiltPrompt {
    /// System plus user message, ready for a completion request.
    pub fn messages(&self) -> Vec<Message> {
        vec![
            Message::system(self.system.clone()),
            Message::user(self.instruction.clone()),
        ]
    }
}

/// Minimum dialogue line count for a band.
///
/// # Examples
///
/// ```
/// use manzai_script::prompt::min_lines;
///
/// assert_eq!(min_lines(315), 12);
/// assert_eq!(min_lines(1800), 52);
/// ```
pub fn min_lines(band_min: u32) -> usize {
    (band_min as usize)
        .div_ceil(CHARS_PER_LINE)
        .max(MIN_DIALOGUE_LINES)
}

/// Output-token allowance for the initial call.
///
/// # Examples
///
/// ```
/// use manzai_script::prompt::initial_token_budget;
///
/// assert_eq!(initial_token_budget(385, 8192), 8192);
/// assert_eq!(initial_token_budget(385, 20000), 10500);
/// ```
pub fn initial_token_budget(band_max: u32, cap: u32) -> u32 {
    token_budget(u64::from(band_max), INITIAL_TOKEN_FLOOR, cap)
}

/// Output-token allowance for a continuation of `remaining` characters.
pub fn continuation_token_budget(remaining: usize, cap: u32) -> u32 {
    token_budget(remaining as u64, CONTINUATION_TOKEN_FLOOR, cap)
}

fn token_budget(chars: u64, floor: u64, cap: u32) -> u32 {
    let estimate = (chars * TOKENS_PER_CHAR_HEADROOM).max(floor) * TOKEN_SAFETY_FACTOR;
    u32::try_from(estimate).unwrap_or(u32::MAX).min(cap)
}

fn banned_line(banned_words: &[String]) -> Option<String> {
    if banned_words.is_empty() {
        return None;
    }
    let quoted: String = banned_words.iter().map(|w| format!("「{w}」")).collect();
    Some(format!("- {quoted}と直接本文に書かない。"))
}

/// Assemble the initial prompt.
///
/// With no recognised selection the guideline falls back to the
/// randomized technique set drawn through `picker`.
pub fn build_prompt(
    request: &GenerationRequest,
    band: &LengthBand,
    style: &ScriptStyle<'_>,
    picker: &dyn TechniquePicker,
) -> BuiltPrompt {
    let mut structure: Vec<String> = catalog::BASE_STRUCTURE.iter().map(|s| s.to_string()).collect();

    let (guideline, techniques) = if request.selection.is_empty() {
        let picked = catalog::fallback_techniques(picker);
        let lines: Vec<String> = picked.iter().map(|t| format!("- {t}")).collect();
        (format!("【採用する技法】\n{}", lines.join("\n")), picked)
    } else {
        let mut labels = catalog::labels(&request.selection, TechniqueCategory::Boke);
        labels.extend(catalog::labels(&request.selection, TechniqueCategory::Tsukkomi));
        structure.extend(catalog::labels(&request.selection, TechniqueCategory::General));
        (catalog::guideline(&request.selection), labels)
    };

    let min_lines = min_lines(band.min);
    let closing = style.closing.render();

    let mut lines: Vec<String> = vec![
        "あなたは実力派の漫才師コンビです。「採用する技法」を必ず使い、日本語の漫才台本を作成してください。".into(),
        String::new(),
        format!("■題材: {}", request.theme),
        format!("■ジャンル: {}", request.genre),
        format!("■登場人物: {}", request.characters.join("、")),
        format!(
            "■目標文字数: {}〜{}文字（必ずこの範囲内に収める）",
            band.min, band.max
        ),
        String::new(),
        "■必須の構成".into(),
        "- 1) フリ（導入）：ボケやオチを成立させるための「前提」「状況設定」「観客との共通認識づくり」を設定する。".into(),
        "- 2) 伏線回収：フリ（導入）の段階で提示された情報・言葉・構図を、後半で再登場させて「意外な形で再接続」させる。".into(),
        "- 3) 最後は明確な“オチ”：全てのズレ・やり取りを収束させる表現、言葉を使う。".into(),
        String::new(),
        "■必ず使用する技法（名称を本文に書かない）".into(),
        "- 下記の各技法は **すべて** 本文中で最低1回以上、観客に伝わる具体的な台詞や展開として **必ず** 用いること（未使用は不可）。".into(),
        "- 出力前に **自己チェック** を行い、未使用の技法がある場合は **本文を追記** して満たしてから出力を終えること。".into(),
        "- 技法名や“この技法を使う”といったメタ表現は本文に **絶対に書かない**。".into(),
        guideline.clone(),
        String::new(),
        "■分量・形式の厳守".into(),
        format!("- 会話の行数は 少なくとも {min_lines} 行以上（1台詞あたり 25〜40 文字目安）。"),
        "- 各台詞は「名前: セリフ」の形式（半角コロン＋半角スペース : を使う）。".into(),
        "- 各台詞の間には必ず空行を1つ入れる（Aの行とBの行の間を1行空ける）。".into(),
        "- 出力は本文のみ（解説・メタ記述や途中での打ち切りを禁止）。".into(),
        format!("- 最後は必ず {closing} の一行で締める（この行は文字数に含める）。"),
    ];
    lines.extend(banned_line(style.banned_words));
    lines.extend(
        [
            "- 「緊張感のある状態」とそれが「緩和する状態」を必ず作る。",
            "- 「選択された技法」をしっかり使う。",
            "■見出し・書式",
            "- 最初の1行に【タイトル】を入れ、その直後に本文（漫才）を続ける",
            "- タイトルと本文の間には必ず空行を1つ入れる",
            "■その他",
            "- 人間にとって「意外性」があるが「納得感」のある表現を使う。",
            "- 登場人物の個性を反映する。",
            "- 観客がしっかり笑える表現にする。",
        ]
        .map(String::from),
    );

    BuiltPrompt {
        system: SYSTEM_INITIAL.to_string(),
        instruction: lines.join("\n"),
        techniques,
        structure,
        guideline,
        min_lines,
    }
}

/// Messages asking the model to continue `seed` by at least `remaining`
/// characters.
pub fn continuation_messages(seed: &str, remaining: usize, closing: &ClosingLine) -> Vec<Message> {
    let instruction = [
        "以下は途中まで書かれた漫才の本文です。これを“そのまま続けてください”。".to_string(),
        "・タイトルは出さない".into(),
        "・これまでの台詞やネタの反復はしない".into(),
        format!(
            "・少なくとも {remaining} 文字以上、自然に展開し、最後は {} で締める",
            closing.render()
        ),
        "・各行は「名前: セリフ」の形式（半角コロン＋スペース）".into(),
        "・台詞同士の間には必ず空行を1つ挟む".into(),
        String::new(),
        "【これまでの本文】".into(),
        seed.to_string(),
    ]
    .join("\n");

    vec![Message::system(SYSTEM_CONTINUATION), Message::user(instruction)]
}

/// Messages asking the model to re-check a draft against the technique
/// and format rules. `guideline` is the technique block of the first prompt.
pub fn verification_messages(
    body: &str,
    band: &LengthBand,
    style: &ScriptStyle<'_>,
    guideline: &str,
    findings: &[AuditFinding],
) -> Vec<Message> {
    let mut lines: Vec<String> = vec![
        "以下の漫才台本を次のチェック項目に沿って確認し、問題があれば修正した全文を出力してください。".into(),
        "問題がなければ、そのまま全文を出力してください。".into(),
        String::new(),
        "■チェック項目".into(),
        "- 次の技法をすべて本文中で最低1回以上使っている（技法名は本文に書かない）".into(),
        guideline.to_string(),
        format!("- 本文は {}〜{} 文字に収まっている", band.min, band.max),
        "- すべての台詞が「名前: セリフ」の形式（半角コロン＋半角スペース）".into(),
        "- 台詞同士の間に空行が1つずつある".into(),
        format!("- 最後の一行は {} である", style.closing.render()),
        "- タイトルや解説は出力しない".into(),
    ];
    if !style.banned_words.is_empty() {
        let quoted: String = style.banned_words.iter().map(|w| format!("「{w}」")).collect();
        lines.push(format!("- {quoted}という語を本文に書かない"));
    }
    if !findings.is_empty() {
        lines.push(String::new());
        lines.push("■検出済みの問題".into());
        lines.extend(findings.iter().map(|f| format!("- {f}")));
    }
    lines.push(String::new());
    lines.push("【台本】".into());
    lines.push(body.to_string());

    vec![Message::system(SYSTEM_VERIFICATION), Message::user(lines.join("\n"))]
}

/// Messages asking for a title for a finished body.
pub fn title_messages(body: &str, theme: &str) -> Vec<Message> {
    let instruction = [
        "以下の漫才台本に、短く印象的なタイトルを1つだけ付けてください。".to_string(),
        "・20文字以内".into(),
        "・タイトルのみを1行で出力し、括弧や記号で囲まない".into(),
        format!("・題材: {theme}"),
        String::new(),
        "【台本】".into(),
        body.to_string(),
    ]
    .join("\n");

    vec![Message::system(SYSTEM_TITLE), Message::user(instruction)]
}
