//! Pure text transformations applied to model output.
//!
//! Every function here is deterministic and side-effect free. The
//! orchestrator chains them in a fixed order; each one is idempotent so
//! re-running a stage after a merge never changes an already-clean body.

use std::sync::LazyLock;

use manzai_core::{LengthBand, char_len};
use regex::Regex;

/// Characters that count as a sentence ending for band cuts.
pub const SENTENCE_ENDINGS: [char; 7] = ['。', '！', '？', '…', '♪', '!', '?'];

/// Soft cuts shorter than this share of the limit become hard cuts.
const SOFT_CUT_FLOOR_PERCENT: usize = 90;

static CODE_FENCE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)```.*?```").expect("Valid code fence regex"));

static HEADING_LINE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^[ \t]*#{1,6}[ \t].*$").expect("Valid heading regex"));

static SPEAKER_PREFIX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[ \t\x{3000}]*([^:：\n]+?)[ \t\x{3000}]*[:：][ \t\x{3000}]*(.*)$")
        .expect("Valid speaker prefix regex")
});

static TURN_LINE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[^:：\n]+: ").expect("Valid turn line regex"));

static TITLE_LABEL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?i:タイトル|題名|title)[ \t\x{3000}]*[:：][ \t\x{3000}]*")
        .expect("Valid title label regex")
});

static EXCESS_NEWLINES: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\n{3,}").expect("Valid newline run regex"));

/// The mandatory final line, spoken by the reactive character.
///
/// # Examples
///
/// ```
/// use manzai_script::ClosingLine;
///
/// let closing = ClosingLine::new("B", "もういいよ！");
/// assert_eq!(closing.render(), "B: もういいよ！");
/// assert!(closing.matches("花子：もういいよ"));
/// assert!(!closing.matches("B: まだまだ！"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ClosingLine {
    speaker: String,
    phrase: String,
}

impl ClosingLine {
    /// Closing line for `speaker` saying `phrase`.
    pub fn new(speaker: impl Into<String>, phrase: impl Into<String>) -> Self {
        Self {
            speaker: speaker.into(),
            phrase: phrase.into(),
        }
    }

    /// The canonical `name: phrase` line.
    pub fn render(&self) -> String {
        format!("{}: {}", self.speaker, self.phrase)
    }

    /// Phrase without trailing exclamation or full stop.
    fn core(&self) -> &str {
        self.phrase.trim_end_matches(['！', '!', '。'])
    }

    /// Whether a line is a closing line in any common spelling: optional
    /// speaker prefix, the core phrase, optional trailing punctuation.
    pub fn matches(&self, line: &str) -> bool {
        let line = line.trim_matches(is_inline_space);
        let text = match line.split_once([':', '：']) {
            Some((_, rest)) => rest,
            None => line,
        };
        let text = text.trim_matches(is_inline_space);
        let core = self.core();
        !core.is_empty() && text.trim_end_matches(['！', '!', '。']) == core
    }
}

fn is_inline_space(c: char) -> bool {
    matches!(c, ' ' | '\t' | '\u{3000}')
}

/// Whether `text` ends with one of [`SENTENCE_ENDINGS`].
pub fn ends_with_sentence(text: &str) -> bool {
    text.chars()
        .next_back()
        .is_some_and(|c| SENTENCE_ENDINGS.contains(&c))
}

/// Whether a line is a dialogue turn in canonical `name: text` form.
pub fn is_turn(line: &str) -> bool {
    TURN_LINE.is_match(line.trim_start())
}

/// Remove fenced code blocks and markdown heading lines.
pub fn strip_markup(text: &str) -> String {
    let text = text.replace("\r\n", "\n");
    let text = CODE_FENCE.replace_all(&text, "");
    let text = HEADING_LINE.replace_all(&text, "");
    text.trim().to_string()
}

/// Cut `text` to at most `limit` characters.
///
/// Prefers the latest sentence ending or line break inside the limit. When
/// that point falls below 90% of the limit the cut is hard. A full stop is
/// appended to a cut that does not already end a sentence, without
/// exceeding the limit.
pub fn cut_at_sentence(text: &str, limit: usize) -> String {
    cut_at_sentence_keeping(text, limit, 0)
}

/// [`cut_at_sentence`] that also rejects soft cut points before `keep`
/// characters, so a cut never undershoots a known lower bound.
///
/// # Examples
///
/// ```
/// use manzai_script::normalizer::cut_at_sentence_keeping;
///
/// let text = "あいうえおかきくけこさし。すせそたちつてと";
/// assert_eq!(cut_at_sentence_keeping(text, 15, 0), "あいうえおかきくけこさし。");
/// assert_eq!(cut_at_sentence_keeping(text, 15, 15), "あいうえおかきくけこさし。す。");
/// ```
pub fn cut_at_sentence_keeping(text: &str, limit: usize, keep: usize) -> String {
    let chars: Vec<char> = text.chars().collect();
    if chars.len() <= limit {
        return text.to_string();
    }

    let soft = chars[..limit]
        .iter()
        .enumerate()
        .rev()
        .find_map(|(i, &c)| match c {
            '\n' => Some(i),
            c if SENTENCE_ENDINGS.contains(&c) => Some(i + 1),
            _ => None,
        });
    let floor = (limit * SOFT_CUT_FLOOR_PERCENT / 100).max(keep.min(limit));
    let cut = match soft {
        Some(position) if position >= floor && position > 0 => position,
        _ => limit,
    };

    let mut out: String = chars[..cut].iter().collect::<String>().trim_end().to_string();
    if out.is_empty() || ends_with_sentence(&out) {
        return out;
    }
    if char_len(&out) >= limit {
        out.pop();
        out = out.trim_end().to_string();
        if ends_with_sentence(&out) && char_len(&out) >= keep {
            return out;
        }
    }
    out.push('。');
    out
}

/// Band enforcement.
///
/// Strips markup, then cuts anything above `band.max` unless
/// `allow_overflow` is set. Text below `band.min` only gains terminal
/// punctuation; it is never padded.
pub fn enforce_band(text: &str, band: &LengthBand, allow_overflow: bool) -> String {
    let mut out = strip_markup(text);
    if out.is_empty() {
        return out;
    }
    if !allow_overflow && char_len(&out) > band.max as usize {
        out = cut_at_sentence(&out, band.max as usize);
    }
    if char_len(&out) < band.min as usize && !ends_with_sentence(&out) {
        out.push('。');
    }
    out
}

/// Rewrite every `name:`/`name：` prefix, with any surrounding whitespace,
/// to exactly `name: `. Lines without a colon are left alone.
///
/// # Examples
///
/// ```
/// use manzai_script::normalizer::normalize_speaker_colons;
///
/// let text = "A ：こんにちは\n　B:どうも\n拍手";
/// assert_eq!(normalize_speaker_colons(text), "A: こんにちは\nB: どうも\n拍手");
/// ```
pub fn normalize_speaker_colons(text: &str) -> String {
    text.lines()
        .map(|line| match SPEAKER_PREFIX.captures(line) {
            Some(caps) => format!("{}: {}", &caps[1], &caps[2]),
            None => line.to_string(),
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Collapse blank-line runs and put exactly one blank line between
/// adjacent turns.
pub fn ensure_blank_lines(text: &str) -> String {
    let mut compressed: Vec<&str> = Vec::new();
    for line in text.lines() {
        let blank = line.trim().is_empty();
        if blank && compressed.last().is_none_or(|prev| prev.is_empty()) {
            continue;
        }
        compressed.push(if blank { "" } else { line.trim_end() });
    }

    let mut out: Vec<&str> = Vec::with_capacity(compressed.len() * 2);
    for (i, line) in compressed.iter().copied().enumerate() {
        out.push(line);
        if is_turn(line) && compressed.get(i + 1).is_some_and(|next| is_turn(next)) {
            out.push("");
        }
    }

    let joined = out.join("\n");
    EXCESS_NEWLINES
        .replace_all(joined.trim(), "\n\n")
        .into_owned()
}

/// Drop every trailing closing line, repeatedly.
pub fn strip_closing_lines(text: &str, closing: &ClosingLine) -> String {
    let mut rest = text.trim_end();
    loop {
        let (head, last) = match rest.rsplit_once('\n') {
            Some((head, last)) => (head, last),
            None => ("", rest),
        };
        if last.trim().is_empty() || !closing.matches(last) {
            return rest.to_string();
        }
        rest = head.trim_end();
    }
}

/// Guarantee the body ends with exactly one closing line, separated from
/// the dialogue by one blank line.
///
/// # Examples
///
/// ```
/// use manzai_script::ClosingLine;
/// use manzai_script::normalizer::ensure_closing_line;
///
/// let closing = ClosingLine::new("B", "もういいよ！");
/// let body = "A: ボケ\n\nB: もういいよ\nB：もういいよ！";
/// assert_eq!(ensure_closing_line(body, &closing), "A: ボケ\n\nB: もういいよ！");
/// ```
pub fn ensure_closing_line(text: &str, closing: &ClosingLine) -> String {
    let content = strip_closing_lines(text, closing);
    if content.trim().is_empty() {
        closing.render()
    } else {
        format!("{}\n\n{}", content, closing.render())
    }
}

/// Colon, blank-line, and closing normalisation in one pass.
pub fn reshape(text: &str, closing: &ClosingLine) -> String {
    let colons = normalize_speaker_colons(text);
    let spaced = ensure_blank_lines(&colons);
    ensure_closing_line(&spaced, closing)
}

/// Whether the body carries at least one turn besides the closing line.
pub fn has_dialogue(text: &str, closing: &ClosingLine) -> bool {
    strip_closing_lines(text, closing).lines().any(is_turn)
}

/// Fold lines that are not turns into the preceding turn. Lines before the
/// first turn are dropped.
pub fn fold_orphan_lines(text: &str) -> String {
    let mut out: Vec<String> = Vec::new();
    let mut last_turn: Option<usize> = None;
    for line in text.lines() {
        if line.trim().is_empty() {
            out.push(String::new());
        } else if is_turn(line) {
            out.push(line.trim().to_string());
            last_turn = Some(out.len() - 1);
        } else if let Some(index) = last_turn {
            out[index].push_str(line.trim());
        }
    }
    ensure_blank_lines(&out.join("\n"))
}

fn is_heading(line: &str) -> bool {
    let line = line.trim();
    line.starts_with('#')
        || (line.starts_with('【') && line.ends_with('】'))
        || (line.starts_with('『') && line.ends_with('』'))
        || (line.len() > 4 && line.starts_with("**") && line.ends_with("**"))
        || TITLE_LABEL.is_match(line)
}

/// Strip heading marks, label prefixes, and decorative brackets.
///
/// # Examples
///
/// ```
/// use manzai_script::normalizer::clean_title;
///
/// assert_eq!(clean_title("## 【タイトル：満員電車】"), "満員電車");
/// assert_eq!(clean_title("**Title: 朝の攻防**"), "朝の攻防");
/// ```
pub fn clean_title(line: &str) -> String {
    let line = line.trim().trim_start_matches('#').trim();
    let line = line
        .strip_prefix("**")
        .and_then(|l| l.strip_suffix("**"))
        .unwrap_or(line);
    let line = strip_brackets(line.trim());
    let line = TITLE_LABEL.replace(line, "");
    strip_brackets(line.trim()).trim().to_string()
}

fn strip_brackets(line: &str) -> &str {
    line.trim_start_matches(['【', '「', '『'])
        .trim_end_matches(['】', '」', '』'])
}

fn title_key(title: &str) -> String {
    title
        .chars()
        .filter(|c| !c.is_whitespace())
        .flat_map(char::to_lowercase)
        .collect()
}

/// Split raw model output into title and body.
///
/// The first line is the title when it is decorated as a heading or when
/// it forms a block of its own that is not a dialogue turn. Otherwise the
/// title is empty and the whole text is the body.
pub fn split_title_and_body(raw: &str) -> (String, String) {
    let text = raw.replace("\r\n", "\n");
    let text = text.trim();
    let (first, remainder) = text.split_once('\n').unwrap_or((text, ""));

    let own_block = remainder
        .split_once('\n')
        .map_or(remainder.trim().is_empty(), |(next, _)| next.trim().is_empty());
    let candidate = is_heading(first)
        || (own_block && !remainder.trim().is_empty() && !is_turn(&normalize_speaker_colons(first)));

    if !candidate {
        return (String::new(), text.to_string());
    }

    (clean_title(first), remainder.trim().to_string())
}

/// Remove a first body line that repeats the title or looks like a heading.
pub fn enforce_single_title(title: &str, body: &str) -> String {
    let body = body.trim_start();
    let (first, rest) = body.split_once('\n').unwrap_or((body, ""));
    let duplicate = !title.is_empty() && title_key(&clean_title(first)) == title_key(title);
    if duplicate || is_heading(first) {
        rest.trim_start().to_string()
    } else {
        body.to_string()
    }
}

/// Final strict band with the closing line preserved.
///
/// Dialogue is cut to leave room for the closing line, then the closing
/// line is re-attached, so the result never exceeds `band.max`. The cut
/// never lands before `band.min` minus that room.
pub fn finalize_band(body: &str, band: &LengthBand, closing: &ClosingLine) -> String {
    let closing_line = closing.render();
    let reserve = char_len(&closing_line) + 2;
    let budget = (band.max as usize).saturating_sub(reserve);
    let keep = (band.min as usize).saturating_sub(reserve);

    let content = strip_closing_lines(&strip_markup(body), closing);
    let content = fold_orphan_lines(&normalize_speaker_colons(&content));
    let content = cut_at_sentence_keeping(&content, budget, keep);

    let mut out = ensure_closing_line(&ensure_blank_lines(&content), closing);
    if char_len(&out) < band.min as usize && !ends_with_sentence(&out) {
        out.push('。');
    }
    out
}

/// A problem found by [`audit`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, derive_more::Display)]
pub enum AuditFinding {
    /// A banned meta word appears in the body
    #[display("禁止語「{}」が本文に含まれている", _0)]
    BannedWord(String),
    /// Body is shorter than the band
    #[display("文字数が不足している（{} 字 / 下限 {} 字）", length, min)]
    TooShort {
        /// Current length
        length: usize,
        /// Band minimum
        min: u32,
    },
    /// Body is longer than the band
    #[display("文字数が超過している（{} 字 / 上限 {} 字）", length, max)]
    TooLong {
        /// Current length
        length: usize,
        /// Band maximum
        max: u32,
    },
    /// A non-blank line is not a `name: text` turn
    #[display("話者形式でない行がある：{}", _0)]
    MalformedLine(String),
    /// Two turns are adjacent without a blank line
    #[display("発言の間に空行がない箇所がある")]
    MissingBlankLine,
    /// The closing line is absent
    #[display("最後が締めの一言で終わっていない")]
    ClosingMissing,
    /// The closing line appears more than once
    #[display("締めの一言が複数回ある")]
    ClosingDuplicated,
}

/// Local checks used to prime the verification pass.
pub fn audit(
    body: &str,
    band: &LengthBand,
    closing: &ClosingLine,
    banned_words: &[String],
) -> Vec<AuditFinding> {
    let mut findings: Vec<AuditFinding> = banned_words
        .iter()
        .filter(|word| !word.is_empty() && body.contains(word.as_str()))
        .map(|word| AuditFinding::BannedWord(word.clone()))
        .collect();

    let length = char_len(body);
    if length < band.min as usize {
        findings.push(AuditFinding::TooShort {
            length,
            min: band.min,
        });
    } else if length > band.max as usize {
        findings.push(AuditFinding::TooLong {
            length,
            max: band.max,
        });
    }

    let lines: Vec<&str> = body.lines().collect();
    if let Some(line) = lines
        .iter()
        .find(|line| !line.trim().is_empty() && !is_turn(line))
    {
        findings.push(AuditFinding::MalformedLine(line.trim().to_string()));
    }
    if lines.windows(2).any(|pair| is_turn(pair[0]) && is_turn(pair[1])) {
        findings.push(AuditFinding::MissingBlankLine);
    }
    if lines
        .iter()
        .rev()
        .find(|line| !line.trim().is_empty())
        .is_none_or(|line| !closing.matches(line))
    {
        findings.push(AuditFinding::ClosingMissing);
    }
    if lines.iter().filter(|line| closing.matches(line)).count() > 1 {
        findings.push(AuditFinding::ClosingDuplicated);
    }

    findings
}

#[cfg(test)]
mod tests {
    use super::*;

    fn band(min: u32, max: u32) -> LengthBand {
        LengthBand {
            target: (min + max) / 2,
            min,
            max,
        }
    }

    fn closing() -> ClosingLine {
        ClosingLine::new("B", "もういいよ！")
    }

    #[test]
    fn test_cut_prefers_sentence_end() {
        let text = "あいうえおかきくけこ。さしすせそ";
        assert_eq!(cut_at_sentence(text, 12), "あいうえおかきくけこ。");
    }

    #[test]
    fn test_cut_falls_back_to_hard_cut() {
        let text = "あ。いうえおかきくけこさしすせそ";
        let out = cut_at_sentence(text, 10);
        assert_eq!(char_len(&out), 10);
        assert!(out.ends_with('。'));
        assert_eq!(out, "あ。いうえおかきく。");
    }

    #[test]
    fn test_band_allows_overflow_on_request() {
        let text = "あ".repeat(50);
        assert_eq!(char_len(&enforce_band(&text, &band(10, 20), true)), 50);
        assert!(char_len(&enforce_band(&text, &band(10, 20), false)) <= 20);
    }

    #[test]
    fn test_band_under_floor_only_gains_punctuation() {
        assert_eq!(enforce_band("短い", &band(100, 120), false), "短い。");
        assert_eq!(enforce_band("短い！", &band(100, 120), false), "短い！");
    }

    #[test]
    fn test_band_strips_fences_and_headings() {
        let text = "```\nignored\n```\n# 見出し\nA: 本文";
        assert_eq!(enforce_band(text, &band(1, 100), false), "A: 本文");
    }

    #[test]
    fn test_blank_lines_between_turns() {
        let text = "A: 一\nB: 二\n\n\n\nA: 三";
        assert_eq!(ensure_blank_lines(text), "A: 一\n\nB: 二\n\nA: 三");
    }

    #[test]
    fn test_blank_lines_idempotent() {
        let once = ensure_blank_lines("A: 一\nB: 二\n   \nA: 三");
        assert_eq!(ensure_blank_lines(&once), once);
    }

    #[test]
    fn test_closing_line_on_empty_body() {
        assert_eq!(ensure_closing_line("   ", &closing()), "B: もういいよ！");
    }

    #[test]
    fn test_closing_line_single_occurrence() {
        let body = "A: ボケ\n\nB: もういいよ！\n\nB: もういいよ！";
        let out = ensure_closing_line(body, &closing());
        assert_eq!(out.matches("もういいよ").count(), 1);
        assert_eq!(ensure_closing_line(&out, &closing()), out);
    }

    #[test]
    fn test_reshape_bare_turns_gain_closing() {
        let (title, body) = split_title_and_body("Title\n\nA: hi\nB: hi\nA: hi\nB: hi");
        assert_eq!(title, "Title");
        assert_eq!(
            reshape(&body, &closing()),
            "A: hi\n\nB: hi\n\nA: hi\n\nB: hi\n\nB: もういいよ！"
        );
    }

    #[test]
    fn test_split_title_bracketed() {
        let (title, body) = split_title_and_body("【満員電車】\nA: 混んでるね\n\nB: ほんまや");
        assert_eq!(title, "満員電車");
        assert_eq!(body, "A: 混んでるね\n\nB: ほんまや");
    }

    #[test]
    fn test_split_title_plain_block() {
        let (title, body) = split_title_and_body("満員電車\n\nA: 混んでるね");
        assert_eq!(title, "満員電車");
        assert_eq!(body, "A: 混んでるね");
    }

    #[test]
    fn test_split_without_title() {
        let raw = "A: 混んでるね\n\nB: ほんまや";
        let (title, body) = split_title_and_body(raw);
        assert!(title.is_empty());
        assert_eq!(body, raw);
    }

    #[test]
    fn test_single_title_removes_duplicate_heading() {
        let body = "## 満員電車\n\nA: 混んでるね";
        assert_eq!(enforce_single_title("満員電車", body), "A: 混んでるね");
        assert_eq!(enforce_single_title("満員電車", "A: 混んでるね"), "A: 混んでるね");
    }

    #[test]
    fn test_finalize_band_keeps_closing_under_max() {
        let turns: Vec<String> = (0..40).map(|i| format!("A: これは{i}番目のボケです。")).collect();
        let body = ensure_closing_line(&turns.join("\n\n"), &closing());
        let band = band(100, 150);
        let out = finalize_band(&body, &band, &closing());
        assert!(char_len(&out) <= 150, "{}", char_len(&out));
        assert!(out.ends_with("\n\nB: もういいよ！"));
        assert_eq!(out.matches("もういいよ").count(), 1);
    }

    #[test]
    fn test_finalize_band_respects_floor_band() {
        let turns: Vec<String> = (0..20)
            .map(|i| {
                let speaker = if i % 2 == 0 { "A" } else { "B" };
                format!("{speaker}: {}。", "ネ".repeat(37))
            })
            .collect();
        let band = band(100, 100);
        let out = finalize_band(&turns.join("\n\n"), &band, &closing());
        assert_eq!(char_len(&out), 100);
        assert!(out.ends_with("\n\nB: もういいよ！"));
    }

    #[test]
    fn test_cut_keeping_rejects_early_soft_cut() {
        let text = "あいうえおかきくけこさし。すせそたちつてと";
        assert_eq!(cut_at_sentence_keeping(text, 15, 0), "あいうえおかきくけこさし。");
        assert_eq!(char_len(&cut_at_sentence_keeping(text, 15, 15)), 15);
    }

    #[test]
    fn test_audit_flags_duplicate_closing() {
        let body = "A: ボケ\n\nB: もういいよ！\n\nB: もういいよ！";
        let findings = audit(body, &band(1, 100), &closing(), &[]);
        assert_eq!(findings, vec![AuditFinding::ClosingDuplicated]);
    }

    #[test]
    fn test_fold_orphan_lines() {
        let text = "（登場）\nA: 今日は\nええ天気やな\n\nB: せやな";
        assert_eq!(fold_orphan_lines(text), "A: 今日はええ天気やな\n\nB: せやな");
    }

    #[test]
    fn test_audit_reports_problems() {
        let body = "A: 比喩で言うと\nB: なんやそれ";
        let findings = audit(body, &band(100, 200), &closing(), &["比喩".to_string()]);
        assert!(findings.contains(&AuditFinding::BannedWord("比喩".to_string())));
        assert!(findings.contains(&AuditFinding::MissingBlankLine));
        assert!(findings.contains(&AuditFinding::ClosingMissing));
        assert!(!findings.contains(&AuditFinding::ClosingDuplicated));
        assert!(
            findings
                .iter()
                .any(|f| matches!(f, AuditFinding::TooShort { .. }))
        );
    }
}
