//! Text canonicalization
//!
//! Brings extracted text to one deterministic form before it reaches the
//! classifier:
//!
//! ```text
//! text ─► NFKC ─► controls → [CTRL] ─► whitespace repair ─► spacing recovery ─► canonical
//! ```
//!
//! Each stage is exposed on its own so callers (and tests) can reason about
//! them individually. Apart from collapsing whitespace runs and trimming the
//! ends, no stage deletes characters: control characters are replaced by a
//! visible token and spacing recovery only inserts.

use regex::Regex;
use std::sync::LazyLock;
use unicode_normalization::UnicodeNormalization;

use crate::invisible::CONTROL_TOKEN;

static LINE_ENDINGS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\r\n?").expect("valid line ending regex"));

static SPACE_RUNS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r" {2,}").expect("valid space run regex"));

static BLANK_LINE_RUNS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\n{3,}").expect("valid blank line regex"));

static CASE_BOUNDARY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"([a-z])([A-Z])").expect("valid case boundary regex"));

static LETTER_DIGIT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"([A-Za-z])([0-9])").expect("valid letter digit regex"));

static DIGIT_LETTER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"([0-9])([A-Za-z])").expect("valid digit letter regex"));

static PUNCTUATION_LETTER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"([.,;:!?])([A-Za-z])").expect("valid punctuation regex"));

/// Canonicalizes text according to a fixed stage order.
#[derive(Debug, Clone)]
pub struct TextCanonicalizer {
    recover_spacing: bool,
}

impl Default for TextCanonicalizer {
    fn default() -> Self {
        Self {
            recover_spacing: true,
        }
    }
}

impl TextCanonicalizer {
    /// Create a canonicalizer, optionally running spacing recovery.
    pub fn new(recover_spacing: bool) -> Self {
        Self { recover_spacing }
    }

    /// Whether the spacing recovery stage runs.
    pub fn recovers_spacing(&self) -> bool {
        self.recover_spacing
    }

    /// Run every stage in order.
    pub fn canonicalize(&self, text: &str) -> String {
        let text = normalize_unicode(text);
        let text = replace_controls(&text);
        let text = normalize_whitespace(&text);
        if self.recover_spacing {
            recover_spacing(&text)
        } else {
            text
        }
    }
}

/// Canonicalize with default settings (spacing recovery on).
pub fn canonicalize(text: &str) -> String {
    TextCanonicalizer::default().canonicalize(text)
}

/// Stage 1: Unicode compatibility normalization (NFKC).
///
/// Composition can merge a base character and its combining marks, so the
/// output may hold fewer characters than the input.
pub fn normalize_unicode(text: &str) -> String {
    text.nfkc().collect()
}

/// Stage 2: replace control characters other than `\n`, `\t` and `\r` with
/// the `[CTRL]` token.
pub fn replace_controls(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        if c.is_control() && !matches!(c, '\n' | '\t' | '\r') {
            out.push_str(CONTROL_TOKEN);
        } else {
            out.push(c);
        }
    }
    out
}

/// Stage 3: unify line endings, turn tabs into spaces, collapse space runs
/// and runs of three or more newlines, then trim.
pub fn normalize_whitespace(text: &str) -> String {
    let text = LINE_ENDINGS.replace_all(text, "\n");
    let text = text.replace('\t', " ");
    let text = SPACE_RUNS.replace_all(&text, " ");
    let text = BLANK_LINE_RUNS.replace_all(&text, "\n\n");
    text.trim().to_string()
}

/// Stage 4: insert spaces at boundaries that usually mark words glued
/// together by OCR or deliberate obfuscation.
///
/// Rules run in order: case boundaries, letter/digit boundaries, then
/// punctuation followed by a letter. CamelCase identifiers get split too.
pub fn recover_spacing(text: &str) -> String {
    let text = split_case_boundaries(text);
    let text = split_digit_boundaries(&text);
    split_punctuation_boundaries(&text)
}

/// `helloWorld` → `hello World`
pub fn split_case_boundaries(text: &str) -> String {
    CASE_BOUNDARY.replace_all(text, "$1 $2").into_owned()
}

/// `abc123def` → `abc 123 def`
pub fn split_digit_boundaries(text: &str) -> String {
    let text = LETTER_DIGIT.replace_all(text, "$1 $2");
    DIGIT_LETTER.replace_all(&text, "$1 $2").into_owned()
}

/// `end.Next` → `end. Next`
pub fn split_punctuation_boundaries(text: &str) -> String {
    PUNCTUATION_LETTER.replace_all(text, "$1 $2").into_owned()
}
