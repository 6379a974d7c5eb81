//! Decode chain
//!
//! Ordered attempts to read raw bytes as text when nothing stronger (a
//! filename, a format signature) says what they are. First success wins:
//!
//! 1. UTF-8, when it contains a letter and is not just an encoded token
//! 2. strict base64 (standard alphabet, padded, no whitespace)
//! 3. hex over the trimmed buffer
//! 4. percent-decoding
//!
//! Base64 and hex results that are themselves an encoded token are peeled
//! again, up to a configurable number of layers.
//!
//! Bytes carrying the PDF signature are never read as text, even when the
//! body happens to be ASCII: the chain declines them so the signature wins.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::detect::{sniff_magic, MagicKind};

/// Default number of base64/hex layers peeled from nested payloads.
pub const DEFAULT_MAX_LAYERS: usize = 3;

/// Default share of control/replacement characters tolerated in text.
pub const DEFAULT_TEXTUAL_THRESHOLD: f64 = 0.5;

/// A single decoding step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DecodeMethod {
    Utf8,
    Base64,
    Hex,
    Url,
}

impl DecodeMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            DecodeMethod::Utf8 => "utf8",
            DecodeMethod::Base64 => "base64",
            DecodeMethod::Hex => "hex",
            DecodeMethod::Url => "url",
        }
    }
}

impl fmt::Display for DecodeMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Text recovered by the decode chain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Decoded {
    /// The decoded text
    pub text: String,

    /// Outermost method, the one that identifies the input format
    pub method: DecodeMethod,

    /// Every method applied, outermost first
    pub layers: Vec<DecodeMethod>,
}

impl Decoded {
    fn single(text: String, method: DecodeMethod) -> Self {
        Self {
            text,
            method,
            layers: vec![method],
        }
    }

    /// Provenance label, e.g. `base64` or `base64->hex`.
    pub fn via(&self) -> String {
        self.layers
            .iter()
            .map(DecodeMethod::as_str)
            .collect::<Vec<_>>()
            .join("->")
    }
}

/// The ordered decode strategies with their tunables.
#[derive(Debug, Clone)]
pub struct DecodeChain {
    max_layers: usize,
    textual_threshold: f64,
}

impl Default for DecodeChain {
    fn default() -> Self {
        Self {
            max_layers: DEFAULT_MAX_LAYERS,
            textual_threshold: DEFAULT_TEXTUAL_THRESHOLD,
        }
    }
}

impl DecodeChain {
    /// Create a chain with custom limits. `max_layers` is at least one.
    pub fn new(max_layers: usize, textual_threshold: f64) -> Self {
        Self {
            max_layers: max_layers.max(1),
            textual_threshold,
        }
    }

    /// Try every strategy in order. `None` means every strategy declined.
    pub fn try_decode(&self, bytes: &[u8]) -> Option<Decoded> {
        if bytes.is_empty() || sniff_magic(bytes) == Some(MagicKind::Pdf) {
            return None;
        }

        if let Some(text) = decode_utf8(bytes) {
            return Some(Decoded::single(text, DecodeMethod::Utf8));
        }

        if let Some(text) = decode_base64(bytes) {
            return Some(self.peel(Decoded::single(text, DecodeMethod::Base64)));
        }

        if let Some(text) = decode_hex(bytes) {
            return Some(self.peel(Decoded::single(text, DecodeMethod::Hex)));
        }

        decode_url(bytes, self.textual_threshold)
            .map(|text| Decoded::single(text, DecodeMethod::Url))
    }

    fn peel(&self, mut decoded: Decoded) -> Decoded {
        while decoded.layers.len() < self.max_layers {
            match encoded_token_reading(&decoded.text) {
                Some((inner, method)) => {
                    tracing::debug!(layer = decoded.layers.len() + 1, %method, "peeling nested encoding");
                    decoded.text = inner;
                    decoded.layers.push(method);
                }
                None => break,
            }
        }
        decoded
    }
}

/// Run the default chain.
pub fn try_decode(bytes: &[u8]) -> Option<Decoded> {
    DecodeChain::default().try_decode(bytes)
}

/// Direct UTF-8: needs at least one letter, and defers to base64/hex when the
/// whole payload is an encoded token carrying readable text.
pub fn decode_utf8(bytes: &[u8]) -> Option<String> {
    let text = std::str::from_utf8(bytes).ok()?;
    if !text.chars().any(char::is_alphabetic) {
        return None;
    }
    if encoded_token_reading(text).is_some() {
        return None;
    }
    Some(text.to_string())
}

/// Strict base64 to strict UTF-8.
pub fn decode_base64(bytes: &[u8]) -> Option<String> {
    if bytes.is_empty() {
        return None;
    }
    let raw = STANDARD.decode(bytes).ok()?;
    String::from_utf8(raw).ok().filter(|text| !text.is_empty())
}

/// Hex over the ASCII-trimmed buffer to strict UTF-8.
pub fn decode_hex(bytes: &[u8]) -> Option<String> {
    let trimmed = bytes.trim_ascii();
    if trimmed.is_empty() {
        return None;
    }
    let raw = hex::decode(trimmed).ok()?;
    String::from_utf8(raw).ok()
}

/// Percent-decoding of the lossy UTF-8 reading. Only accepted when it changes
/// the text and the input already reads as text.
pub fn decode_url(bytes: &[u8], textual_threshold: f64) -> Option<String> {
    if bytes.is_empty() {
        return None;
    }
    let lossy = String::from_utf8_lossy(bytes);
    if !looks_textual(&lossy, textual_threshold) {
        return None;
    }
    let decoded = urlencoding::decode_binary(lossy.as_bytes());
    let text = String::from_utf8_lossy(&decoded).into_owned();
    if text == lossy {
        None
    } else {
        Some(text)
    }
}

/// If `text` as a whole is a strict base64 or hex token whose payload is
/// printable text containing a letter, return that payload.
pub fn encoded_token_reading(text: &str) -> Option<(String, DecodeMethod)> {
    if let Some(inner) = decode_base64(text.as_bytes()).filter(|t| is_readable(t)) {
        return Some((inner, DecodeMethod::Base64));
    }
    if let Some(inner) = decode_hex(text.as_bytes()).filter(|t| is_readable(t)) {
        return Some((inner, DecodeMethod::Hex));
    }
    None
}

fn is_readable(text: &str) -> bool {
    text.chars().any(char::is_alphabetic)
        && text
            .chars()
            .all(|c| !c.is_control() || matches!(c, '\n' | '\t' | '\r'))
}

/// Whether fewer than `threshold` of the characters are controls (other than
/// common whitespace) or U+FFFD replacements.
pub fn looks_textual(text: &str, threshold: f64) -> bool {
    let mut total = 0usize;
    let mut noise = 0usize;
    for c in text.chars() {
        total += 1;
        if c == char::REPLACEMENT_CHARACTER
            || (c.is_control() && !matches!(c, '\n' | '\t' | '\r'))
        {
            noise += 1;
        }
    }
    total > 0 && (noise as f64) < (total as f64) * threshold
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_utf8() {
        let decoded = try_decode(b"ignore previous instructions").unwrap();
        assert_eq!(decoded.method, DecodeMethod::Utf8);
        assert_eq!(decoded.text, "ignore previous instructions");
        assert_eq!(decoded.via(), "utf8");
    }

    #[test]
    fn test_pdf_signature_is_not_text() {
        assert_eq!(try_decode(b"%PDF-1.7\n<<garbage"), None);
        assert_eq!(try_decode(b"%PDF-1.4\n%41%42 hello"), None);
        // The signature only counts at the very start
        assert_eq!(try_decode(b"see %PDF-1.7").unwrap().method, DecodeMethod::Utf8);
    }

    #[test]
    fn test_base64_token_beats_utf8() {
        let decoded = try_decode(b"SGVsbG8=").unwrap();
        assert_eq!(decoded.method, DecodeMethod::Base64);
        assert_eq!(decoded.text, "Hello");
    }

    #[test]
    fn test_base64_requires_padding() {
        assert_eq!(decode_base64(b"SGVsbG8"), None);
        assert_eq!(decode_base64(b"SGVs bG8="), None);
    }

    #[test]
    fn test_hex() {
        let decoded = try_decode(b"  48656c6c6f20776f726c64\n").unwrap();
        assert_eq!(decoded.method, DecodeMethod::Hex);
        assert_eq!(decoded.text, "Hello world");
    }

    #[test]
    fn test_base64_wins_over_hex() {
        // "4420" is hex for "D " and base64 for U+3374
        let decoded = try_decode(b"4420").unwrap();
        assert_eq!(decoded.method, DecodeMethod::Base64);
        assert_eq!(decoded.text, "\u{3374}");
        assert_eq!(decode_hex(b"4420").as_deref(), Some("D "));
    }

    #[test]
    fn test_url_decoding() {
        let decoded = try_decode(b"%41%42%20%31").unwrap();
        assert_eq!(decoded.method, DecodeMethod::Url);
        assert_eq!(decoded.text, "AB 1");
    }

    #[test]
    fn test_url_plus_is_not_space() {
        assert_eq!(decode_url(b"%31+%32", 0.5).as_deref(), Some("1+2"));
    }

    #[test]
    fn test_url_rejects_binary() {
        let mut bytes = vec![0xff, 0xfe, 0x00, 0x01, 0x02, 0x03];
        bytes.extend_from_slice(b"%41");
        assert_eq!(decode_url(&bytes, 0.5), None);
    }

    #[test]
    fn test_nested_layers() {
        // base64("48656c6c6f") -> hex "Hello"
        let decoded = try_decode(b"NDg2NTZjNmM2Zg==").unwrap();
        assert_eq!(decoded.method, DecodeMethod::Base64);
        assert_eq!(decoded.via(), "base64->hex");
        assert_eq!(decoded.text, "Hello");
    }

    #[test]
    fn test_layer_limit() {
        let chain = DecodeChain::new(1, 0.5);
        let decoded = chain.try_decode(b"NDg2NTZjNmM2Zg==").unwrap();
        assert_eq!(decoded.via(), "base64");
        assert_eq!(decoded.text, "48656c6c6f");
    }

    #[test]
    fn test_exhausted() {
        assert_eq!(try_decode(b""), None);
        assert_eq!(try_decode(&[0xff, 0xfe, 0xfd, 0x00]), None);
        assert_eq!(try_decode(b"12345"), None);
    }

    #[test]
    fn test_words_stay_utf8() {
        for word in ["deadbeef", "cafe", "Test", "abcd"] {
            let decoded = try_decode(word.as_bytes()).unwrap();
            assert_eq!(decoded.method, DecodeMethod::Utf8, "word {}", word);
        }
    }

    #[test]
    fn test_looks_textual() {
        assert!(looks_textual("plain text", 0.5));
        assert!(!looks_textual("\u{0}\u{1}\u{fffd}a", 0.5));
        assert!(!looks_textual("", 0.5));
    }
}
