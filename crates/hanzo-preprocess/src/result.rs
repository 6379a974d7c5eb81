//! Preprocessing result types

use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::decode::DecodeMethod;

/// The format an input was recognized as. Exactly one per invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DetectedFormat {
    Pdf,
    Image,
    Json,
    Csv,
    Base64,
    Hex,
    Url,
    #[serde(rename = "text")]
    PlainText,
    #[serde(rename = "binary")]
    BinaryFallback,
    Unknown,
}

impl DetectedFormat {
    /// Wire tag, as used in reports
    pub fn as_str(&self) -> &'static str {
        match self {
            DetectedFormat::Pdf => "pdf",
            DetectedFormat::Image => "image",
            DetectedFormat::Json => "json",
            DetectedFormat::Csv => "csv",
            DetectedFormat::Base64 => "base64",
            DetectedFormat::Hex => "hex",
            DetectedFormat::Url => "url",
            DetectedFormat::PlainText => "text",
            DetectedFormat::BinaryFallback => "binary",
            DetectedFormat::Unknown => "unknown",
        }
    }
}

impl fmt::Display for DetectedFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<DecodeMethod> for DetectedFormat {
    fn from(method: DecodeMethod) -> Self {
        match method {
            DecodeMethod::Utf8 => DetectedFormat::PlainText,
            DecodeMethod::Base64 => DetectedFormat::Base64,
            DecodeMethod::Hex => DetectedFormat::Hex,
            DecodeMethod::Url => DetectedFormat::Url,
        }
    }
}

/// A stage that did not complete cleanly.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Degradation {
    /// No decode strategy applied
    DecodeExhausted,
    /// A document or image extractor failed or found no text
    ExtractionDegraded { reason: String },
    /// A structured parser rejected the input
    ParseDegraded { reason: String },
    /// Undecodable byte sequences were replaced with U+FFFD
    UnicodeDegraded { replacements: usize },
}

impl fmt::Display for Degradation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Degradation::DecodeExhausted => write!(f, "decode chain exhausted"),
            Degradation::ExtractionDegraded { reason } => write!(f, "extraction degraded: {}", reason),
            Degradation::ParseDegraded { reason } => write!(f, "parse degraded: {}", reason),
            Degradation::UnicodeDegraded { replacements } => {
                write!(f, "{} invalid byte sequence(s) replaced", replacements)
            }
        }
    }
}

/// Outcome of a single extraction stage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Extraction {
    /// Text recovered cleanly
    Extracted { text: String, via: String },
    /// Best-effort text, possibly empty
    Degraded {
        text: String,
        via: Option<String>,
        reason: Degradation,
    },
}

impl Extraction {
    pub fn extracted(text: impl Into<String>, via: impl Into<String>) -> Self {
        Extraction::Extracted {
            text: text.into(),
            via: via.into(),
        }
    }

    /// Degraded with no text recovered
    pub fn failed(reason: Degradation) -> Self {
        Extraction::Degraded {
            text: String::new(),
            via: None,
            reason,
        }
    }

    pub fn text(&self) -> &str {
        match self {
            Extraction::Extracted { text, .. } | Extraction::Degraded { text, .. } => text,
        }
    }

    pub fn is_degraded(&self) -> bool {
        matches!(self, Extraction::Degraded { .. })
    }
}

/// What the detector/extractor found, with lossless provenance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractionRecord {
    /// Chosen format
    pub detected_format: DetectedFormat,

    /// Method that produced the text, e.g. `base64->hex` or `pdf-ocr`
    pub decoded_via: Option<String>,

    /// Standard base64 of the exact input bytes
    pub original_bytes_base64: String,

    /// Text before any mapping or canonicalization
    pub extracted_text: String,

    /// Stages that degraded, in order
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub degradations: Vec<Degradation>,
}

impl ExtractionRecord {
    /// Create an empty record for `bytes`
    pub fn new(bytes: &[u8], detected_format: DetectedFormat) -> Self {
        Self {
            detected_format,
            decoded_via: None,
            original_bytes_base64: STANDARD.encode(bytes),
            extracted_text: String::new(),
            degradations: Vec::new(),
        }
    }

    /// Fold a stage outcome into the record
    pub fn with_extraction(mut self, extraction: Extraction) -> Self {
        match extraction {
            Extraction::Extracted { text, via } => {
                self.extracted_text = text;
                self.decoded_via = Some(via);
            }
            Extraction::Degraded { text, via, reason } => {
                self.extracted_text = text;
                self.decoded_via = via;
                self.degradations.push(reason);
            }
        }
        self
    }

    pub fn with_degradation(mut self, degradation: Degradation) -> Self {
        self.degradations.push(degradation);
        self
    }

    pub fn is_degraded(&self) -> bool {
        !self.degradations.is_empty()
    }

    /// Decode the provenance field back to the input bytes
    pub fn original_bytes(&self) -> Vec<u8> {
        // Always produced by `new` from real bytes
        STANDARD
            .decode(&self.original_bytes_base64)
            .unwrap_or_default()
    }
}

/// The text as it moved through mapping and canonicalization.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NormalizationTrace {
    pub raw_extracted_text: String,
    pub invisible_mapped: String,
    pub final_normalized: String,
}

/// Condensed output: format tag plus canonical text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CanonicalOutput {
    #[serde(rename = "type")]
    pub kind: DetectedFormat,
    pub text: String,
}

/// Full report with provenance and every intermediate form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PreprocessReport {
    pub original_bytes_base64: String,
    pub detected_type: DetectedFormat,
    pub decoded_via: Option<String>,
    pub extracted_text: String,
    pub invisible_mapped: String,
    pub final_normalized: String,
}

/// Everything one pipeline run produced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PreprocessOutput {
    pub record: ExtractionRecord,
    pub trace: NormalizationTrace,
}

impl PreprocessOutput {
    /// Canonical text, ready for the classifier
    pub fn text(&self) -> &str {
        &self.trace.final_normalized
    }

    pub fn detected_format(&self) -> DetectedFormat {
        self.record.detected_format
    }

    /// Full report form
    pub fn report(&self) -> PreprocessReport {
        PreprocessReport {
            original_bytes_base64: self.record.original_bytes_base64.clone(),
            detected_type: self.record.detected_format,
            decoded_via: self.record.decoded_via.clone(),
            extracted_text: self.record.extracted_text.clone(),
            invisible_mapped: self.trace.invisible_mapped.clone(),
            final_normalized: self.trace.final_normalized.clone(),
        }
    }

    /// Condensed `{type, text}` form
    pub fn condensed(&self) -> CanonicalOutput {
        CanonicalOutput {
            kind: self.record.detected_format,
            text: self.trace.final_normalized.clone(),
        }
    }

    /// Canonical text cut to `max_chars` characters, for logs
    pub fn preview(&self, max_chars: usize) -> String {
        let text = self.text();
        if text.chars().count() <= max_chars {
            text.to_string()
        } else {
            let mut result = text.chars().take(max_chars).collect::<String>();
            result.push_str("...");
            result
        }
    }
}
