//! # Hanzo Preprocess
//!
//! Turns arbitrary untrusted bytes into one canonical text form for a
//! downstream prompt-injection classifier.
//!
//! Attackers hide instructions inside encodings, documents, images, structured
//! data and invisible Unicode. This crate detects the format, recovers the
//! text, exposes hidden characters as visible tokens and canonicalizes the
//! result. It never removes content and never decides what is safe.
//!
//! ## Features
//!
//! - **Decode chain**: UTF-8, base64 (nested), hex, percent-encoding
//! - **Documents**: PDF text layer with OCR fallback, image OCR (`pdf`, `image`)
//! - **Structured data**: JSON and CSV/TSV flattened to annotated text
//! - **Invisible characters**: zero-width and bidi code points become `[ZWSP]`, `[RLO]`, ...
//! - **Canonicalization**: NFKC, control tokens, whitespace repair, spacing recovery
//!
//! ## Example
//!
//! ```rust
//! use hanzo_preprocess::{Pipeline, PreprocessConfig, RawInput};
//!
//! let pipeline = Pipeline::new(PreprocessConfig::default().with_ocr(false));
//! let output = pipeline.process(&RawInput::new(b"SGVsbG8="));
//!
//! assert_eq!(output.report().detected_type.as_str(), "base64");
//! assert_eq!(output.text(), "Hello");
//! ```
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────┐     ┌──────────────┐     ┌──────────────────────┐
//! │  Raw bytes  │ ──► │   Detector   │ ──► │ Decode │ Doc │ Struct │
//! │ + filename  │     │ (ext/magic)  │     │ (text extraction)    │
//! └─────────────┘     └──────────────┘     └──────────────────────┘
//!                                                    │
//!                                                    ▼
//!                     ┌──────────────┐     ┌──────────────────────┐
//!                     │ Canonicalize │ ◄── │  Invisible mapping   │
//!                     └──────────────┘     └──────────────────────┘
//!                            │
//!                            ▼
//!                   ┌─────────────────┐
//!                   │ Canonical text  │
//!                   │ + provenance    │
//!                   └─────────────────┘
//! ```

pub mod canonicalize;
pub mod config;
pub mod decode;
pub mod detect;
pub mod error;
pub mod invisible;
pub mod pipeline;
pub mod result;
pub mod structured;

#[cfg(feature = "image")]
pub mod ocr;

#[cfg(feature = "image")]
pub mod raster;

#[cfg(feature = "pdf")]
pub mod pdf;

pub use canonicalize::{canonicalize, TextCanonicalizer};
pub use config::{OcrConfig, PreprocessConfig};
pub use decode::{try_decode, DecodeChain, DecodeMethod, Decoded};
pub use error::{PreprocessError, Result};
pub use invisible::map_invisible;
pub use pipeline::{Pipeline, RawInput};
pub use result::{
    CanonicalOutput, Degradation, DetectedFormat, Extraction, ExtractionRecord, NormalizationTrace,
    PreprocessOutput, PreprocessReport,
};

#[cfg(feature = "image")]
pub use ocr::{DisabledOcr, OcrEngine, OcrError, PageRenderer, PdftoppmRenderer, TesseractOcr};

#[cfg(feature = "pdf")]
pub use pdf::PdfExtractor;

/// Preprocess one input with the default configuration.
pub fn preprocess(bytes: &[u8], filename: Option<&str>) -> PreprocessOutput {
    let input = RawInput { bytes, filename };
    Pipeline::default().process(&input)
}
