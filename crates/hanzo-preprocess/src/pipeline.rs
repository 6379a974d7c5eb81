//! Detection, extraction and canonicalization orchestration
//!
//! ```text
//! raw bytes + filename?
//!        │
//!        ├─ 1. extension hint ──► pdf │ image │ json │ csv/tsv   (content not sniffed)
//!        ├─ 2. decode chain ────► utf8 │ base64 │ hex │ url
//!        ├─ 3. magic bytes ─────► pdf │ image
//!        └─ 4. fallback ────────► lossy text │ binary │ unknown (empty)
//!                 │
//!                 ▼
//!        ExtractionRecord ─► map_invisible ─► canonicalize ─► PreprocessOutput
//! ```
//!
//! The pipeline is total: every input produces a record. Third-party parsers
//! run under a panic guard and their failures become [`Degradation`]s.

use std::panic::{self, AssertUnwindSafe};
#[cfg(feature = "image")]
use std::sync::Arc;

use crate::canonicalize::TextCanonicalizer;
use crate::config::PreprocessConfig;
use crate::decode::{looks_textual, DecodeChain};
use crate::detect::{classify_extension, sniff_magic, ExtensionHint, MagicKind};
use crate::error::{PreprocessError, Result};
use crate::invisible::{count_invisible, map_invisible};
#[cfg(feature = "image")]
use crate::ocr::{DisabledOcr, OcrEngine, PageRenderer, PdftoppmRenderer, TesseractOcr};
use crate::result::{
    DetectedFormat, Degradation, Extraction, ExtractionRecord, NormalizationTrace, PreprocessOutput,
};
use crate::structured::{flatten_csv, flatten_json};

/// Provenance label for permissive UTF-8 reads.
pub const LOSSY_VIA: &str = "utf8-lossy";

/// Untrusted input for a single call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RawInput<'a> {
    pub bytes: &'a [u8],
    pub filename: Option<&'a str>,
}

impl<'a> RawInput<'a> {
    pub fn new(bytes: &'a [u8]) -> Self {
        Self {
            bytes,
            filename: None,
        }
    }

    pub fn with_filename(mut self, filename: &'a str) -> Self {
        self.filename = Some(filename);
        self
    }
}

/// Stateless preprocessing pipeline. Cheap to share across threads.
pub struct Pipeline {
    config: PreprocessConfig,
    decoder: DecodeChain,
    canonicalizer: TextCanonicalizer,
    #[cfg(feature = "image")]
    ocr: Arc<dyn OcrEngine>,
    #[cfg(feature = "image")]
    renderer: Arc<dyn PageRenderer>,
}

impl Default for Pipeline {
    fn default() -> Self {
        Self::new(PreprocessConfig::default())
    }
}

impl std::fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pipeline")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl Pipeline {
    /// Build a pipeline. With OCR enabled the CLI-backed engine and renderer
    /// are used; otherwise OCR requests fail and degrade.
    pub fn new(config: PreprocessConfig) -> Self {
        #[cfg(feature = "image")]
        let (ocr, renderer): (Arc<dyn OcrEngine>, Arc<dyn PageRenderer>) = if config.ocr.enabled {
            (
                Arc::new(TesseractOcr::from_config(&config.ocr)),
                Arc::new(PdftoppmRenderer::from_config(&config.ocr)),
            )
        } else {
            (Arc::new(DisabledOcr), Arc::new(DisabledOcr))
        };

        Self {
            decoder: DecodeChain::new(config.max_decode_layers, config.textual_threshold),
            canonicalizer: TextCanonicalizer::new(config.recover_spacing),
            #[cfg(feature = "image")]
            ocr,
            #[cfg(feature = "image")]
            renderer,
            config,
        }
    }

    /// Replace the OCR engine
    #[cfg(feature = "image")]
    pub fn with_ocr(mut self, ocr: impl OcrEngine + 'static) -> Self {
        self.ocr = Arc::new(ocr);
        self
    }

    /// Replace the PDF page renderer
    #[cfg(feature = "image")]
    pub fn with_renderer(mut self, renderer: impl PageRenderer + 'static) -> Self {
        self.renderer = Arc::new(renderer);
        self
    }

    pub fn config(&self) -> &PreprocessConfig {
        &self.config
    }

    /// Full run: detect, extract, expose invisibles, canonicalize.
    pub fn process(&self, input: &RawInput<'_>) -> PreprocessOutput {
        let record = self.detect_and_extract(input);
        let invisible_mapped = map_invisible(&record.extracted_text);
        let final_normalized = self.canonicalizer.canonicalize(&invisible_mapped);

        tracing::debug!(
            format = %record.detected_format,
            via = record.decoded_via.as_deref().unwrap_or("-"),
            input_bytes = input.bytes.len(),
            invisible = count_invisible(&record.extracted_text),
            output_chars = final_normalized.chars().count(),
            "preprocessed input"
        );

        PreprocessOutput {
            trace: NormalizationTrace {
                raw_extracted_text: record.extracted_text.clone(),
                invisible_mapped,
                final_normalized,
            },
            record,
        }
    }

    /// Choose exactly one format and extract its text. Never fails.
    pub fn detect_and_extract(&self, input: &RawInput<'_>) -> ExtractionRecord {
        let record = self.route(input.bytes, input.filename);
        for degradation in &record.degradations {
            tracing::warn!(
                format = %record.detected_format,
                filename = input.filename.unwrap_or("-"),
                %degradation,
                "preprocessing stage degraded"
            );
        }
        record
    }

    fn route(&self, bytes: &[u8], filename: Option<&str>) -> ExtractionRecord {
        if let Some(hint) = filename.and_then(classify_extension) {
            tracing::debug!(?hint, "routing by filename extension");
            return match hint {
                ExtensionHint::Pdf => ExtractionRecord::new(bytes, DetectedFormat::Pdf)
                    .with_extraction(self.extract_pdf(bytes)),
                ExtensionHint::Image => ExtractionRecord::new(bytes, DetectedFormat::Image)
                    .with_extraction(self.extract_image(bytes)),
                ExtensionHint::Json => structured_record(
                    bytes,
                    DetectedFormat::Json,
                    guarded("JSON parser", || flatten_json(bytes)).and_then(|parsed| parsed),
                    "json",
                ),
                ExtensionHint::Delimited(delimiter) => structured_record(
                    bytes,
                    DetectedFormat::Csv,
                    guarded("CSV reader", || flatten_csv(bytes, delimiter)).and_then(|parsed| parsed),
                    "csv",
                ),
            };
        }

        let decoded = guarded("decode chain", || self.decoder.try_decode(bytes)).unwrap_or_else(|e| {
            tracing::warn!(error = %e, "decode chain aborted");
            None
        });
        if let Some(decoded) = decoded {
            let via = decoded.via();
            return ExtractionRecord::new(bytes, decoded.method.into())
                .with_extraction(Extraction::extracted(decoded.text, via));
        }

        if bytes.is_empty() {
            return ExtractionRecord::new(bytes, DetectedFormat::Unknown);
        }

        match sniff_magic(bytes) {
            Some(MagicKind::Pdf) => ExtractionRecord::new(bytes, DetectedFormat::Pdf)
                .with_degradation(Degradation::DecodeExhausted)
                .with_extraction(self.extract_pdf(bytes)),
            Some(MagicKind::Image) => ExtractionRecord::new(bytes, DetectedFormat::Image)
                .with_degradation(Degradation::DecodeExhausted)
                .with_extraction(self.extract_image(bytes)),
            None => self.fallback(bytes),
        }
    }

    fn fallback(&self, bytes: &[u8]) -> ExtractionRecord {
        let (text, replacements) = lossy_utf8(bytes);
        let unicode = (replacements > 0).then_some(Degradation::UnicodeDegraded { replacements });

        if looks_textual(&text, self.config.textual_threshold) {
            ExtractionRecord::new(bytes, DetectedFormat::PlainText)
                .with_degradation(Degradation::DecodeExhausted)
                .with_extraction(match unicode {
                    Some(reason) => Extraction::Degraded {
                        text,
                        via: Some(LOSSY_VIA.to_string()),
                        reason,
                    },
                    None => Extraction::extracted(text, LOSSY_VIA),
                })
        } else {
            let record = ExtractionRecord::new(bytes, DetectedFormat::BinaryFallback)
                .with_degradation(Degradation::DecodeExhausted);
            match unicode {
                Some(reason) => record.with_degradation(reason),
                None => record,
            }
        }
    }

    #[cfg(feature = "pdf")]
    fn extract_pdf(&self, bytes: &[u8]) -> Extraction {
        let extractor = crate::pdf::PdfExtractor::new(
            self.ocr.as_ref(),
            self.renderer.as_ref(),
            self.config.ocr.render_dpi,
        );
        guarded("PDF extractor", || extractor.extract(bytes)).unwrap_or_else(extraction_panicked)
    }

    #[cfg(not(feature = "pdf"))]
    fn extract_pdf(&self, _bytes: &[u8]) -> Extraction {
        Extraction::failed(Degradation::ExtractionDegraded {
            reason: "PDF support not compiled in".to_string(),
        })
    }

    #[cfg(feature = "image")]
    fn extract_image(&self, bytes: &[u8]) -> Extraction {
        guarded("image decoder", || crate::raster::extract_image(bytes, self.ocr.as_ref()))
            .unwrap_or_else(extraction_panicked)
    }

    #[cfg(not(feature = "image"))]
    fn extract_image(&self, _bytes: &[u8]) -> Extraction {
        Extraction::failed(Degradation::ExtractionDegraded {
            reason: "image support not compiled in".to_string(),
        })
    }
}

/// Run `f`, turning a panic into an error.
fn guarded<T>(stage: &'static str, f: impl FnOnce() -> T) -> Result<T> {
    panic::catch_unwind(AssertUnwindSafe(f)).map_err(|_| PreprocessError::Panicked(stage))
}

fn extraction_panicked(err: PreprocessError) -> Extraction {
    Extraction::failed(Degradation::ExtractionDegraded {
        reason: err.to_string(),
    })
}

fn structured_record(
    bytes: &[u8],
    format: DetectedFormat,
    parsed: Result<String>,
    via: &str,
) -> ExtractionRecord {
    let record = ExtractionRecord::new(bytes, format);
    match parsed {
        Ok(text) => record.with_extraction(Extraction::extracted(text, via)),
        Err(e) => {
            let (text, replacements) = lossy_utf8(bytes);
            let record = record.with_extraction(Extraction::Degraded {
                text,
                via: Some(LOSSY_VIA.to_string()),
                reason: Degradation::ParseDegraded {
                    reason: e.to_string(),
                },
            });
            if replacements > 0 {
                record.with_degradation(Degradation::UnicodeDegraded { replacements })
            } else {
                record
            }
        }
    }
}

/// Permissive UTF-8 read; each invalid sequence becomes one U+FFFD.
pub fn lossy_utf8(bytes: &[u8]) -> (String, usize) {
    let mut text = String::with_capacity(bytes.len());
    let mut replacements = 0;
    for chunk in bytes.utf8_chunks() {
        text.push_str(chunk.valid());
        if !chunk.invalid().is_empty() {
            text.push(char::REPLACEMENT_CHARACTER);
            replacements += 1;
        }
    }
    (text, replacements)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn offline() -> Pipeline {
        Pipeline::new(PreprocessConfig::default().with_ocr(false))
    }

    #[test]
    fn test_lossy_utf8_counts_sequences() {
        assert_eq!(lossy_utf8(b"ok"), ("ok".to_string(), 0));
        let (text, replacements) = lossy_utf8(b"a\xffb\xe2\x82");
        assert_eq!(text, "a\u{fffd}b\u{fffd}");
        assert_eq!(replacements, 2);
        assert_eq!(text, String::from_utf8_lossy(b"a\xffb\xe2\x82"));
    }

    #[test]
    fn test_guarded_catches_panics() {
        let result: Result<()> = guarded("test stage", || panic!("boom"));
        assert!(matches!(result, Err(PreprocessError::Panicked("test stage"))));
        assert_eq!(guarded("fine", || 7).unwrap(), 7);
    }

    #[test]
    fn test_plain_text_route() {
        let record = offline().detect_and_extract(&RawInput::new(b"hello there"));
        assert_eq!(record.detected_format, DetectedFormat::PlainText);
        assert_eq!(record.decoded_via.as_deref(), Some("utf8"));
        assert!(!record.is_degraded());
    }

    #[test]
    fn test_lossy_text_fallback() {
        // invalid UTF-8, no format signature, but mostly text
        let record = offline().detect_and_extract(&RawInput::new(b"caf\xe9 12 34"));
        assert_eq!(record.detected_format, DetectedFormat::PlainText);
        assert_eq!(record.decoded_via.as_deref(), Some(LOSSY_VIA));
        assert_eq!(record.extracted_text, "caf\u{fffd} 12 34");
        assert_eq!(
            record.degradations,
            vec![
                Degradation::DecodeExhausted,
                Degradation::UnicodeDegraded { replacements: 1 }
            ]
        );
    }

    #[test]
    fn test_binary_fallback() {
        let record = offline().detect_and_extract(&RawInput::new(&[0x00, 0x01, 0xff, 0xfe, 0x02]));
        assert_eq!(record.detected_format, DetectedFormat::BinaryFallback);
        assert_eq!(record.extracted_text, "");
        assert_eq!(record.decoded_via, None);
    }

    #[test]
    fn test_empty_is_unknown() {
        let record = offline().detect_and_extract(&RawInput::new(b""));
        assert_eq!(record.detected_format, DetectedFormat::Unknown);
        assert_eq!(record.extracted_text, "");
        assert_eq!(record.original_bytes_base64, "");
    }

    #[test]
    fn test_csv_route_with_bad_utf8_header() {
        let record = offline()
            .detect_and_extract(&RawInput::new(b"n\xffame,v\nx,1\n").with_filename("data.csv"));
        assert_eq!(record.detected_format, DetectedFormat::Csv);
        assert_eq!(record.decoded_via.as_deref(), Some("csv"));
        assert_eq!(record.extracted_text, "n\u{fffd}ame=x | v=1");
    }

    #[test]
    fn test_process_trace() {
        let output = offline().process(&RawInput::new("a\u{200b}b".as_bytes()));
        assert_eq!(output.trace.raw_extracted_text, "a\u{200b}b");
        assert_eq!(output.trace.invisible_mapped, "a[ZWSP]b");
        assert_eq!(output.text(), "a[ZWSP]b");
    }

    #[test]
    fn test_pipeline_is_shareable() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<Pipeline>();
    }
}
