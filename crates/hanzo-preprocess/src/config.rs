//! Preprocessor configuration

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::decode::{DEFAULT_MAX_LAYERS, DEFAULT_TEXTUAL_THRESHOLD};
use crate::error::Result;

/// Configuration for the preprocessing pipeline
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PreprocessConfig {
    /// Whether to insert spaces at case/digit/punctuation boundaries
    pub recover_spacing: bool,

    /// Maximum base64/hex layers peeled from one payload
    pub max_decode_layers: usize,

    /// Share of control/replacement characters above which lossy text is
    /// treated as binary
    pub textual_threshold: f64,

    /// OCR and page rendering
    pub ocr: OcrConfig,
}

impl Default for PreprocessConfig {
    fn default() -> Self {
        Self {
            recover_spacing: true,
            max_decode_layers: DEFAULT_MAX_LAYERS,
            textual_threshold: DEFAULT_TEXTUAL_THRESHOLD,
            ocr: OcrConfig::default(),
        }
    }
}

/// OCR configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OcrConfig {
    /// Run OCR on images and text-less PDFs
    pub enabled: bool,
    /// Tesseract language code(s), e.g. `eng` or `eng+deu`
    pub language: String,
    /// Tesseract executable
    pub tesseract_bin: String,
    /// pdftoppm executable
    pub pdftoppm_bin: String,
    /// Resolution for rendering PDF pages
    pub render_dpi: u32,
}

impl Default for OcrConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            language: "eng".to_string(),
            tesseract_bin: "tesseract".to_string(),
            pdftoppm_bin: "pdftoppm".to_string(),
            render_dpi: 200,
        }
    }
}

impl PreprocessConfig {
    /// Parse from a TOML document; missing keys keep their defaults
    pub fn from_toml_str(s: &str) -> Result<Self> {
        Ok(toml::from_str(s)?)
    }

    /// Load from a TOML file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// Enable or disable spacing recovery
    pub fn with_recover_spacing(mut self, recover: bool) -> Self {
        self.recover_spacing = recover;
        self
    }

    /// Set the nested decode limit
    pub fn with_max_decode_layers(mut self, layers: usize) -> Self {
        self.max_decode_layers = layers;
        self
    }

    /// Set the binary detection threshold
    pub fn with_textual_threshold(mut self, threshold: f64) -> Self {
        self.textual_threshold = threshold;
        self
    }

    /// Enable or disable OCR
    pub fn with_ocr(mut self, enabled: bool) -> Self {
        self.ocr.enabled = enabled;
        self
    }

    /// Set the OCR language
    pub fn with_ocr_language(mut self, language: impl Into<String>) -> Self {
        self.ocr.language = language.into();
        self
    }

    /// Set the PDF render resolution
    pub fn with_render_dpi(mut self, dpi: u32) -> Self {
        self.ocr.render_dpi = dpi;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = PreprocessConfig::default();
        assert!(config.recover_spacing);
        assert_eq!(config.max_decode_layers, 3);
        assert_eq!(config.ocr.render_dpi, 200);
        assert_eq!(config.ocr.language, "eng");
    }

    #[test]
    fn test_partial_toml() {
        let config = PreprocessConfig::from_toml_str(
            r#"
            recover_spacing = false

            [ocr]
            language = "eng+deu"
            "#,
        )
        .unwrap();
        assert!(!config.recover_spacing);
        assert_eq!(config.ocr.language, "eng+deu");
        assert_eq!(config.ocr.render_dpi, 200);
        assert_eq!(config.max_decode_layers, 3);
    }

    #[test]
    fn test_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "max_decode_layers = 5").unwrap();
        let config = PreprocessConfig::from_file(file.path()).unwrap();
        assert_eq!(config.max_decode_layers, 5);
    }

    #[test]
    fn test_invalid_toml() {
        assert!(PreprocessConfig::from_toml_str("recover_spacing = \"yes\"").is_err());
    }

    #[test]
    fn test_builders() {
        let config = PreprocessConfig::default()
            .with_recover_spacing(false)
            .with_ocr(false)
            .with_render_dpi(300)
            .with_ocr_language("fra")
            .with_max_decode_layers(1)
            .with_textual_threshold(0.25);
        assert!(!config.recover_spacing);
        assert!(!config.ocr.enabled);
        assert_eq!(config.ocr.render_dpi, 300);
        assert_eq!(config.ocr.language, "fra");
        assert_eq!(config.max_decode_layers, 1);
        assert_eq!(config.textual_threshold, 0.25);
    }
}
