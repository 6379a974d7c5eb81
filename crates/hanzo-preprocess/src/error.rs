//! Error types for preprocessing stages
//!
//! These never cross the public pipeline boundary: each stage converts its
//! error into a [`Degradation`](crate::result::Degradation) and moves on.

use thiserror::Error;

/// Result type for individual preprocessing stages
pub type Result<T> = std::result::Result<T, PreprocessError>;

/// Errors that can occur inside a preprocessing stage
#[derive(Error, Debug)]
pub enum PreprocessError {
    /// PDF could not be loaded or read
    #[error("PDF error: {0}")]
    Pdf(String),

    /// Image could not be decoded or encoded
    #[error("Image error: {0}")]
    Image(String),

    /// OCR or page rendering failed
    #[cfg(feature = "image")]
    #[error("OCR error: {0}")]
    Ocr(#[from] crate::ocr::OcrError),

    /// JSON parse error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// CSV parse error
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// Configuration could not be parsed
    #[error("Config error: {0}")]
    Config(#[from] toml::de::Error),

    /// A third-party parser panicked
    #[error("{0} panicked")]
    Panicked(&'static str),

    /// Stage produced no text at all
    #[error("no text recovered from {0}")]
    Empty(&'static str),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

#[cfg(feature = "pdf")]
impl From<lopdf::Error> for PreprocessError {
    fn from(err: lopdf::Error) -> Self {
        PreprocessError::Pdf(err.to_string())
    }
}

#[cfg(feature = "image")]
impl From<image::ImageError> for PreprocessError {
    fn from(err: image::ImageError) -> Self {
        PreprocessError::Image(err.to_string())
    }
}
