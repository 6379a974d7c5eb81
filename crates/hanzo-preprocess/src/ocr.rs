//! External OCR and page rendering capabilities
//!
//! Both are treated as fallible collaborators behind traits so the pipeline
//! stays testable and deterministic given the same collaborators:
//!
//! ```text
//! ┌──────────────┐  render_page   ┌─────────────┐  recognize  ┌────────┐
//! │  PDF bytes   │ ─────────────► │ DynamicImage│ ──────────► │  text  │
//! └──────────────┘  (pdftoppm)    └─────────────┘ (tesseract) └────────┘
//! ```
//!
//! The default implementations shell out to `tesseract` and `pdftoppm`
//! (poppler-utils). Scratch files live in [`tempfile`] handles and are
//! removed on every path, including errors.

use image::{DynamicImage, ImageFormat};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::Command;
use tempfile::TempDir;
use thiserror::Error;

use crate::config::OcrConfig;

/// Errors raised by OCR engines and page renderers
#[derive(Debug, Error)]
pub enum OcrError {
    #[error("OCR backend not available: {0}")]
    BackendNotAvailable(String),

    #[error("OCR failed: {0}")]
    OcrFailed(String),

    #[error("page render failed: {0}")]
    RenderFailed(String),

    #[error("OCR disabled")]
    Disabled,

    #[error("image error: {0}")]
    Image(#[from] image::ImageError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Recognizes text in a raster image.
pub trait OcrEngine: Send + Sync {
    fn recognize(&self, image: &DynamicImage) -> Result<String, OcrError>;

    /// Short name for logs
    fn name(&self) -> &str;
}

/// Renders a single PDF page (1-based) to a raster image.
pub trait PageRenderer: Send + Sync {
    fn render_page(&self, pdf: &[u8], page: u32, dpi: u32) -> Result<DynamicImage, OcrError>;
}

/// Tesseract CLI engine.
#[derive(Debug, Clone)]
pub struct TesseractOcr {
    binary: String,
    language: String,
}

impl TesseractOcr {
    pub fn new(language: impl Into<String>) -> Self {
        Self {
            binary: "tesseract".to_string(),
            language: language.into(),
        }
    }

    pub fn from_config(config: &OcrConfig) -> Self {
        Self {
            binary: config.tesseract_bin.clone(),
            language: config.language.clone(),
        }
    }

    fn run(&self, image_path: &Path) -> Result<String, OcrError> {
        let output = Command::new(&self.binary)
            .arg(image_path)
            .arg("stdout")
            .args(["-l", &self.language])
            .output();

        match output {
            Ok(output) if output.status.success() => {
                Ok(String::from_utf8_lossy(&output.stdout).into_owned())
            }
            Ok(output) => Err(OcrError::OcrFailed(format!(
                "tesseract failed: {}",
                String::from_utf8_lossy(&output.stderr).trim()
            ))),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Err(
                OcrError::BackendNotAvailable(format!("{} not found (install tesseract-ocr)", self.binary)),
            ),
            Err(e) => Err(OcrError::Io(e)),
        }
    }
}

impl Default for TesseractOcr {
    fn default() -> Self {
        Self::new("eng")
    }
}

impl OcrEngine for TesseractOcr {
    fn recognize(&self, image: &DynamicImage) -> Result<String, OcrError> {
        let mut file = tempfile::Builder::new()
            .prefix("hanzo-ocr-")
            .suffix(".png")
            .tempfile()?;
        image.write_to(&mut file, ImageFormat::Png)?;
        file.flush()?;
        self.run(file.path())
    }

    fn name(&self) -> &str {
        "tesseract"
    }
}

/// Poppler `pdftoppm` page renderer.
#[derive(Debug, Clone)]
pub struct PdftoppmRenderer {
    binary: String,
}

impl PdftoppmRenderer {
    pub fn new() -> Self {
        Self {
            binary: "pdftoppm".to_string(),
        }
    }

    pub fn from_config(config: &OcrConfig) -> Self {
        Self {
            binary: config.pdftoppm_bin.clone(),
        }
    }
}

impl Default for PdftoppmRenderer {
    fn default() -> Self {
        Self::new()
    }
}

impl PageRenderer for PdftoppmRenderer {
    fn render_page(&self, pdf: &[u8], page: u32, dpi: u32) -> Result<DynamicImage, OcrError> {
        let dir = TempDir::new()?;
        let pdf_path = dir.path().join("input.pdf");
        std::fs::write(&pdf_path, pdf)?;

        let page_str = page.to_string();
        let dpi_str = dpi.to_string();
        let status = Command::new(&self.binary)
            .args(["-png", "-r", &dpi_str, "-f", &page_str, "-l", &page_str])
            .arg(&pdf_path)
            .arg(dir.path().join("page"))
            .status();

        match status {
            Ok(s) if s.success() => {
                let image_path = find_page_image(dir.path(), page).ok_or_else(|| {
                    OcrError::RenderFailed(format!("no image generated for page {}", page))
                })?;
                Ok(image::open(image_path)?)
            }
            Ok(s) => Err(OcrError::RenderFailed(format!("pdftoppm exited with {}", s))),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Err(
                OcrError::BackendNotAvailable(format!("{} not found (install poppler-utils)", self.binary)),
            ),
            Err(e) => Err(OcrError::Io(e)),
        }
    }
}

/// Locate the image `pdftoppm` wrote for `page`. The page number is
/// zero-padded to a width that depends on the document's page count.
pub fn find_page_image(dir: &Path, page: u32) -> Option<PathBuf> {
    [1usize, 2, 3, 4, 5, 6]
        .iter()
        .map(|width| dir.join(format!("page-{:0width$}.png", page, width = *width)))
        .find(|path| path.exists())
}

/// Stand-in used when OCR is switched off. Fails every request.
#[derive(Debug, Clone, Copy, Default)]
pub struct DisabledOcr;

impl OcrEngine for DisabledOcr {
    fn recognize(&self, _image: &DynamicImage) -> Result<String, OcrError> {
        Err(OcrError::Disabled)
    }

    fn name(&self) -> &str {
        "disabled"
    }
}

impl PageRenderer for DisabledOcr {
    fn render_page(&self, _pdf: &[u8], _page: u32, _dpi: u32) -> Result<DynamicImage, OcrError> {
        Err(OcrError::Disabled)
    }
}
