//! Raster image text extraction via OCR

use image::DynamicImage;

use crate::error::{PreprocessError, Result};
use crate::ocr::OcrEngine;
use crate::result::{Degradation, Extraction};

/// Decode an image, convert it to RGB and run OCR over it.
///
/// Never fails: undecodable images, OCR errors and blank recognitions all
/// come back as a degraded extraction with empty text.
pub fn extract_image(bytes: &[u8], ocr: &dyn OcrEngine) -> Extraction {
    match recognize_image(bytes, ocr) {
        Ok(text) => Extraction::extracted(text, "ocr"),
        Err(e) => Extraction::failed(Degradation::ExtractionDegraded {
            reason: e.to_string(),
        }),
    }
}

fn recognize_image(bytes: &[u8], ocr: &dyn OcrEngine) -> Result<String> {
    let decoded = image::load_from_memory(bytes)?;
    let rgb = DynamicImage::ImageRgb8(decoded.to_rgb8());
    tracing::debug!(width = rgb.width(), height = rgb.height(), engine = ocr.name(), "running image OCR");

    let text = ocr.recognize(&rgb)?;
    if text.trim().is_empty() {
        return Err(PreprocessError::Empty("image OCR"));
    }
    Ok(text)
}
