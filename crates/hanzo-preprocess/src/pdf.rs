//! PDF document text extraction
//!
//! Reads the embedded text layer page by page. When a document carries no
//! text at all (scans, flattened exports), every page is rendered and run
//! through OCR instead.

use lopdf::{Document, ObjectId};
use std::collections::BTreeMap;

use crate::error::{PreprocessError, Result};
use crate::ocr::{OcrEngine, PageRenderer};
use crate::result::{Degradation, Extraction};

const PAGE_SEPARATOR: &str = "\n\n";

/// Deepest array/dictionary nesting handed to the parser. The parser
/// recurses per level, and running out of stack aborts the process.
pub const MAX_NESTING: usize = 64;

/// PDF text extractor with an OCR fallback
pub struct PdfExtractor<'a> {
    ocr: &'a dyn OcrEngine,
    renderer: &'a dyn PageRenderer,
    render_dpi: u32,
}

impl<'a> PdfExtractor<'a> {
    /// Create an extractor over the given OCR collaborators
    pub fn new(ocr: &'a dyn OcrEngine, renderer: &'a dyn PageRenderer, render_dpi: u32) -> Self {
        Self {
            ocr,
            renderer,
            render_dpi,
        }
    }

    /// Extract text from PDF bytes. Never fails; see [`Extraction`].
    pub fn extract(&self, bytes: &[u8]) -> Extraction {
        if exceeds_nesting(bytes, MAX_NESTING) {
            tracing::warn!(limit = MAX_NESTING, "refusing deeply nested PDF");
            return Extraction::failed(Degradation::ExtractionDegraded {
                reason: format!("PDF nesting deeper than {}", MAX_NESTING),
            });
        }

        let doc = match Document::load_mem(bytes) {
            Ok(doc) => doc,
            Err(e) => {
                return Extraction::failed(Degradation::ExtractionDegraded {
                    reason: PreprocessError::from(e).to_string(),
                })
            }
        };

        let page_ids = doc.get_pages();
        let pages: Vec<u32> = page_ids.keys().copied().collect();
        let text = join_pages(self.text_layer(&doc, &page_ids));
        if !text.trim().is_empty() {
            return Extraction::extracted(text, "pdf-text");
        }

        tracing::debug!(pages = pages.len(), dpi = self.render_dpi, "PDF has no text layer, falling back to OCR");
        match self.ocr_pages(bytes, &pages) {
            Ok(text) => Extraction::extracted(text, "pdf-ocr"),
            Err(e) => Extraction::failed(Degradation::ExtractionDegraded {
                reason: e.to_string(),
            }),
        }
    }

    /// Text layer of each page; unreadable pages count as empty.
    ///
    /// Content streams are only decompressed here, so their nesting is
    /// checked again before the content parser runs.
    fn text_layer(&self, doc: &Document, pages: &BTreeMap<u32, ObjectId>) -> Vec<String> {
        pages
            .iter()
            .map(|(page, id)| {
                if doc
                    .get_page_content(*id)
                    .is_ok_and(|content| exceeds_nesting(&content, MAX_NESTING))
                {
                    tracing::warn!(page, limit = MAX_NESTING, "skipping deeply nested PDF page content");
                    return String::new();
                }
                match doc.extract_text(&[*page]) {
                    Ok(text) => text,
                    Err(e) => {
                        tracing::debug!(page, error = %e, "skipping unreadable PDF page");
                        String::new()
                    }
                }
            })
            .collect()
    }

    fn ocr_pages(&self, bytes: &[u8], pages: &[u32]) -> Result<String> {
        let mut texts = Vec::with_capacity(pages.len());
        let mut last_error = None;

        for page in pages {
            let recognized = self
                .renderer
                .render_page(bytes, *page, self.render_dpi)
                .and_then(|image| self.ocr.recognize(&image));
            match recognized {
                Ok(text) => texts.push(text),
                Err(e) => {
                    tracing::debug!(page, error = %e, "PDF page OCR failed");
                    last_error = Some(e);
                }
            }
        }

        let text = join_pages(texts);
        if !text.trim().is_empty() {
            return Ok(text);
        }
        match last_error {
            Some(e) => Err(e.into()),
            None => Err(PreprocessError::Empty("PDF")),
        }
    }
}

/// Whether `[` / `<<` nesting in the raw file goes past `limit`.
///
/// String literals, hex strings, comments and stream bodies are skipped.
/// Unbalanced closers never take the depth below zero.
fn exceeds_nesting(bytes: &[u8], limit: usize) -> bool {
    let mut depth = 0usize;
    let mut i = 0;
    while i < bytes.len() {
        i = match bytes[i] {
            b'[' => {
                depth += 1;
                i + 1
            }
            b']' => {
                depth = depth.saturating_sub(1);
                i + 1
            }
            b'<' if bytes.get(i + 1) == Some(&b'<') => {
                depth += 1;
                i + 2
            }
            b'>' if bytes.get(i + 1) == Some(&b'>') => {
                depth = depth.saturating_sub(1);
                i + 2
            }
            b'<' => skip_past(bytes, i + 1, b">"),
            b'(' => skip_string(bytes, i + 1),
            b'%' => skip_comment(bytes, i + 1),
            b's' if is_keyword(bytes, i, b"stream") => skip_past(bytes, i + 6, b"endstream"),
            _ => i + 1,
        };
        if depth > limit {
            return true;
        }
    }
    false
}

fn is_keyword(bytes: &[u8], at: usize, keyword: &[u8]) -> bool {
    bytes[at..].starts_with(keyword) && (at == 0 || !bytes[at - 1].is_ascii_alphanumeric())
}

/// Index just past the next `needle` at or after `from`, or the end.
fn skip_past(bytes: &[u8], from: usize, needle: &[u8]) -> usize {
    bytes[from..]
        .windows(needle.len())
        .position(|window| window == needle)
        .map_or(bytes.len(), |at| from + at + needle.len())
}

fn skip_comment(bytes: &[u8], from: usize) -> usize {
    bytes[from..]
        .iter()
        .position(|b| *b == b'\n' || *b == b'\r')
        .map_or(bytes.len(), |at| from + at)
}

/// Literal strings nest balanced parentheses; `\` escapes the next byte.
fn skip_string(bytes: &[u8], mut i: usize) -> usize {
    let mut open = 1usize;
    while i < bytes.len() {
        match bytes[i] {
            b'\\' => i += 1,
            b'(' => open += 1,
            b')' => {
                open -= 1;
                if open == 0 {
                    return i + 1;
                }
            }
            _ => {}
        }
        i += 1;
    }
    bytes.len()
}

fn join_pages(pages: Vec<String>) -> String {
    pages
        .into_iter()
        .filter(|page| !page.trim().is_empty())
        .collect::<Vec<_>>()
        .join(PAGE_SEPARATOR)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ocr::{DisabledOcr, OcrError};
    use image::DynamicImage;
    use lopdf::content::{Content, Operation};
    use lopdf::{dictionary, Object, Stream};
    use std::sync::atomic::{AtomicU32, Ordering};

    /// Build a PDF with one page per entry; `None` pages carry no text.
    fn build_pdf(pages: &[Option<&str>]) -> Vec<u8> {
        let contents: Vec<Vec<u8>> = pages
            .iter()
            .map(|page| {
                let operations = match page {
                    Some(text) => vec![
                        Operation::new("BT", vec![]),
                        Operation::new("Tf", vec!["F1".into(), 12.into()]),
                        Operation::new("Td", vec![72.into(), 720.into()]),
                        Operation::new("Tj", vec![Object::string_literal(*text)]),
                        Operation::new("ET", vec![]),
                    ],
                    None => vec![],
                };
                Content { operations }.encode().unwrap()
            })
            .collect();
        build_pdf_with_contents(&contents)
    }

    /// Build a PDF whose pages carry the given raw content streams.
    fn build_pdf_with_contents(contents: &[Vec<u8>]) -> Vec<u8> {
        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();
        let font_id = doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => "Courier",
        });
        let resources_id = doc.add_object(dictionary! {
            "Font" => dictionary! { "F1" => font_id },
        });

        let mut kids: Vec<Object> = Vec::new();
        for content in contents {
            let content_id = doc.add_object(Stream::new(dictionary! {}, content.clone()));
            let page_id = doc.add_object(dictionary! {
                "Type" => "Page",
                "Parent" => pages_id,
                "Contents" => content_id,
            });
            kids.push(page_id.into());
        }

        let count = kids.len() as i64;
        doc.objects.insert(
            pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => kids,
                "Count" => count,
                "Resources" => resources_id,
                "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
            }),
        );
        let catalog_id = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        });
        doc.trailer.set("Root", catalog_id);

        let mut out = Vec::new();
        doc.save_to(&mut out).unwrap();
        out
    }

    struct BlankRenderer {
        calls: AtomicU32,
    }

    impl PageRenderer for BlankRenderer {
        fn render_page(&self, _pdf: &[u8], _page: u32, dpi: u32) -> std::result::Result<DynamicImage, OcrError> {
            assert_eq!(dpi, 200);
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(DynamicImage::new_rgb8(2, 2))
        }
    }

    struct PageCounterOcr {
        calls: AtomicU32,
    }

    impl OcrEngine for PageCounterOcr {
        fn recognize(&self, _image: &DynamicImage) -> std::result::Result<String, OcrError> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
            Ok(format!("scanned page {}", n))
        }

        fn name(&self) -> &str {
            "counter"
        }
    }

    #[test]
    fn test_text_layer() {
        let bytes = build_pdf(&[Some("First page"), None, Some("Third page")]);
        let extraction = PdfExtractor::new(&DisabledOcr, &DisabledOcr, 200).extract(&bytes);
        match extraction {
            Extraction::Extracted { text, via } => {
                assert_eq!(via, "pdf-text");
                assert!(text.contains("First page"));
                assert!(text.contains("Third page"));
                assert!(text.contains(PAGE_SEPARATOR));
            }
            other => panic!("expected text layer, got {:?}", other),
        }
    }

    #[test]
    fn test_ocr_fallback_for_textless_pdf() {
        let bytes = build_pdf(&[None, None]);
        let renderer = BlankRenderer { calls: AtomicU32::new(0) };
        let ocr = PageCounterOcr { calls: AtomicU32::new(0) };
        let extraction = PdfExtractor::new(&ocr, &renderer, 200).extract(&bytes);

        assert_eq!(
            extraction,
            Extraction::extracted("scanned page 1\n\nscanned page 2", "pdf-ocr")
        );
        assert_eq!(renderer.calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_textless_pdf_without_ocr_degrades() {
        let bytes = build_pdf(&[None]);
        let extraction = PdfExtractor::new(&DisabledOcr, &DisabledOcr, 200).extract(&bytes);
        assert!(extraction.is_degraded());
        assert_eq!(extraction.text(), "");
    }

    #[test]
    fn test_malformed_pdf_degrades() {
        let extraction = PdfExtractor::new(&DisabledOcr, &DisabledOcr, 200)
            .extract(b"%PDF-1.7\n%\xe2\xe3\xcf\xd3\n<<garbage");
        assert!(extraction.is_degraded());
        assert_eq!(extraction.text(), "");
    }

    /// A well-formed header and xref around one deeply nested array object.
    fn nested_pdf(depth: usize) -> Vec<u8> {
        let object = format!("1 0 obj\n{}{}\nendobj\n", "[".repeat(depth), "]".repeat(depth));
        let body_start = b"%PDF-1.7\n".len();
        let xref_at = body_start + object.len();
        format!(
            "%PDF-1.7\n{}xref\n0 2\n0000000000 65535 f \n{:010} 00000 n \ntrailer\n<< /Size 2 /Root 1 0 R >>\nstartxref\n{}\n%%EOF\n",
            object, body_start, xref_at
        )
        .into_bytes()
    }

    #[test]
    fn test_deeply_nested_pdf_is_refused() {
        for depth in [2_000, 20_000] {
            let extraction = PdfExtractor::new(&DisabledOcr, &DisabledOcr, 200).extract(&nested_pdf(depth));
            assert_eq!(
                extraction,
                Extraction::failed(Degradation::ExtractionDegraded {
                    reason: "PDF nesting deeper than 64".to_string(),
                })
            );
        }
    }

    #[test]
    fn test_deeply_nested_page_content_is_skipped() {
        let plain = b"BT /F1 12 Tf 72 720 Td (Kept page) Tj ET".to_vec();
        let nested = format!("BT /F1 12 Tf 72 720 Td {}(x){} TJ ET", "[".repeat(5_000), "]".repeat(5_000));
        let bytes = build_pdf_with_contents(&[nested.into_bytes(), plain]);

        // Stream bodies are opaque to the file-level scan
        assert!(!exceeds_nesting(&bytes, MAX_NESTING));
        let extraction = PdfExtractor::new(&DisabledOcr, &DisabledOcr, 200).extract(&bytes);
        assert!(!extraction.is_degraded());
        assert!(extraction.text().contains("Kept page"));
    }

    #[test]
    fn test_nesting_scan() {
        assert!(!exceeds_nesting(&nested_pdf(MAX_NESTING), MAX_NESTING));
        assert!(exceeds_nesting(&nested_pdf(MAX_NESTING + 1), MAX_NESTING));
        assert!(exceeds_nesting(b"<<<<<<", 2));
        assert!(!exceeds_nesting(b"<< /A << /B [1 2] >> >> << >>", 3));
        // Brackets inside strings, hex strings, comments and streams do not count
        assert!(!exceeds_nesting(b"([[[[) <5b5b5b> % [[[[\n[]", 1));
        assert!(!exceeds_nesting(b"(a \\) [[[[ (b) ) []", 1));
        assert!(!exceeds_nesting(b"stream\n[[[[[[\nendstream [ ]", 1));
        // Stray closers do not bank depth
        assert!(exceeds_nesting(b"]]]]]] [[[", 2));
    }

    #[test]
    fn test_generated_pdf_is_shallow() {
        let bytes = build_pdf(&[Some("First page"), Some("Second page")]);
        assert!(!exceeds_nesting(&bytes, MAX_NESTING));
    }

    #[test]
    fn test_join_pages_skips_blank() {
        let joined = join_pages(vec!["a".into(), "  \n".into(), "b".into()]);
        assert_eq!(joined, "a\n\nb");
    }
}
