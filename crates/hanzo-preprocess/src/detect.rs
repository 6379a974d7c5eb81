//! Format detection signals
//!
//! Two independent signals, consulted at different points of the pipeline:
//! the filename extension (trusted first, content is not checked) and the
//! leading magic bytes (consulted only after the decode chain gives up).

/// Route selected by a filename extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExtensionHint {
    Pdf,
    Image,
    Json,
    /// Delimited records with the given field delimiter
    Delimited(u8),
}

const IMAGE_EXTENSIONS: &[&str] = &[".png", ".jpg", ".jpeg", ".bmp", ".gif", ".webp"];

/// Classify a filename by its (case-insensitive) suffix.
pub fn classify_extension(filename: &str) -> Option<ExtensionHint> {
    let lower = filename.to_lowercase();

    if lower.ends_with(".pdf") {
        Some(ExtensionHint::Pdf)
    } else if IMAGE_EXTENSIONS.iter().any(|ext| lower.ends_with(ext)) {
        Some(ExtensionHint::Image)
    } else if lower.ends_with(".json") {
        Some(ExtensionHint::Json)
    } else if lower.ends_with(".csv") {
        Some(ExtensionHint::Delimited(b','))
    } else if lower.ends_with(".tsv") {
        Some(ExtensionHint::Delimited(b'\t'))
    } else {
        None
    }
}

/// Container recognized by its leading bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MagicKind {
    Pdf,
    Image,
}

/// Sniff the leading signature.
pub fn sniff_magic(bytes: &[u8]) -> Option<MagicKind> {
    if bytes.starts_with(b"%PDF") {
        return Some(MagicKind::Pdf);
    }
    let is_image = bytes.starts_with(b"\x89PNG")
        || bytes.starts_with(b"\xFF\xD8\xFF")
        || bytes.starts_with(b"GIF8")
        || (bytes.len() >= 12 && bytes.starts_with(b"RIFF") && &bytes[8..12] == b"WEBP");
    if is_image {
        Some(MagicKind::Image)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extensions() {
        assert_eq!(classify_extension("report.pdf"), Some(ExtensionHint::Pdf));
        assert_eq!(classify_extension("SCAN.JPEG"), Some(ExtensionHint::Image));
        assert_eq!(classify_extension("a.webp"), Some(ExtensionHint::Image));
        assert_eq!(classify_extension("evidence.json"), Some(ExtensionHint::Json));
        assert_eq!(classify_extension("rows.CSV"), Some(ExtensionHint::Delimited(b',')));
        assert_eq!(classify_extension("rows.tsv"), Some(ExtensionHint::Delimited(b'\t')));
        assert_eq!(classify_extension("notes.txt"), None);
        assert_eq!(classify_extension("pdf"), None);
        assert_eq!(classify_extension(""), None);
    }

    #[test]
    fn test_suffix_on_whole_name() {
        assert_eq!(classify_extension("archive.pdf.json"), Some(ExtensionHint::Json));
        assert_eq!(classify_extension("dir.png/readme"), None);
    }

    #[test]
    fn test_magic() {
        assert_eq!(sniff_magic(b"%PDF-1.7\n"), Some(MagicKind::Pdf));
        assert_eq!(sniff_magic(b"\x89PNG\r\n\x1a\n"), Some(MagicKind::Image));
        assert_eq!(sniff_magic(b"\xFF\xD8\xFF\xE1rest"), Some(MagicKind::Image));
        assert_eq!(sniff_magic(b"GIF89a"), Some(MagicKind::Image));
        assert_eq!(sniff_magic(b"RIFF\x10\x00\x00\x00WEBPVP8 "), Some(MagicKind::Image));
        assert_eq!(sniff_magic(b"RIFF\x10\x00\x00\x00WAVE"), None);
        assert_eq!(sniff_magic(b"%PD"), None);
        assert_eq!(sniff_magic(b""), None);
    }
}
