//! Text extraction for uploaded documents.
//!
//! Extraction is an external capability as far as the pipeline is concerned:
//! an [`Extractor`] turns bytes + content-type into plain UTF-8 text and a
//! page count. [`DocumentExtractor`] handles PDF (`pdf-extract` for text,
//! `lopdf` for the page tree) and plain text.

use crate::error::{DigestError, Result};
use crate::models::ExtractedDocument;

pub const MIME_PDF: &str = "application/pdf";
pub const MIME_TEXT: &str = "text/plain";

/// Turns an uploaded buffer into text. Implementations must not panic on
/// malformed input; they return [`DigestError::ExtractionFailed`] instead.
pub trait Extractor: Send + Sync {
    fn extract(
        &self,
        bytes: &[u8],
        content_type: &str,
        original_filename: &str,
    ) -> Result<ExtractedDocument>;
}

/// Default extractor for PDF and plain-text uploads.
#[derive(Debug, Default, Clone, Copy)]
pub struct DocumentExtractor;

impl Extractor for DocumentExtractor {
    fn extract(
        &self,
        bytes: &[u8],
        content_type: &str,
        original_filename: &str,
    ) -> Result<ExtractedDocument> {
        let (text, page_count) = match content_type {
            MIME_PDF => extract_pdf(bytes)?,
            MIME_TEXT => extract_plain(bytes)?,
            other => return Err(DigestError::UnsupportedContentType(other.to_string())),
        };

        Ok(ExtractedDocument {
            text,
            page_count,
            original_filename: original_filename.to_string(),
        })
    }
}

fn extract_pdf(bytes: &[u8]) -> Result<(String, u32)> {
    let doc = lopdf::Document::load_mem(bytes)
        .map_err(|e| DigestError::ExtractionFailed(format!("PDF: {}", e)))?;
    let page_count = u32::try_from(doc.get_pages().len()).unwrap_or(u32::MAX);

    let text = pdf_extract::extract_text_from_mem(bytes)
        .map_err(|e| DigestError::ExtractionFailed(format!("PDF: {}", e)))?;

    Ok((text, page_count))
}

fn extract_plain(bytes: &[u8]) -> Result<(String, u32)> {
    let text = std::str::from_utf8(bytes)
        .map_err(|e| DigestError::ExtractionFailed(format!("text is not UTF-8: {}", e)))?;
    Ok((text.to_string(), 1))
}

/// Resolves the content type of an upload: a declared PDF or text type wins,
/// then the `%PDF-` magic, then the file extension.
pub fn detect_content_type(bytes: &[u8], filename: &str, declared: Option<&str>) -> String {
    let declared = declared.map(|d| d.split(';').next().unwrap_or(d).trim().to_ascii_lowercase());
    if let Some(ct) = declared.as_deref() {
        if ct == MIME_PDF || ct == MIME_TEXT {
            return ct.to_string();
        }
    }

    if bytes.starts_with(b"%PDF-") {
        return MIME_PDF.to_string();
    }

    let lower = filename.to_ascii_lowercase();
    if lower.ends_with(".pdf") {
        MIME_PDF.to_string()
    } else if lower.ends_with(".txt") || lower.ends_with(".md") {
        MIME_TEXT.to_string()
    } else {
        declared.unwrap_or_else(|| "application/octet-stream".to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unsupported_content_type_returns_error() {
        let err = DocumentExtractor
            .extract(b"foo", "application/octet-stream", "x.bin")
            .unwrap_err();
        assert!(matches!(err, DigestError::UnsupportedContentType(_)));
    }

    #[test]
    fn test_invalid_pdf_returns_extraction_error() {
        let err = DocumentExtractor
            .extract(b"not a pdf", MIME_PDF, "x.pdf")
            .unwrap_err();
        assert!(matches!(err, DigestError::ExtractionFailed(_)));
    }

    #[test]
    fn test_plain_text_is_one_page() {
        let doc = DocumentExtractor
            .extract("Bonjour\nle monde".as_bytes(), MIME_TEXT, "notes.txt")
            .unwrap();
        assert_eq!(doc.text, "Bonjour\nle monde");
        assert_eq!(doc.page_count, 1);
        assert_eq!(doc.original_filename, "notes.txt");
    }

    #[test]
    fn test_non_utf8_text_fails() {
        let err = DocumentExtractor
            .extract(&[0xff, 0xfe, 0x00], MIME_TEXT, "bad.txt")
            .unwrap_err();
        assert!(matches!(err, DigestError::ExtractionFailed(_)));
    }

    #[test]
    fn test_content_type_detection() {
        assert_eq!(detect_content_type(b"%PDF-1.4", "scan", None), MIME_PDF);
        assert_eq!(detect_content_type(b"hello", "a.TXT", None), MIME_TEXT);
        assert_eq!(
            detect_content_type(b"hello", "a", Some("text/plain; charset=utf-8")),
            MIME_TEXT
        );
        assert_eq!(
            detect_content_type(b"x", "a.pdf", Some("application/octet-stream")),
            MIME_PDF
        );
        assert_eq!(detect_content_type(b"x", "a.bin", Some("image/png")), "image/png");
    }
}
