//! Plain-text extraction from downloaded documents.
//!
//! The library serves PDFs, but the download is treated as opaque bytes: the
//! format is sniffed from the content, with the upstream `contentType` only as
//! a hint. PDF text is extracted page by page and joined with newlines; a page
//! without extractable text (scanned or image-only) contributes an empty
//! segment rather than failing the document.

use crate::error::{Error, Result};

pub const MIME_PDF: &str = "application/pdf";

/// Extracts plain text from document bytes.
///
/// Fails with [`Error::Parse`] when the bytes are in no recognized format or
/// the PDF structure itself is unreadable.
pub fn extract_text(bytes: &[u8], content_type: Option<&str>) -> Result<String> {
    if looks_like_pdf(bytes) || content_type == Some(MIME_PDF) {
        return extract_pdf(bytes);
    }
    match content_type {
        Some(ct) if ct.starts_with("text/") => Ok(String::from_utf8_lossy(bytes).into_owned()),
        Some(ct) => Err(Error::Parse(format!("unsupported content-type: {}", ct))),
        None => Err(Error::Parse("unrecognized document format".to_string())),
    }
}

fn looks_like_pdf(bytes: &[u8]) -> bool {
    let start = bytes
        .iter()
        .position(|b| !b.is_ascii_whitespace())
        .unwrap_or(bytes.len());
    bytes[start..].starts_with(b"%PDF")
}

fn extract_pdf(bytes: &[u8]) -> Result<String> {
    let pages = pdf_extract::extract_text_from_mem_by_pages(bytes)
        .map_err(|e| Error::Parse(format!("PDF extraction failed: {}", e)))?;
    Ok(join_pages(&pages))
}

/// Page-ordered text, one newline between pages. Empty pages stay as empty segments.
pub fn join_pages<S: AsRef<str>>(pages: &[S]) -> String {
    pages
        .iter()
        .map(|page| page.as_ref())
        .collect::<Vec<&str>>()
        .join("\n")
}
