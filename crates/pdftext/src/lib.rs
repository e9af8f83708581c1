use anyhow::{Context, Result};

/// Magic bytes every PDF starts with ("%PDF").
const PDF_MAGIC: &[u8; 4] = b"%PDF";

/// Quick sanity check on uploaded bytes before attempting extraction.
pub fn looks_like_pdf(bytes: &[u8]) -> bool {
    bytes.len() >= PDF_MAGIC.len() && &bytes[..PDF_MAGIC.len()] == PDF_MAGIC
}

/// Extract all text from an in-memory PDF.
///
/// Extraction is a black box: bytes in, trimmed UTF-8 text out, or an error
/// when the document cannot be parsed. Scanned/image-only PDFs come back as
/// an empty string rather than an error; callers decide whether that is a
/// problem.
pub fn extract_text(bytes: &[u8]) -> Result<String> {
    let text = pdf_extract::extract_text_from_mem(bytes)
        .context("failed to extract text from PDF bytes")?;
    let text = text.trim().to_string();
    tracing::debug!(bytes = bytes.len(), chars = text.len(), "extracted text from PDF");
    Ok(text)
}
