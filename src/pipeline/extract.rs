//! PDF content extraction: raw bytes to model-ready document content.
//!
//! ## Why cap the text length?
//!
//! Extracted text flows straight into the completion prompt. An unbounded
//! report (or a garbage PDF that decompresses into megabytes of junk) would
//! blow the model's context window and the API bill with it. The cap
//! truncates silently — a monthly station report has its figures in the
//! first pages, and an error here would turn a harmless oversized appendix
//! into a failed invocation.
//!
//! We validate the `%PDF` magic bytes before handing the buffer to the
//! parser so callers get a meaningful `UnreadablePdf` rather than a parser
//! panic on arbitrary bytes.

use crate::error::ReportError;
use crate::provider::DocumentContent;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use tracing::debug;

/// Ceiling on extracted text length, in characters.
pub const MAX_TEXT_CHARS: usize = 200_000;

/// Extract plain text from PDF bytes, truncated to `max_chars`.
///
/// Fails with [`ReportError::UnreadablePdf`] when the buffer is empty, is
/// not a PDF, or the parser cannot read it (corrupted or encrypted files).
pub fn extract_text(name: &str, bytes: &[u8], max_chars: usize) -> Result<String, ReportError> {
    check_magic(name, bytes)?;

    let text = pdf_extract::extract_text_from_mem(bytes).map_err(|e| {
        ReportError::UnreadablePdf {
            name: name.to_string(),
            detail: e.to_string(),
        }
    })?;

    if text.trim().is_empty() {
        return Err(ReportError::UnreadablePdf {
            name: name.to_string(),
            detail: "no extractable text (scanned image or empty document)".to_string(),
        });
    }

    Ok(truncate_chars(&text, max_chars))
}

/// Re-encode the original PDF bytes for inline transmission.
///
/// Used in binary mode, where the provider reads the PDF natively instead
/// of receiving extracted text. The magic-byte check still applies: there
/// is no point paying for a completion over bytes that are not a PDF.
pub fn encode_bytes(name: &str, bytes: &[u8]) -> Result<String, ReportError> {
    check_magic(name, bytes)?;
    let b64 = STANDARD.encode(bytes);
    debug!("Encoded PDF → {} bytes base64", b64.len());
    Ok(b64)
}

/// Produce the document content for the configured mode.
pub fn extract_content(
    name: &str,
    bytes: &[u8],
    binary_mode: bool,
    max_chars: usize,
) -> Result<DocumentContent, ReportError> {
    if binary_mode {
        encode_bytes(name, bytes).map(DocumentContent::Base64)
    } else {
        extract_text(name, bytes, max_chars).map(DocumentContent::Text)
    }
}

fn check_magic(name: &str, bytes: &[u8]) -> Result<(), ReportError> {
    if bytes.is_empty() {
        return Err(ReportError::UnreadablePdf {
            name: name.to_string(),
            detail: "zero-length file".to_string(),
        });
    }
    if bytes.len() < 4 || &bytes[..4] != b"%PDF" {
        let shown = bytes.len().min(4);
        return Err(ReportError::UnreadablePdf {
            name: name.to_string(),
            detail: format!("not a PDF header, first bytes: {:?}", &bytes[..shown]),
        });
    }
    Ok(())
}

/// Truncate on a char boundary; silent by contract.
fn truncate_chars(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    debug!(
        "Truncating extracted text from {} to {} chars",
        text.chars().count(),
        max_chars
    );
    text.chars().take(max_chars).collect()
}
