//! Text extraction for source documents.
//!
//! The indexer reads raw bytes and hands them to a [`TextExtractor`]; the
//! default [`PdfExtractor`] uses `pdf-extract`. Extraction is CPU-bound and
//! is run on the blocking pool by callers, which also absorbs any panic
//! from the parser as a failed task.

use thiserror::Error;

/// Extraction error. Callers log it and skip the document.
#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("PDF extraction failed: {0}")]
    Pdf(String),
}

/// Turns a document's bytes into plain UTF-8 text.
pub trait TextExtractor: Send + Sync {
    fn extract(&self, bytes: &[u8]) -> Result<String, ExtractError>;
}

/// PDF text extraction backed by `pdf-extract`.
#[derive(Debug, Default, Clone, Copy)]
pub struct PdfExtractor;

impl TextExtractor for PdfExtractor {
    fn extract(&self, bytes: &[u8]) -> Result<String, ExtractError> {
        pdf_extract::extract_text_from_mem(bytes).map_err(|e| ExtractError::Pdf(e.to_string()))
    }
}
