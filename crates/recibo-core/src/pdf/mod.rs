//! PDF text extraction module.

mod extractor;

pub use extractor::PdfTextExtractor;

use crate::error::PdfError;

/// Result type for PDF operations.
pub type Result<T> = std::result::Result<T, PdfError>;

/// Trait for the PDF text collaborator.
///
/// The pipeline never propagates these errors: a failing transcript
/// degrades to "confidence 0, escalate to AI".
pub trait PdfTextSource: Send + Sync {
    /// Extract a plain-text transcript from a PDF buffer.
    fn extract_text(&self, data: &[u8]) -> Result<String>;
}
