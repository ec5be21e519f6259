//! Error types for the recibo-core library.

use thiserror::Error;

/// Terminal error classifications surfaced by the ingestion pipeline.
///
/// Once an error is one of the typed kinds (`Validation`, `DocumentParse`,
/// `AiTimeout`, `AiUnavailable`) it is never downgraded or re-wrapped on the
/// way out of the pipeline. Only `Upstream` failures are subject to further
/// classification by the retry layer; whatever remains unclassified ends up
/// as `Internal`.
#[derive(Error, Debug)]
pub enum IngestError {
    /// Malformed or unsupported input (wrong mime type, empty file).
    #[error("validation error: {0}")]
    Validation(String),

    /// The model replied but its text could not be parsed into either
    /// document shape. Not retryable.
    #[error("could not parse AI response: {0}")]
    DocumentParse(String),

    /// The generation call exceeded the fixed deadline. Not retryable.
    #[error("AI generation timed out after {seconds}s")]
    AiTimeout { seconds: u64 },

    /// The AI subsystem is not configured, rotation is exhausted, or the
    /// retry budget ran out. The pipeline's "give up, come back later".
    #[error("AI service unavailable: {0}")]
    AiUnavailable(String),

    /// Raw failure from the generation collaborator, not yet classified
    /// by the retry layer. Never escapes the pipeline in this form.
    #[error("upstream AI failure: {0}")]
    Upstream(UpstreamError),

    /// Catch-all wrapper preserving the original message as debug context.
    #[error("internal error: {0}")]
    Internal(String),
}

/// A failure reported by the generation collaborator.
///
/// Upstream error shapes vary (HTTP layer, transport, provider-specific
/// bodies), so this keeps the raw message alongside whatever structure was
/// available. Classification happens in [`crate::ai::classify`].
#[derive(Debug, Clone)]
pub struct UpstreamError {
    /// Raw error message as reported upstream.
    pub message: String,
    /// HTTP status code, when the failure came from an HTTP response.
    pub status: Option<u16>,
    /// Transport/gRPC-style error code (e.g. `ECONNRESET`, `UNAVAILABLE`).
    pub code: Option<String>,
}

impl UpstreamError {
    pub fn message(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            status: None,
            code: None,
        }
    }

    pub fn with_status(mut self, status: u16) -> Self {
        self.status = Some(status);
        self
    }

    pub fn with_code(mut self, code: impl Into<String>) -> Self {
        self.code = Some(code.into());
        self
    }
}

impl std::fmt::Display for UpstreamError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.status {
            Some(status) => write!(f, "HTTP {}: {}", status, self.message),
            None => f.write_str(&self.message),
        }
    }
}

/// Errors related to PDF text extraction.
///
/// The pipeline itself never propagates these: a failing transcript degrades
/// to "confidence 0, escalate to AI" instead.
#[derive(Error, Debug)]
pub enum PdfError {
    /// Failed to open/parse the PDF file.
    #[error("failed to parse PDF: {0}")]
    Parse(String),

    /// Failed to extract text from the PDF.
    #[error("failed to extract text: {0}")]
    TextExtraction(String),

    /// The PDF is encrypted and cannot be processed.
    #[error("PDF is encrypted")]
    Encrypted,

    /// The PDF is empty or has no pages.
    #[error("PDF has no pages")]
    NoPages,
}

/// Result type for the recibo library.
pub type Result<T> = std::result::Result<T, IngestError>;
