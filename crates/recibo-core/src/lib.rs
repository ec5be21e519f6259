//! Core library for Brazilian financial document extraction.
//!
//! This crate provides:
//! - PDF text transcription
//! - Deterministic regex extraction (CNPJ, amounts, dates, boleto lines)
//! - Multimodal AI escalation with key/model rotation and retries
//! - A unified extraction result model for receipts, boletos and statements

pub mod ai;
pub mod error;
pub mod ingest;
pub mod models;
pub mod patterns;
pub mod pdf;

pub use ai::{AiExtractor, GeminiClient, GenerativeModel, Strategy, StrategySelector};
pub use error::{IngestError, PdfError, Result, UpstreamError};
pub use ingest::IngestionPipeline;
pub use models::{
    AiSettings, ExtractedTransaction, ExtractionMethod, ExtractionResult, LineItem,
    PipelineSettings, ReciboConfig, StatementInfo,
};
pub use patterns::{RegexExtraction, extract_with_patterns};
pub use pdf::{PdfTextExtractor, PdfTextSource};
