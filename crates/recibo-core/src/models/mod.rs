//! Data models for extraction results and configuration.

pub mod config;
pub mod extraction;

pub use config::{AiSettings, PipelineSettings, ReciboConfig};
pub use extraction::{
    ExtractedTransaction, ExtractionMethod, ExtractionResult, LineItem, StatementInfo,
};
