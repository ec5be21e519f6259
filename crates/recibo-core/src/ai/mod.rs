//! AI extraction stage: strategy rotation, generation client, response parsing.

pub mod classify;
mod client;
mod prompt;
mod response;
mod strategy;

pub use client::{AiExtractor, GeminiClient, GenerativeModel};
pub use prompt::build_extraction_prompt;
pub use response::{normalize_amount, parse_ai_response};
pub use strategy::{Strategy, StrategySelector};
