//! The ingestion pipeline: regex stage first, AI escalation second.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tracing::{debug, info, warn};

use crate::ai::classify::is_transient_upstream;
use crate::ai::{AiExtractor, GeminiClient, GenerativeModel, StrategySelector};
use crate::error::{IngestError, Result};
use crate::models::config::{PipelineSettings, ReciboConfig};
use crate::models::extraction::ExtractionResult;
use crate::patterns::extract_with_patterns;
use crate::pdf::{PdfTextExtractor, PdfTextSource};

const SUPPORTED_MIME_TYPES: &[&str] = &["application/pdf", "image/jpeg", "image/png"];

/// Hybrid document extraction pipeline.
///
/// PDFs get a free regex pass over their text transcript first; only
/// documents the regex stage is not confident about (and all images) are
/// sent to the AI stage. The AI stage wraps its collaborator in a retry
/// loop with exponential backoff.
pub struct IngestionPipeline<M> {
    settings: PipelineSettings,
    pdf: Box<dyn PdfTextSource>,
    ai: Option<AiExtractor<M>>,
}

impl IngestionPipeline<GeminiClient> {
    /// Build the production pipeline from configuration.
    pub fn from_config(config: &ReciboConfig) -> Self {
        let ai = if config.ai_configured() {
            let selector = Arc::new(StrategySelector::new(
                config.ai.api_keys.clone(),
                config.ai.models.clone(),
            ));
            Some(AiExtractor::new(
                GeminiClient::new(config.ai.base_url.clone()),
                selector,
                Duration::from_secs(config.ai.timeout_secs),
                config.ai.max_rotation_attempts,
            ))
        } else {
            None
        };

        Self {
            settings: config.pipeline.clone(),
            pdf: Box::new(PdfTextExtractor),
            ai,
        }
    }
}

impl<M: GenerativeModel> IngestionPipeline<M> {
    /// Build a pipeline with explicit collaborators.
    pub fn with_parts(
        settings: PipelineSettings,
        pdf: Box<dyn PdfTextSource>,
        ai: Option<AiExtractor<M>>,
    ) -> Self {
        Self { settings, pdf, ai }
    }

    /// Process one document buffer into an extraction result.
    pub async fn process_file(
        &self,
        data: &[u8],
        mime_type: &str,
        categories: &[String],
    ) -> Result<ExtractionResult> {
        if data.is_empty() {
            return Err(IngestError::Validation("empty file".to_string()));
        }
        if !SUPPORTED_MIME_TYPES.contains(&mime_type) {
            return Err(IngestError::Validation(format!(
                "unsupported mime type: {}",
                mime_type
            )));
        }

        if mime_type == "application/pdf" {
            let transcript = match self.pdf.extract_text(data) {
                Ok(text) => text,
                Err(e) => {
                    // A broken transcript is not fatal: the document just
                    // loses its free pass and goes straight to the AI.
                    warn!(error = %e, "PDF text extraction failed, escalating to AI");
                    String::new()
                }
            };

            let regex = extract_with_patterns(&transcript);
            if regex.confidence >= self.settings.confidence_threshold {
                info!(confidence = regex.confidence, "regex stage accepted");
                return Ok(regex.into_extraction_result(Utc::now()));
            }
            debug!(
                confidence = regex.confidence,
                threshold = self.settings.confidence_threshold,
                "regex stage below threshold, escalating to AI"
            );
        }

        self.extract_with_retries(data, mime_type, categories).await
    }

    /// Outer retry loop around the AI stage.
    ///
    /// Typed errors pass through untouched. Transient upstream failures
    /// are retried with exponential backoff; the last one is replaced by
    /// `AiUnavailable` so callers never see a raw upstream error.
    async fn extract_with_retries(
        &self,
        data: &[u8],
        mime_type: &str,
        categories: &[String],
    ) -> Result<ExtractionResult> {
        let Some(ai) = &self.ai else {
            return Err(IngestError::AiUnavailable(
                "AI extraction not configured".to_string(),
            ));
        };
        if !ai.is_configured() {
            return Err(IngestError::AiUnavailable(
                "AI extraction not configured".to_string(),
            ));
        }

        let max_attempts = self.settings.max_attempts.max(1);
        for attempt in 1..=max_attempts {
            let error = match ai.extract(data, mime_type, categories).await {
                Ok(result) => return Ok(result),
                Err(e) => e,
            };

            let retryable =
                matches!(&error, IngestError::Upstream(u) if is_transient_upstream(u));
            if !retryable {
                return Err(Self::finalize(error));
            }
            if attempt == max_attempts {
                warn!(attempt, "retry budget exhausted");
                return Err(IngestError::AiUnavailable(
                    "service overloaded, try again later".to_string(),
                ));
            }

            let delay = self.settings.base_backoff_ms * 2u64.pow(attempt - 1);
            warn!(attempt, delay_ms = delay, error = %error, "transient AI failure, backing off");
            tokio::time::sleep(Duration::from_millis(delay)).await;
        }

        unreachable!("retry loop always returns")
    }

    /// Never let a raw upstream error escape the pipeline.
    fn finalize(error: IngestError) -> IngestError {
        match error {
            IngestError::Upstream(u) => IngestError::Internal(u.to_string()),
            other => other,
        }
    }
}
