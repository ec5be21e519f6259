//! Generation client and the rotation loop around it.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use serde_json::{Value, json};
use tracing::{debug, info, warn};

use crate::ai::classify::is_quota_message;
use crate::ai::prompt::build_extraction_prompt;
use crate::ai::response::parse_ai_response;
use crate::ai::strategy::{Strategy, StrategySelector};
use crate::error::{IngestError, Result, UpstreamError};
use crate::models::extraction::ExtractionResult;

/// A multimodal generation backend.
///
/// The single seam between the rotation loop and the network: production
/// uses [`GeminiClient`], tests substitute a scripted implementation.
#[async_trait]
pub trait GenerativeModel: Send + Sync {
    /// Run one generation call and return the raw model text.
    async fn generate(
        &self,
        strategy: &Strategy,
        prompt: &str,
        data: &[u8],
        mime_type: &str,
    ) -> std::result::Result<String, UpstreamError>;
}

/// Gemini `generateContent` client.
pub struct GeminiClient {
    http: reqwest::Client,
    base_url: String,
}

impl GeminiClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.into(),
        }
    }
}

#[async_trait]
impl GenerativeModel for GeminiClient {
    async fn generate(
        &self,
        strategy: &Strategy,
        prompt: &str,
        data: &[u8],
        mime_type: &str,
    ) -> std::result::Result<String, UpstreamError> {
        let url = format!(
            "{}/v1beta/models/{}:generateContent?key={}",
            self.base_url, strategy.model, strategy.api_key
        );

        let body = json!({
            "contents": [{
                "parts": [
                    {"inline_data": {"mime_type": mime_type, "data": BASE64.encode(data)}},
                    {"text": prompt}
                ]
            }],
            "generationConfig": {"temperature": 0}
        });

        debug!(model = %strategy.model, key_index = strategy.key_index, "calling generation API");

        let response = self.http.post(&url).json(&body).send().await.map_err(|e| {
            let err = UpstreamError::message(e.to_string());
            match e.status() {
                Some(status) => err.with_status(status.as_u16()),
                None => err,
            }
        })?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| UpstreamError::message(e.to_string()).with_status(status.as_u16()))?;

        if !status.is_success() {
            // Keep the status inside the message too so substring
            // classification sees it.
            return Err(UpstreamError::message(format!("HTTP {}: {}", status.as_u16(), text))
                .with_status(status.as_u16()));
        }

        let payload: Value = serde_json::from_str(&text).map_err(|e| {
            UpstreamError::message(format!("unreadable API response: {}", e))
                .with_status(status.as_u16())
        })?;

        let parts = payload["candidates"][0]["content"]["parts"]
            .as_array()
            .ok_or_else(|| UpstreamError::message("response carried no candidates"))?;

        let combined: String = parts
            .iter()
            .filter_map(|p| p["text"].as_str())
            .collect::<Vec<_>>()
            .join("");

        if combined.is_empty() {
            return Err(UpstreamError::message("response carried no text parts"));
        }
        Ok(combined)
    }
}

/// Drives generation calls under a deadline, rotating strategies on
/// quota-style failures.
pub struct AiExtractor<M> {
    model: M,
    selector: Arc<StrategySelector>,
    timeout: Duration,
    max_rotation_attempts: usize,
}

impl<M: GenerativeModel> AiExtractor<M> {
    pub fn new(
        model: M,
        selector: Arc<StrategySelector>,
        timeout: Duration,
        max_rotation_attempts: usize,
    ) -> Self {
        Self {
            model,
            selector,
            timeout,
            max_rotation_attempts,
        }
    }

    pub fn is_configured(&self) -> bool {
        self.selector.is_configured()
    }

    /// Extract a document via the generation backend.
    ///
    /// Quota-style failures rotate to the next (key, model) pair and try
    /// again immediately; every other outcome is final. The deadline is
    /// per call, not total.
    pub async fn extract(
        &self,
        data: &[u8],
        mime_type: &str,
        categories: &[String],
    ) -> Result<ExtractionResult> {
        // `current()` indexes into the key/model lists, so an empty
        // selector must be rejected before the loop.
        if !self.selector.is_configured() {
            return Err(IngestError::AiUnavailable(
                "no API keys or models configured".to_string(),
            ));
        }

        let prompt = build_extraction_prompt(categories);

        for attempt in 1..=self.max_rotation_attempts {
            let strategy = self.selector.current();
            debug!(attempt, model = %strategy.model, "AI extraction attempt");

            let outcome = tokio::time::timeout(
                self.timeout,
                self.model.generate(&strategy, &prompt, data, mime_type),
            )
            .await;

            let upstream = match outcome {
                Err(_) => {
                    warn!(model = %strategy.model, "generation call hit the deadline");
                    return Err(IngestError::AiTimeout {
                        seconds: self.timeout.as_secs(),
                    });
                }
                Ok(Ok(text)) => {
                    info!(model = %strategy.model, attempt, "AI extraction succeeded");
                    return parse_ai_response(&text);
                }
                Ok(Err(upstream)) => upstream,
            };

            if is_quota_message(&upstream.message) {
                warn!(model = %strategy.model, error = %upstream, "quota-style failure, rotating");
                if !self.selector.rotate() {
                    return Err(IngestError::AiUnavailable(
                        "all API keys and models exhausted".to_string(),
                    ));
                }
                continue;
            }
            return Err(IngestError::Upstream(upstream));
        }

        Err(IngestError::AiUnavailable(
            "rotation attempts exhausted".to_string(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::sync::atomic::{AtomicUsize, Ordering};

    const OK_JSON: &str = r#"{"merchant": "Loja Teste", "amount": 12.5}"#;

    /// Scripted backend: the nth call consumes the nth response.
    struct ScriptedModel {
        responses: Vec<std::result::Result<String, UpstreamError>>,
        calls: AtomicUsize,
    }

    impl ScriptedModel {
        fn new(responses: Vec<std::result::Result<String, UpstreamError>>) -> Self {
            Self {
                responses,
                calls: AtomicUsize::new(0),
            }
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl GenerativeModel for ScriptedModel {
        async fn generate(
            &self,
            _strategy: &Strategy,
            _prompt: &str,
            _data: &[u8],
            _mime_type: &str,
        ) -> std::result::Result<String, UpstreamError> {
            let idx = self.calls.fetch_add(1, Ordering::SeqCst);
            self.responses[idx.min(self.responses.len() - 1)].clone()
        }
    }

    struct HangingModel;

    #[async_trait]
    impl GenerativeModel for HangingModel {
        async fn generate(
            &self,
            _strategy: &Strategy,
            _prompt: &str,
            _data: &[u8],
            _mime_type: &str,
        ) -> std::result::Result<String, UpstreamError> {
            tokio::time::sleep(Duration::from_secs(3600)).await;
            unreachable!()
        }
    }

    fn selector() -> Arc<StrategySelector> {
        Arc::new(StrategySelector::new(
            vec!["key-a".into(), "key-b".into()],
            vec!["m0".into(), "m1".into()],
        ))
    }

    fn extractor<M: GenerativeModel>(model: M) -> AiExtractor<M> {
        AiExtractor::new(model, selector(), Duration::from_secs(90), 15)
    }

    #[tokio::test]
    async fn success_on_first_strategy() {
        let ex = extractor(ScriptedModel::new(vec![Ok(OK_JSON.to_string())]));
        let result = ex.extract(b"pdf", "application/pdf", &[]).await.unwrap();
        assert_eq!(result.merchant.as_deref(), Some("Loja Teste"));
        assert_eq!(ex.model.calls(), 1);
    }

    #[tokio::test]
    async fn quota_failure_rotates_and_retries() {
        let ex = extractor(ScriptedModel::new(vec![
            Err(UpstreamError::message("429 Too Many Requests").with_status(429)),
            Err(UpstreamError::message("quota exceeded for this model")),
            Ok(OK_JSON.to_string()),
        ]));
        let result = ex.extract(b"pdf", "application/pdf", &[]).await.unwrap();
        assert_eq!(result.amount, 12.5);
        assert_eq!(ex.model.calls(), 3);
        let s = ex.selector.current();
        assert_eq!((s.key_index, s.model_index), (1, 0));
    }

    #[tokio::test]
    async fn exhausted_rotation_becomes_unavailable() {
        let ex = extractor(ScriptedModel::new(vec![Err(UpstreamError::message(
            "quota exceeded",
        ))]));
        let err = ex.extract(b"pdf", "application/pdf", &[]).await.unwrap_err();
        assert!(matches!(err, IngestError::AiUnavailable(_)));
        // 2 keys x 2 models, all burned.
        assert_eq!(ex.model.calls(), 4);
    }

    #[tokio::test]
    async fn unconfigured_selector_is_unavailable_without_a_call() {
        let empty = Arc::new(StrategySelector::new(Vec::new(), Vec::new()));
        let ex = AiExtractor::new(
            ScriptedModel::new(vec![Ok(OK_JSON.to_string())]),
            empty,
            Duration::from_secs(90),
            15,
        );
        let err = ex.extract(b"pdf", "application/pdf", &[]).await.unwrap_err();
        assert!(matches!(err, IngestError::AiUnavailable(_)));
        assert_eq!(ex.model.calls(), 0);
    }

    #[tokio::test]
    async fn non_quota_failure_surfaces_as_upstream() {
        let ex = extractor(ScriptedModel::new(vec![Err(UpstreamError::message(
            "socket hang up",
        ))]));
        let err = ex.extract(b"pdf", "application/pdf", &[]).await.unwrap_err();
        assert!(matches!(err, IngestError::Upstream(_)));
        assert_eq!(ex.model.calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn deadline_produces_timeout_error() {
        let ex = AiExtractor::new(HangingModel, selector(), Duration::from_secs(90), 15);
        let err = ex.extract(b"pdf", "application/pdf", &[]).await.unwrap_err();
        assert!(matches!(err, IngestError::AiTimeout { seconds: 90 }));
    }

    #[tokio::test]
    async fn unparseable_reply_is_a_parse_error_not_a_retry() {
        let ex = extractor(ScriptedModel::new(vec![Ok("sem JSON aqui".to_string())]));
        let err = ex.extract(b"pdf", "application/pdf", &[]).await.unwrap_err();
        assert!(matches!(err, IngestError::DocumentParse(_)));
        assert_eq!(ex.model.calls(), 1);
    }
}
