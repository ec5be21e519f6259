//! Configuration structures for the ingestion pipeline.

use serde::{Deserialize, Serialize};

/// Main configuration for the recibo pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReciboConfig {
    /// Pipeline control (threshold, retry policy).
    pub pipeline: PipelineSettings,

    /// AI extraction settings (keys, models, timeout, rotation).
    pub ai: AiSettings,
}

impl Default for ReciboConfig {
    fn default() -> Self {
        Self {
            pipeline: PipelineSettings::default(),
            ai: AiSettings::default(),
        }
    }
}

/// Pipeline control settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineSettings {
    /// Confidence above which the regex result is trusted without AI
    /// escalation. Currency + date + merchant alone reach 0.75, so 0.8
    /// forces at least one more pattern on top of those.
    pub confidence_threshold: f64,

    /// Total attempts of the outer AI retry loop.
    pub max_attempts: u32,

    /// Base delay for exponential backoff between attempts.
    pub base_backoff_ms: u64,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            confidence_threshold: 0.8,
            max_attempts: 3,
            base_backoff_ms: 1000,
        }
    }
}

/// AI extraction settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AiSettings {
    /// Ordered API keys. Empty means the AI stage is unavailable.
    pub api_keys: Vec<String>,

    /// Ordered model names. All models are tried under a key before the
    /// next key is used.
    pub models: Vec<String>,

    /// Hard deadline for one generation call. Statement parsing spans
    /// multiple pages, hence the long default.
    pub timeout_secs: u64,

    /// Safety ceiling on rotation-driven retries for one document.
    pub max_rotation_attempts: usize,

    /// Generation API base URL.
    pub base_url: String,
}

impl Default for AiSettings {
    fn default() -> Self {
        Self {
            api_keys: Vec::new(),
            models: vec![
                "gemini-2.0-flash".to_string(),
                "gemini-1.5-flash".to_string(),
                "gemini-1.5-flash-8b".to_string(),
            ],
            timeout_secs: 90,
            max_rotation_attempts: 15,
            base_url: "https://generativelanguage.googleapis.com".to_string(),
        }
    }
}

impl ReciboConfig {
    /// Load configuration from a JSON file.
    pub fn from_file(path: &std::path::Path) -> Result<Self, std::io::Error> {
        let content = std::fs::read_to_string(path)?;
        serde_json::from_str(&content)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e.to_string()))
    }

    /// Save configuration to a JSON file.
    pub fn save(&self, path: &std::path::Path) -> Result<(), std::io::Error> {
        let content = serde_json::to_string_pretty(self)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e.to_string()))?;
        std::fs::write(path, content)
    }

    /// Whether the AI stage has at least one usable (key, model) pair.
    pub fn ai_configured(&self) -> bool {
        !self.ai.api_keys.is_empty() && !self.ai.models.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_pipeline_contract() {
        let config = ReciboConfig::default();
        assert_eq!(config.pipeline.confidence_threshold, 0.8);
        assert_eq!(config.pipeline.max_attempts, 3);
        assert_eq!(config.pipeline.base_backoff_ms, 1000);
        assert_eq!(config.ai.timeout_secs, 90);
        assert_eq!(config.ai.max_rotation_attempts, 15);
        assert!(!config.ai_configured());
    }

    #[test]
    fn partial_config_fills_defaults() {
        let config: ReciboConfig =
            serde_json::from_str(r#"{"ai": {"api_keys": ["k1"]}}"#).unwrap();
        assert_eq!(config.ai.api_keys, vec!["k1"]);
        assert_eq!(config.ai.timeout_secs, 90);
        assert!(config.ai_configured());
    }
}
