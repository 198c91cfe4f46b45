use std::env;
use std::sync::Arc;

use crate::config::{Config, GEMINI_API_KEY_VAR};
use crate::llm::GeminiSettings;
use crate::tools::wikipedia::WikiSettings;

/// Everything the analysis pipeline needs besides the request itself.
#[derive(Debug, Clone)]
pub struct AnalyzerSettings {
    /// Environment variable holding the Gemini key. Read on every request.
    pub api_key_var: String,
    pub max_upload_bytes: usize,
    pub gemini: GeminiSettings,
    pub wiki: WikiSettings,
}

impl AnalyzerSettings {
    pub fn from_config(config: &Config) -> Self {
        AnalyzerSettings {
            api_key_var: GEMINI_API_KEY_VAR.to_string(),
            max_upload_bytes: config.max_upload_bytes,
            gemini: GeminiSettings::from_config(config),
            wiki: WikiSettings::from_config(config),
        }
    }

    pub fn resolve_api_key(&self) -> Option<String> {
        env::var(&self.api_key_var)
            .ok()
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty())
    }
}

#[derive(Clone)]
pub struct AppState {
    pub settings: Arc<AnalyzerSettings>,
}

impl AppState {
    pub fn new(settings: AnalyzerSettings) -> Self {
        AppState {
            settings: Arc::new(settings),
        }
    }
}
