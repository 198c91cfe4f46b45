use std::env;

use anyhow::{anyhow, Result};
use once_cell::sync::Lazy;
use tracing::warn;
use url::Url;

pub const GEMINI_API_KEY_VAR: &str = "GEMINI_API_KEY";

#[derive(Debug, Clone)]
pub struct Config {
    pub log_level: String,
    pub log_dir: String,
    pub host: String,
    pub port: u16,
    pub gemini_model: String,
    pub gemini_base_url: String,
    pub gemini_temperature: f32,
    pub gemini_safety_settings: String,
    pub wiki_api_endpoint: String,
    pub wiki_thumbnail_size: u32,
    pub max_upload_bytes: usize,
    pub http_timeout_seconds: u64,
    pub http_user_agent: String,
}

pub static CONFIG: Lazy<Config> =
    Lazy::new(|| Config::load().expect("Failed to load configuration"));

fn env_string(name: &str, default: &str) -> String {
    env::var(name)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
        .unwrap_or_else(|| default.to_string())
}

fn env_f32(name: &str, default: f32) -> f32 {
    env::var(name)
        .ok()
        .and_then(|value| value.trim().parse::<f32>().ok())
        .unwrap_or(default)
}

fn env_u16(name: &str, default: u16) -> u16 {
    env::var(name)
        .ok()
        .and_then(|value| value.trim().parse::<u16>().ok())
        .unwrap_or(default)
}

fn env_u32(name: &str, default: u32) -> u32 {
    env::var(name)
        .ok()
        .and_then(|value| value.trim().parse::<u32>().ok())
        .unwrap_or(default)
}

fn env_u64(name: &str, default: u64) -> u64 {
    env::var(name)
        .ok()
        .and_then(|value| value.trim().parse::<u64>().ok())
        .unwrap_or(default)
}

fn env_usize(name: &str, default: usize) -> usize {
    env::var(name)
        .ok()
        .and_then(|value| value.trim().parse::<usize>().ok())
        .unwrap_or(default)
}

fn normalize_gemini_safety_settings(value: String) -> String {
    let lowered = value.trim().to_lowercase();
    match lowered.as_str() {
        "" | "standard" => "standard".to_string(),
        "permissive" | "off" | "none" => "permissive".to_string(),
        _ => {
            warn!(
                "Unknown GEMINI_SAFETY_SETTINGS value '{}'; defaulting to standard.",
                value
            );
            "standard".to_string()
        }
    }
}

fn validated_endpoint(name: &str, value: String) -> Result<String> {
    let parsed = Url::parse(&value).map_err(|err| anyhow!("{name} is not a valid URL: {err}"))?;
    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(anyhow!("{name} must use http or https, got {}", parsed.scheme()));
    }
    Ok(value.trim_end_matches('/').to_string())
}

impl Config {
    pub fn load() -> Result<Self> {
        let gemini_base_url = validated_endpoint(
            "GEMINI_BASE_URL",
            env_string(
                "GEMINI_BASE_URL",
                "https://generativelanguage.googleapis.com",
            ),
        )?;
        let wiki_api_endpoint = validated_endpoint(
            "WIKI_API_ENDPOINT",
            env_string("WIKI_API_ENDPOINT", "https://en.wikipedia.org/w/api.php"),
        )?;

        Ok(Config {
            log_level: env_string("LOG_LEVEL", "info"),
            log_dir: env_string("LOG_DIR", "logs"),
            host: env_string("HOST", "0.0.0.0"),
            port: env_u16("PORT", 3000),
            gemini_model: env_string("GEMINI_MODEL", "gemini-2.0-flash"),
            gemini_base_url,
            gemini_temperature: env_f32("GEMINI_TEMPERATURE", 1.0),
            gemini_safety_settings: normalize_gemini_safety_settings(env_string(
                "GEMINI_SAFETY_SETTINGS",
                "standard",
            )),
            wiki_api_endpoint,
            wiki_thumbnail_size: env_u32("WIKI_THUMBNAIL_SIZE", 500).max(1),
            max_upload_bytes: env_usize("MAX_UPLOAD_BYTES", 10 * 1024 * 1024).max(1),
            http_timeout_seconds: env_u64("HTTP_TIMEOUT_SECONDS", 90).max(1),
            http_user_agent: env_string(
                "HTTP_USER_AGENT",
                concat!("lookalike-cam/", env!("CARGO_PKG_VERSION")),
            ),
        })
    }
}

pub const LOOKALIKE_PROMPT: &str = r#"Analyze this face. Identify the MOST famous celebrity, athlete, or historical figure that this person looks like.
Focus on facial structure, expression, and features.

Return a JSON object with:
- "name": The full name of the celebrity.
- "reason": A short reason why (e.g., "Same nose and winning smile").
- "funny_comment": A short, witty, stadium-announcer style comment (e.g., "Is that you, Tom??").

Output ONLY valid JSON."#;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn safety_settings_fall_back_to_standard() {
        assert_eq!(normalize_gemini_safety_settings("OFF".to_string()), "permissive");
        assert_eq!(normalize_gemini_safety_settings("".to_string()), "standard");
        assert_eq!(normalize_gemini_safety_settings("lax".to_string()), "standard");
    }

    #[test]
    fn endpoints_must_be_http_urls() {
        assert_eq!(
            validated_endpoint("X", "https://en.wikipedia.org/w/api.php/".to_string()).unwrap(),
            "https://en.wikipedia.org/w/api.php"
        );
        assert!(validated_endpoint("X", "ftp://example.com".to_string()).is_err());
        assert!(validated_endpoint("X", "not a url".to_string()).is_err());
    }
}
