use anyhow::{anyhow, Result};
use serde::Deserialize;
use serde_json::{json, Map, Value};
use tracing::{debug, warn};

use crate::config::Config;
use crate::llm::media::encode_base64;
use crate::utils::http::get_http_client;
use crate::utils::timing::log_upstream_timing;

#[derive(Debug, Clone)]
pub struct GeminiSettings {
    pub base_url: String,
    pub model: String,
    pub temperature: f32,
    pub safety_settings: String,
}

impl GeminiSettings {
    pub fn from_config(config: &Config) -> Self {
        GeminiSettings {
            base_url: config.gemini_base_url.clone(),
            model: config.gemini_model.clone(),
            temperature: config.gemini_temperature,
            safety_settings: config.gemini_safety_settings.clone(),
        }
    }

    fn generate_content_url(&self) -> String {
        format!(
            "{}/v1beta/models/{}:generateContent",
            self.base_url.trim_end_matches('/'),
            self.model
        )
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiResponse {
    candidates: Option<Vec<GeminiCandidate>>,
    prompt_feedback: Option<GeminiPromptFeedback>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiPromptFeedback {
    block_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiCandidate {
    content: Option<GeminiContent>,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GeminiContent {
    parts: Option<Vec<GeminiPart>>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum GeminiPart {
    Text { text: String },
    Other(serde::de::IgnoredAny),
}

fn build_safety_settings(profile: &str) -> Vec<Value> {
    let threshold = match profile {
        "permissive" => "OFF",
        "standard" => "BLOCK_MEDIUM_AND_ABOVE",
        _ => {
            warn!(
                "Unknown GEMINI_SAFETY_SETTINGS value '{}', using standard defaults.",
                profile
            );
            "BLOCK_MEDIUM_AND_ABOVE"
        }
    };

    vec![
        json!({ "category": "HARM_CATEGORY_HARASSMENT", "threshold": threshold }),
        json!({ "category": "HARM_CATEGORY_HATE_SPEECH", "threshold": threshold }),
        json!({ "category": "HARM_CATEGORY_SEXUALLY_EXPLICIT", "threshold": threshold }),
        json!({ "category": "HARM_CATEGORY_DANGEROUS_CONTENT", "threshold": threshold }),
    ]
}

pub(crate) fn truncate_for_log(value: &str, limit: usize) -> String {
    if value.chars().count() <= limit {
        return value.to_string();
    }
    let truncated: String = value.chars().take(limit).collect();
    format!("{truncated}... (truncated)")
}

fn summarize_gemini_parts(parts: &[Value]) -> Vec<Value> {
    parts
        .iter()
        .map(|part| {
            if let Some(text) = part.get("text").and_then(|value| value.as_str()) {
                json!({ "text": truncate_for_log(text, 200) })
            } else if let Some(inline_data) = part.get("inlineData") {
                let mime_type = inline_data
                    .get("mimeType")
                    .and_then(|value| value.as_str())
                    .unwrap_or("unknown");
                let data_len = inline_data
                    .get("data")
                    .and_then(|value| value.as_str())
                    .map(|value| value.len())
                    .unwrap_or(0);
                json!({ "inlineData": { "mimeType": mime_type, "dataLen": data_len } })
            } else {
                json!({ "unknownPart": true })
            }
        })
        .collect()
}

fn summarize_gemini_payload(payload: &Value) -> Value {
    let mut summary = Map::new();

    if let Some(contents) = payload.get("contents").and_then(|value| value.as_array()) {
        let mut summarized_contents = Vec::new();
        for content in contents {
            let role = content
                .get("role")
                .and_then(|value| value.as_str())
                .unwrap_or("user");
            let parts = content
                .get("parts")
                .and_then(|value| value.as_array())
                .map(|parts| summarize_gemini_parts(parts))
                .unwrap_or_default();
            summarized_contents.push(json!({ "role": role, "parts": parts }));
        }
        summary.insert("contents".to_string(), Value::Array(summarized_contents));
    }

    if let Some(config) = payload.get("generationConfig") {
        summary.insert("generationConfig".to_string(), config.clone());
    }

    if let Some(safety) = payload
        .get("safetySettings")
        .and_then(|value| value.as_array())
    {
        summary.insert("safetySettingsCount".to_string(), json!(safety.len()));
    }

    Value::Object(summary)
}

fn summarize_error_body(body: &str) -> (Option<String>, String) {
    let trimmed = body.trim();
    if trimmed.is_empty() {
        return (None, "empty response body".to_string());
    }

    if let Ok(value) = serde_json::from_str::<Value>(trimmed) {
        let message = value
            .pointer("/error/message")
            .and_then(|v| v.as_str())
            .map(|v| v.to_string())
            .or_else(|| {
                value
                    .get("message")
                    .and_then(|v| v.as_str())
                    .map(|v| v.to_string())
            });
        return (message, truncate_for_log(&value.to_string(), 2000));
    }

    (None, truncate_for_log(trimmed, 2000))
}

fn build_vision_payload(
    settings: &GeminiSettings,
    prompt: &str,
    image: &[u8],
    mime_type: &str,
) -> Value {
    json!({
        "contents": [{
            "role": "user",
            "parts": [
                { "text": prompt },
                { "inlineData": { "mimeType": mime_type, "data": encode_base64(image) } }
            ]
        }],
        "generationConfig": {
            "temperature": settings.temperature,
        },
        "safetySettings": build_safety_settings(&settings.safety_settings),
    })
}

/// Explains a reply without text, from the block reason or finish reasons.
fn describe_empty_reply(response: &GeminiResponse) -> String {
    let block_reason = response
        .prompt_feedback
        .as_ref()
        .and_then(|feedback| feedback.block_reason.as_deref())
        .unwrap_or("none");
    let finish_reasons: Vec<&str> = response
        .candidates
        .iter()
        .flatten()
        .filter_map(|candidate| candidate.finish_reason.as_deref())
        .collect();
    let finish_reasons = if finish_reasons.is_empty() {
        "none".to_string()
    } else {
        finish_reasons.join(",")
    };
    format!(
        "blockReason={}, candidates={}, finishReason={}",
        block_reason,
        response.candidates.as_ref().map_or(0, Vec::len),
        finish_reasons
    )
}

fn extract_text_from_response(response: GeminiResponse) -> String {
    let mut text_parts = Vec::new();
    for candidate in response.candidates.unwrap_or_default() {
        if let Some(content) = candidate.content {
            if let Some(parts) = content.parts {
                for part in parts {
                    if let GeminiPart::Text { text } = part {
                        if !text.trim().is_empty() {
                            text_parts.push(text);
                        }
                    }
                }
            }
        }
    }
    text_parts.join("\n")
}

async fn call_gemini_api(settings: &GeminiSettings, api_key: &str, payload: Value) -> Result<String> {
    let client = get_http_client();

    if tracing::enabled!(tracing::Level::DEBUG) {
        let payload_summary = summarize_gemini_payload(&payload);
        debug!(target: "llm.gemini", model = %settings.model, payload = %payload_summary);
    }

    let response = client
        .post(settings.generate_content_url())
        .header("x-goog-api-key", api_key)
        .json(&payload)
        .send()
        .await
        .map_err(|err| {
            warn!(
                "Gemini request failed to send: {} (timeout={}, connect={})",
                err,
                err.is_timeout(),
                err.is_connect()
            );
            anyhow!("Gemini request failed: {}", err)
        })?;

    if !response.status().is_success() {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        let (message, body_summary) = summarize_error_body(&body);
        warn!("Gemini API error: status={}, body={}", status, body_summary);
        let detail = message.unwrap_or(body_summary);
        return Err(anyhow!(
            "Gemini request failed with status {}: {}",
            status,
            detail
        ));
    }

    let value = response.json::<GeminiResponse>().await?;
    let empty_reason = describe_empty_reply(&value);
    let text = extract_text_from_response(value);
    if text.is_empty() {
        warn!("Gemini returned no text: {}", empty_reason);
        return Err(anyhow!("Gemini returned no text ({})", empty_reason));
    }
    debug!(
        target: "llm.gemini",
        model = %settings.model,
        text_preview = %truncate_for_log(&text, 200)
    );
    Ok(text)
}

/// Sends one prompt plus one inline image and returns the concatenated text
/// parts of the reply.
pub async fn call_gemini_vision(
    settings: &GeminiSettings,
    api_key: &str,
    prompt: &str,
    image: &[u8],
    mime_type: &str,
) -> Result<String> {
    let payload = build_vision_payload(settings, prompt, image, mime_type);
    let metadata = json!({
        "model": settings.model,
        "mimeType": mime_type,
        "imageBytes": image.len(),
    });

    log_upstream_timing("gemini", "identify_lookalike", Some(metadata), || {
        call_gemini_api(settings, api_key, payload)
    })
    .await
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings() -> GeminiSettings {
        GeminiSettings {
            base_url: "http://127.0.0.1:9/".to_string(),
            model: "gemini-test".to_string(),
            temperature: 0.5,
            safety_settings: "standard".to_string(),
        }
    }

    #[test]
    fn payload_carries_prompt_and_inline_image() {
        let payload = build_vision_payload(&settings(), "who is this?", b"abc", "image/png");
        let parts = payload
            .pointer("/contents/0/parts")
            .and_then(|value| value.as_array())
            .unwrap();
        assert_eq!(parts[0]["text"], "who is this?");
        assert_eq!(parts[1]["inlineData"]["mimeType"], "image/png");
        assert_eq!(parts[1]["inlineData"]["data"], "YWJj");
    }

    #[test]
    fn payload_summary_hides_image_data() {
        let payload = build_vision_payload(&settings(), "prompt", b"abcdef", "image/jpeg");
        let summary = summarize_gemini_payload(&payload).to_string();
        assert!(!summary.contains("YWJjZGVm"));
        assert!(summary.contains("\"dataLen\":8"));
        assert!(summary.contains("\"safetySettingsCount\":4"));
    }

    #[test]
    fn url_joins_base_and_model() {
        assert_eq!(
            settings().generate_content_url(),
            "http://127.0.0.1:9/v1beta/models/gemini-test:generateContent"
        );
    }

    #[test]
    fn text_parts_are_joined_and_other_parts_skipped() {
        let response: GeminiResponse = serde_json::from_value(json!({
            "candidates": [{
                "content": {
                    "parts": [
                        { "text": "{\"name\":" },
                        { "inlineData": { "mimeType": "image/png", "data": "AA==" } },
                        { "text": "\"Ada\"}" },
                        { "text": "   " }
                    ]
                }
            }]
        }))
        .unwrap();
        assert_eq!(extract_text_from_response(response), "{\"name\":\n\"Ada\"}");
    }

    #[test]
    fn empty_response_yields_empty_text() {
        let response: GeminiResponse = serde_json::from_value(json!({})).unwrap();
        assert_eq!(extract_text_from_response(response), "");
    }

    #[test]
    fn empty_reply_names_block_and_finish_reasons() {
        let blocked: GeminiResponse = serde_json::from_value(json!({
            "promptFeedback": { "blockReason": "SAFETY" }
        }))
        .unwrap();
        assert_eq!(
            describe_empty_reply(&blocked),
            "blockReason=SAFETY, candidates=0, finishReason=none"
        );

        let stopped: GeminiResponse = serde_json::from_value(json!({
            "candidates": [{ "finishReason": "RECITATION" }]
        }))
        .unwrap();
        assert_eq!(
            describe_empty_reply(&stopped),
            "blockReason=none, candidates=1, finishReason=RECITATION"
        );
    }

    #[test]
    fn error_body_prefers_api_message() {
        let (message, _) =
            summarize_error_body(r#"{"error":{"code":400,"message":"API key not valid"}}"#);
        assert_eq!(message.as_deref(), Some("API key not valid"));
        let (message, summary) = summarize_error_body("   ");
        assert!(message.is_none());
        assert_eq!(summary, "empty response body");
    }
}
