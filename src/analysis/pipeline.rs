use tracing::{error, info, warn};

use crate::analysis::error::AnalysisError;
use crate::analysis::types::{AnalysisRequest, AnalysisResult};
use crate::analysis::verdict::parse_verdict;
use crate::config::LOOKALIKE_PROMPT;
use crate::llm::gemini::{call_gemini_vision, truncate_for_log};
use crate::llm::media::resolve_image_mime;
use crate::state::AnalyzerSettings;
use crate::tools::wikipedia::fetch_thumbnail_url;

/// Checks the upload and returns the MIME type to forward upstream.
pub fn validate_request(
    settings: &AnalyzerSettings,
    request: &AnalysisRequest,
) -> Result<String, AnalysisError> {
    if request.bytes.is_empty() {
        return Err(AnalysisError::BadRequest);
    }
    if request.bytes.len() > settings.max_upload_bytes {
        warn!(
            "Rejecting upload of {} bytes (limit {})",
            request.bytes.len(),
            settings.max_upload_bytes
        );
        return Err(AnalysisError::PayloadTooLarge);
    }
    resolve_image_mime(request.declared_mime_type.as_deref(), &request.bytes).ok_or_else(|| {
        warn!(
            "Rejecting upload {:?} with declared type {:?}",
            request.file_name, request.declared_mime_type
        );
        AnalysisError::UnsupportedMediaType
    })
}

/// Runs the whole lookalike pipeline once. Each stage only runs when the
/// previous one succeeded.
pub async fn analyze(
    settings: &AnalyzerSettings,
    request: AnalysisRequest,
) -> Result<AnalysisResult, AnalysisError> {
    let mime_type = validate_request(settings, &request)?;

    let Some(api_key) = settings.resolve_api_key() else {
        error!("{} is not set; cannot call Gemini", settings.api_key_var);
        return Err(AnalysisError::ConfigurationError);
    };

    let raw_reply = call_gemini_vision(
        &settings.gemini,
        &api_key,
        LOOKALIKE_PROMPT,
        &request.bytes,
        &mime_type,
    )
    .await?;

    let verdict = parse_verdict(&raw_reply).map_err(|err| {
        error!(
            "JSON parse error: {} (reply: {})",
            err,
            truncate_for_log(&raw_reply, 1000)
        );
        AnalysisError::UpstreamParseError
    })?;
    info!("Model picked '{}' as the lookalike", verdict.name);

    let match_image_url = fetch_thumbnail_url(&settings.wiki, &verdict.name).await?;
    if match_image_url.is_none() {
        info!("No Wikipedia thumbnail for '{}'", verdict.name);
    }

    Ok(AnalysisResult::from_verdict(verdict, match_image_url))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::GeminiSettings;
    use crate::tools::wikipedia::WikiSettings;

    const PNG_BYTES: &[u8] = &[
        0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A, 0x00, 0x00, 0x00, 0x0D, b'I', b'H', b'D',
        b'R',
    ];

    fn settings(api_key_var: &str) -> AnalyzerSettings {
        AnalyzerSettings {
            api_key_var: api_key_var.to_string(),
            max_upload_bytes: 64,
            gemini: GeminiSettings {
                base_url: "http://127.0.0.1:9".to_string(),
                model: "gemini-test".to_string(),
                temperature: 1.0,
                safety_settings: "standard".to_string(),
            },
            wiki: WikiSettings {
                endpoint: "http://127.0.0.1:9/w/api.php".to_string(),
                thumbnail_size: 500,
            },
        }
    }

    #[test]
    fn empty_upload_counts_as_missing() {
        let request = AnalysisRequest::new(Vec::new(), Some("image/png".to_string()));
        assert!(matches!(
            validate_request(&settings("UNUSED"), &request),
            Err(AnalysisError::BadRequest)
        ));
    }

    #[test]
    fn oversized_upload_is_rejected() {
        let request = AnalysisRequest::new(vec![0u8; 65], Some("image/png".to_string()));
        assert!(matches!(
            validate_request(&settings("UNUSED"), &request),
            Err(AnalysisError::PayloadTooLarge)
        ));
    }

    #[test]
    fn non_image_upload_is_rejected() {
        let request = AnalysisRequest::new(b"plain text".to_vec(), Some("text/plain".to_string()));
        assert!(matches!(
            validate_request(&settings("UNUSED"), &request),
            Err(AnalysisError::UnsupportedMediaType)
        ));
    }

    #[test]
    fn sniffed_png_is_accepted_without_declared_type() {
        let request = AnalysisRequest::new(PNG_BYTES.to_vec(), None);
        assert_eq!(
            validate_request(&settings("UNUSED"), &request).unwrap(),
            "image/png"
        );
    }

    #[tokio::test]
    async fn missing_credential_stops_before_any_upstream_call() {
        let request = AnalysisRequest::new(PNG_BYTES.to_vec(), Some("image/png".to_string()));
        let result = analyze(&settings("LOOKALIKE_TEST_PIPELINE_KEY_NEVER_SET"), request).await;
        assert!(matches!(result, Err(AnalysisError::ConfigurationError)));
    }

    #[tokio::test]
    async fn blank_credential_counts_as_missing() {
        std::env::set_var("LOOKALIKE_TEST_PIPELINE_KEY_BLANK", "   ");
        let request = AnalysisRequest::new(PNG_BYTES.to_vec(), Some("image/png".to_string()));
        let result = analyze(&settings("LOOKALIKE_TEST_PIPELINE_KEY_BLANK"), request).await;
        assert!(matches!(result, Err(AnalysisError::ConfigurationError)));
    }
}
