use serde::{Deserialize, Serialize};

/// One uploaded image as received from the client.
#[derive(Debug, Clone)]
pub struct AnalysisRequest {
    pub bytes: Vec<u8>,
    pub declared_mime_type: Option<String>,
    pub file_name: Option<String>,
}

impl AnalysisRequest {
    pub fn new(bytes: Vec<u8>, declared_mime_type: Option<String>) -> Self {
        AnalysisRequest {
            bytes,
            declared_mime_type,
            file_name: None,
        }
    }

    pub fn with_file_name(mut self, file_name: Option<String>) -> Self {
        self.file_name = file_name;
        self
    }
}

/// What the model is asked to answer with.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct AiVerdict {
    pub name: String,
    pub reason: String,
    pub funny_comment: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisResult {
    pub match_name: String,
    pub match_reason: String,
    pub match_comment: String,
    pub match_image_url: Option<String>,
}

impl AnalysisResult {
    pub fn from_verdict(verdict: AiVerdict, match_image_url: Option<String>) -> Self {
        AnalysisResult {
            match_name: verdict.name,
            match_reason: verdict.reason,
            match_comment: verdict.funny_comment,
            match_image_url,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn result_serializes_with_camel_case_and_null_image() {
        let result = AnalysisResult::from_verdict(
            AiVerdict {
                name: "Ada Lovelace".to_string(),
                reason: "Same gaze".to_string(),
                funny_comment: "Compute that!".to_string(),
            },
            None,
        );
        assert_eq!(
            serde_json::to_value(&result).unwrap(),
            json!({
                "matchName": "Ada Lovelace",
                "matchReason": "Same gaze",
                "matchComment": "Compute that!",
                "matchImageUrl": null
            })
        );
    }
}
