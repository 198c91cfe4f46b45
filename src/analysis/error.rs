use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

#[derive(Debug, thiserror::Error)]
pub enum AnalysisError {
    #[error("No image provided")]
    BadRequest,
    #[error("Unsupported image type")]
    UnsupportedMediaType,
    #[error("Image too large")]
    PayloadTooLarge,
    #[error("API key not configured")]
    ConfigurationError,
    #[error("Failed to parse AI response")]
    UpstreamParseError,
    #[error("Internal Server Error")]
    InternalError(#[source] anyhow::Error),
}

impl AnalysisError {
    pub fn status(&self) -> StatusCode {
        match self {
            AnalysisError::BadRequest | AnalysisError::UnsupportedMediaType => {
                StatusCode::BAD_REQUEST
            }
            AnalysisError::PayloadTooLarge => StatusCode::PAYLOAD_TOO_LARGE,
            AnalysisError::ConfigurationError
            | AnalysisError::UpstreamParseError
            | AnalysisError::InternalError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<anyhow::Error> for AnalysisError {
    fn from(err: anyhow::Error) -> Self {
        AnalysisError::InternalError(err)
    }
}

impl IntoResponse for AnalysisError {
    fn into_response(self) -> Response {
        (self.status(), Json(json!({ "error": self.to_string() }))).into_response()
    }
}
