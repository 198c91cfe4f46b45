use anyhow::anyhow;
use axum::extract::multipart::{MultipartError, MultipartRejection};
use axum::extract::{Multipart, State};
use axum::http::StatusCode;
use axum::Json;
use tracing::{error, info, warn};

use crate::analysis::{analyze, AnalysisError, AnalysisRequest, AnalysisResult};
use crate::state::AppState;
use crate::utils::timing::{start_request_timer, RequestTimer};

pub const ANALYZE_ROUTE: &str = "/api/analyze";
pub const IMAGE_FIELD: &str = "image";

fn multipart_error(err: MultipartError) -> AnalysisError {
    warn!("Failed to read multipart body: {}", err.body_text());
    if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        AnalysisError::PayloadTooLarge
    } else {
        AnalysisError::BadRequest
    }
}

async fn read_image_field(mut multipart: Multipart) -> Result<Option<AnalysisRequest>, AnalysisError> {
    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        if field.name() != Some(IMAGE_FIELD) {
            continue;
        }
        let content_type = field.content_type().map(|value| value.to_string());
        let file_name = field.file_name().map(|value| value.to_string());
        let bytes = field.bytes().await.map_err(multipart_error)?;
        return Ok(Some(
            AnalysisRequest::new(bytes.to_vec(), content_type).with_file_name(file_name),
        ));
    }
    Ok(None)
}

async fn run_analysis(
    state: AppState,
    multipart: Result<Multipart, MultipartRejection>,
    timer: &mut RequestTimer,
) -> Result<AnalysisResult, AnalysisError> {
    let multipart = multipart.map_err(|rejection| {
        warn!("Rejected non-multipart upload: {}", rejection);
        AnalysisError::BadRequest
    })?;
    let request = read_image_field(multipart)
        .await?
        .ok_or(AnalysisError::BadRequest)?;
    timer.record_image(
        request.bytes.len(),
        request.declared_mime_type.as_deref().unwrap_or("unknown"),
    );

    let settings = state.settings.clone();
    let task = tokio::spawn(async move { analyze(&settings, request).await });
    match task.await {
        Ok(outcome) => outcome,
        Err(err) => Err(AnalysisError::InternalError(anyhow!(
            "analysis task failed: {}",
            err
        ))),
    }
}

pub async fn analyze_image(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<AnalysisResult>, AnalysisError> {
    let mut timer = start_request_timer(ANALYZE_ROUTE);
    let outcome = run_analysis(state, multipart, &mut timer).await;

    match &outcome {
        Ok(result) => {
            info!(
                "Analysis matched '{}' (image: {})",
                result.match_name,
                result.match_image_url.is_some()
            );
            timer.mark_status(StatusCode::OK.as_u16(), None);
        }
        Err(err) => {
            match err {
                AnalysisError::InternalError(source) => error!("Analysis Error: {:#}", source),
                other => warn!("Analysis rejected: {}", other),
            }
            timer.mark_status(err.status().as_u16(), Some(err.to_string()));
        }
    }
    timer.log_completed();

    outcome.map(Json)
}
