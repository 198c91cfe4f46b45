use std::time::Instant;

use chrono::{DateTime, Utc};
use serde_json::Value as JsonValue;
use tracing::info;

pub const TIMING_TARGET: &str = "lookalike.timing";

#[derive(Debug)]
pub struct RequestTimer {
    route: String,
    image_bytes: Option<usize>,
    mime_type: Option<String>,
    started_at: DateTime<Utc>,
    started_perf: Instant,
    status: u16,
    detail: Option<String>,
    completed: bool,
}

impl RequestTimer {
    pub fn new(route: &str) -> Self {
        RequestTimer {
            route: route.to_string(),
            image_bytes: None,
            mime_type: None,
            started_at: Utc::now(),
            started_perf: Instant::now(),
            status: 200,
            detail: None,
            completed: false,
        }
    }

    pub fn log_received(&self) {
        info!(
            target: TIMING_TARGET,
            "event=request_received route={} received_at={}",
            self.route,
            self.started_at.to_rfc3339()
        );
    }

    pub fn record_image(&mut self, image_bytes: usize, mime_type: &str) {
        self.image_bytes = Some(image_bytes);
        self.mime_type = Some(mime_type.to_string());
    }

    pub fn mark_status(&mut self, status: u16, detail: Option<String>) {
        self.status = status;
        self.detail = detail;
    }

    pub fn log_completed(&mut self) {
        if self.completed {
            return;
        }
        self.completed = true;
        let completed_at = Utc::now();
        let duration = self.started_perf.elapsed().as_secs_f64();
        info!(
            target: TIMING_TARGET,
            "event=request_completed route={} image_bytes={:?} mime_type={:?} started_at={} response_sent_at={} duration_s={:.3} status={} detail={}",
            self.route,
            self.image_bytes,
            self.mime_type,
            self.started_at.to_rfc3339(),
            completed_at.to_rfc3339(),
            duration,
            self.status,
            self.detail.clone().unwrap_or_default()
        );
    }
}

impl Drop for RequestTimer {
    fn drop(&mut self) {
        self.log_completed();
    }
}

pub fn start_request_timer(route: &str) -> RequestTimer {
    let timer = RequestTimer::new(route);
    timer.log_received();
    timer
}

pub async fn log_upstream_timing<T, F, Fut>(
    provider: &str,
    operation: &str,
    metadata: Option<JsonValue>,
    call: F,
) -> Result<T, anyhow::Error>
where
    F: FnOnce() -> Fut,
    Fut: std::future::Future<Output = Result<T, anyhow::Error>>,
{
    let started_at = Utc::now();
    let started_perf = Instant::now();
    let metadata_text = metadata
        .as_ref()
        .map(|value| value.to_string())
        .unwrap_or_else(|| "{}".to_string());
    info!(
        target: TIMING_TARGET,
        "event=upstream_request provider={} operation={} started_at={} metadata={}",
        provider,
        operation,
        started_at.to_rfc3339(),
        metadata_text
    );

    let result = call().await;
    let status = if result.is_ok() { "success" } else { "error" };

    let completed_at = Utc::now();
    let duration = started_perf.elapsed().as_secs_f64();
    info!(
        target: TIMING_TARGET,
        "event=upstream_response provider={} operation={} completed_at={} duration_s={:.3} status={} metadata={}",
        provider,
        operation,
        completed_at.to_rfc3339(),
        duration,
        status,
        metadata_text
    );

    result
}
