use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};
use reqwest::multipart::{Form, Part};
use serde::Deserialize;
use tracing::{error, info, warn};

use crate::analysis::AnalysisResult;
use crate::llm::media::{detect_mime_type, to_data_url};
use crate::utils::http::get_http_client;
use crate::view::{render, StadiumView, ViewEvent, ViewState};

pub const DEFAULT_SERVER: &str = "http://localhost:3000";

#[derive(Debug, Clone, PartialEq)]
pub struct PlayArgs {
    pub files: Vec<PathBuf>,
    pub server: String,
}

#[derive(Debug)]
pub struct PlayReport {
    pub matches: usize,
    pub failures: usize,
    pub view: StadiumView,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: Option<String>,
}

fn file_label(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().to_string())
        .unwrap_or_else(|| path.display().to_string())
}

async fn build_preview(bytes: Vec<u8>, mime_type: String) -> Result<String> {
    tokio::task::spawn_blocking(move || to_data_url(&bytes, &mime_type))
        .await
        .map_err(|err| anyhow!("preview task failed: {}", err))
}

async fn submit_image(
    server: &str,
    file_name: String,
    bytes: Vec<u8>,
    mime_type: &str,
) -> Result<AnalysisResult> {
    let part = Part::bytes(bytes).file_name(file_name).mime_str(mime_type)?;
    let form = Form::new().part("image", part);
    let url = format!("{}/api/analyze", server.trim_end_matches('/'));

    let response = get_http_client()
        .post(&url)
        .multipart(form)
        .send()
        .await
        .with_context(|| format!("POST {url} failed"))?;

    let status = response.status();
    if !status.is_success() {
        let detail = response
            .json::<ErrorBody>()
            .await
            .ok()
            .and_then(|body| body.error)
            .unwrap_or_else(|| "no error body".to_string());
        return Err(anyhow!("Analysis failed with status {}: {}", status, detail));
    }

    Ok(response.json::<AnalysisResult>().await?)
}

fn show(view: &mut StadiumView) {
    println!("{}\n", render(view));
    if let Some(alert) = view.take_alert() {
        eprintln!("!! {alert}");
    }
}

/// Plays one upload cycle per file, pressing "play again" between them.
pub async fn run_play(args: PlayArgs) -> Result<PlayReport> {
    if args.files.is_empty() {
        return Err(anyhow!("play needs at least one --file"));
    }

    let mut view = StadiumView::new();
    let mut matches = 0usize;
    let mut failures = 0usize;

    for path in &args.files {
        if view.state() == ViewState::MatchFound {
            view.handle(ViewEvent::ResetRequested)?;
        }

        view.handle(ViewEvent::DragEntered)?;
        show(&mut view);
        let bytes = match tokio::fs::read(path).await {
            Ok(bytes) => bytes,
            Err(err) => {
                error!("Could not read {}: {}", path.display(), err);
                view.handle(ViewEvent::DragLeft)?;
                failures += 1;
                continue;
            }
        };
        let file_name = file_label(path);
        let mime_type =
            detect_mime_type(&bytes).unwrap_or_else(|| "application/octet-stream".to_string());

        view.handle(ViewEvent::FileReceived {
            file_name: file_name.clone(),
        })?;
        show(&mut view);

        let (preview, response) = tokio::join!(
            build_preview(bytes.clone(), mime_type.clone()),
            submit_image(&args.server, file_name.clone(), bytes, &mime_type)
        );

        let outcome = match (preview, response) {
            (Ok(data_url), Ok(result)) => Ok((data_url, result)),
            (_, Err(err)) | (Err(err), _) => Err(err),
        };
        match outcome {
            Ok((data_url, result)) => {
                view.handle(ViewEvent::PreviewReady(data_url))?;
                view.handle(ViewEvent::ResponseReceived(result))?;
                info!(
                    "{} matched {:?}",
                    file_name,
                    view.result().map(|result| &result.match_name)
                );
                matches += 1;
            }
            Err(err) => {
                let detail = format!("{err:#}");
                warn!("{} failed: {}", file_name, detail);
                view.handle(ViewEvent::ResponseFailed(detail))?;
                failures += 1;
            }
        }
        show(&mut view);
    }

    Ok(PlayReport {
        matches,
        failures,
        view,
    })
}
