use std::error::Error;
use std::path::PathBuf;

use anyhow::anyhow;
use dotenvy::dotenv;
use tracing::{info, warn};

mod analysis;
mod client;
mod config;
mod handlers;
mod llm;
mod state;
mod tools;
mod utils;
mod view;

use client::{run_play, PlayArgs, DEFAULT_SERVER};
use config::{CONFIG, GEMINI_API_KEY_VAR};
use handlers::build_router;
use state::{AnalyzerSettings, AppState};
use utils::logging::init_logging;

type MainResult = Result<(), Box<dyn Error + Send + Sync>>;

#[derive(Debug, PartialEq)]
enum Mode {
    Serve,
    Play(PlayArgs),
}

fn usage() -> &'static str {
    "Usage: lookalike_cam [serve] | lookalike_cam play --file <path> [--file <path> ...] [--server <url>]"
}

fn parse_args(args: &[String]) -> anyhow::Result<Mode> {
    match args.get(1).map(|value| value.as_str()) {
        None | Some("serve") => {
            if args.len() > 2 {
                return Err(anyhow!("serve takes no arguments\n{}", usage()));
            }
            Ok(Mode::Serve)
        }
        Some("play") => {
            let mut files = Vec::new();
            let mut server = DEFAULT_SERVER.to_string();

            let mut index = 2;
            while index < args.len() {
                match args[index].as_str() {
                    "--file" | "-f" => {
                        index += 1;
                        let value = args
                            .get(index)
                            .ok_or_else(|| anyhow!("Missing value for --file"))?;
                        files.push(PathBuf::from(value));
                    }
                    "--server" | "-s" => {
                        index += 1;
                        server = args
                            .get(index)
                            .ok_or_else(|| anyhow!("Missing value for --server"))?
                            .clone();
                    }
                    "--help" | "-h" => return Err(anyhow!(usage())),
                    other => {
                        return Err(anyhow!("Unknown play argument: {other}\n{}", usage()));
                    }
                }
                index += 1;
            }

            if files.is_empty() {
                return Err(anyhow!("--file is required\n{}", usage()));
            }
            Ok(Mode::Play(PlayArgs { files, server }))
        }
        Some("--help") | Some("-h") => Err(anyhow!(usage())),
        Some(other) => Err(anyhow!("Unknown command: {other}\n{}", usage())),
    }
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for Ctrl+C: {err}");
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}

async fn serve() -> MainResult {
    let settings = AnalyzerSettings::from_config(&CONFIG);
    if settings.resolve_api_key().is_none() {
        warn!(
            "{} is not set; /api/analyze will answer 500 until it is",
            GEMINI_API_KEY_VAR
        );
    }
    info!(
        "Using model {} and lookup endpoint {}",
        settings.gemini.model, settings.wiki.endpoint
    );

    let app = build_router(AppState::new(settings));
    let addr = format!("{}:{}", CONFIG.host, CONFIG.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("Lookalike Cam listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

#[tokio::main]
async fn main() -> MainResult {
    dotenv().ok();
    let _guards = init_logging();

    let args: Vec<String> = std::env::args().collect();
    match parse_args(&args)? {
        Mode::Serve => serve().await,
        Mode::Play(play_args) => {
            let report = run_play(play_args).await?;
            info!(
                "Play summary: matches={} failures={} final_state={}",
                report.matches,
                report.failures,
                report.view.state().as_str()
            );
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(values: &[&str]) -> Vec<String> {
        values.iter().map(|value| value.to_string()).collect()
    }

    #[test]
    fn defaults_to_serve() {
        assert_eq!(parse_args(&args(&["lookalike_cam"])).unwrap(), Mode::Serve);
        assert_eq!(
            parse_args(&args(&["lookalike_cam", "serve"])).unwrap(),
            Mode::Serve
        );
    }

    #[test]
    fn parses_play_files_and_server() {
        let mode = parse_args(&args(&[
            "lookalike_cam",
            "play",
            "--file",
            "a.png",
            "-f",
            "b.jpg",
            "--server",
            "http://cam:8080",
        ]))
        .unwrap();
        assert_eq!(
            mode,
            Mode::Play(PlayArgs {
                files: vec![PathBuf::from("a.png"), PathBuf::from("b.jpg")],
                server: "http://cam:8080".to_string(),
            })
        );
    }

    #[test]
    fn play_requires_a_file() {
        let err = parse_args(&args(&["lookalike_cam", "play"])).unwrap_err();
        assert!(err.to_string().starts_with("--file is required"));
        assert!(parse_args(&args(&["lookalike_cam", "play", "--file"])).is_err());
        assert!(parse_args(&args(&["lookalike_cam", "dance"])).is_err());
    }
}
