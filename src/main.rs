//! tubeserve - video download endpoint
//!
//! Accepts a video URL over HTTP, lets yt-dlp resolve and fetch the stream,
//! and sends the file back as an attachment.

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use tubeserve::extractor::YtDlpExtractor;
use tubeserve::utils::ServerSettings;
use tubeserve::{router, AppState, DownloadConfig, DownloadEngine, DownloadService};
use tokio::net::TcpListener;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(version, about)]
struct Args {
    /// JSON settings file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Listen address, overrides the settings file and PORT
    #[arg(long)]
    bind: Option<String>,

    /// Verify that yt-dlp can be found and run, then exit
    #[arg(long)]
    check: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("tubeserve=info,tower_http=info")),
        )
        .init();

    let mut settings =
        ServerSettings::load(args.config.as_deref()).context("loading settings")?;
    if let Some(bind) = args.bind {
        settings.bind = bind;
    }

    if args.check {
        return check_ytdlp(&settings).await;
    }

    let service = DownloadService::from_settings(&settings).context(
        "initializing extractors (install yt-dlp: `pip install yt-dlp` or set YTDLP_PATH)",
    )?;
    let app = router(AppState::new(service), &settings.cors_origins)
        .context("building router")?;

    let listener = TcpListener::bind(&settings.bind)
        .await
        .with_context(|| format!("binding to {}", settings.bind))?;
    info!("tubeserve listening on http://{}", settings.bind);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("running HTTP server")?;

    Ok(())
}

async fn check_ytdlp(settings: &ServerSettings) -> Result<()> {
    let engine = DownloadEngine::new(DownloadConfig::from_settings(
        &settings.http,
        &settings.identity,
    ))?;
    let ytdlp = YtDlpExtractor::new(&settings.extractor, settings.identity.clone(), engine)?;
    let version = ytdlp.version().await.context("running yt-dlp --version")?;
    println!("yt-dlp {} at {}", version, ytdlp.ytdlp_path().display());
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to install Ctrl+C handler: {}", e);
    }
    info!("Shutting down");
}
