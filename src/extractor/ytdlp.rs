//! yt-dlp wrapper for video extraction
//!
//! yt-dlp is the extraction collaborator: it resolves page URLs into stream
//! lists and handles manifest downloads and audio conversion. Plain HTTP
//! streams are fetched by the Rust download engine instead.

use crate::downloader::DownloadEngine;
use crate::extractor::models::{FetchTarget, MediaFormat, StreamChoice, VideoInfo};
use crate::extractor::traits::Extractor;
use crate::utils::config::{ExtractorSettings, RequestIdentity};
use crate::utils::error::{Result, ServeError};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::process::Output;
use std::time::Duration;
use tokio::process::Command as AsyncCommand;
use tracing::{debug, error, info, warn};

/// Video extractor backed by the yt-dlp executable
pub struct YtDlpExtractor {
    ytdlp_path: PathBuf,
    identity: RequestIdentity,
    timeout: Duration,
    convert_audio: bool,
    engine: DownloadEngine,
}

impl YtDlpExtractor {
    /// Initialize extractor and verify yt-dlp availability
    ///
    /// Search order:
    /// 1. Configured path
    /// 2. System PATH
    /// 3. Common installation paths (Homebrew, pip --user, etc.)
    pub fn new(
        settings: &ExtractorSettings,
        identity: RequestIdentity,
        engine: DownloadEngine,
    ) -> Result<Self> {
        let ytdlp_path = match find_ytdlp(settings.ytdlp_path.as_deref()) {
            Some(path) => {
                info!("Found yt-dlp at: {}", path.display());
                path
            }
            None => {
                error!("yt-dlp not found anywhere!");
                return Err(ServeError::YtDlpNotFound);
            }
        };

        Ok(Self {
            ytdlp_path,
            identity,
            timeout: settings.timeout(),
            convert_audio: settings.convert_audio,
            engine,
        })
    }

    /// Get the path to yt-dlp being used
    pub fn ytdlp_path(&self) -> &Path {
        &self.ytdlp_path
    }

    /// Report the yt-dlp version string
    pub async fn version(&self) -> Result<String> {
        let output = self.run(vec!["--version".to_string()]).await?;
        Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
    }

    /// Run yt-dlp with identity flags prepended, bounded by the configured timeout
    async fn run(&self, args: Vec<String>) -> Result<Output> {
        let mut full_args = identity_args(&self.identity);
        full_args.extend(args);
        debug!("Running {} {:?}", self.ytdlp_path.display(), full_args);

        let mut cmd = AsyncCommand::new(&self.ytdlp_path);
        cmd.args(&full_args).kill_on_drop(true);

        let output = match tokio::time::timeout(self.timeout, cmd.output()).await {
            Ok(result) => result?,
            Err(_) => {
                warn!("yt-dlp exceeded {:?}, killed", self.timeout);
                return Err(ServeError::Transient(format!(
                    "yt-dlp timed out after {}s",
                    self.timeout.as_secs()
                )));
            }
        };

        if !output.status.success() {
            let error_msg = String::from_utf8_lossy(&output.stderr);
            error!("yt-dlp failed: {}", error_msg.trim());
            return Err(ServeError::from_upstream_message(&last_error_line(&error_msg)));
        }

        Ok(output)
    }

    async fn fetch_with_ytdlp(
        &self,
        choice: &StreamChoice,
        target: FetchTarget<'_>,
    ) -> Result<PathBuf> {
        let args = build_fetch_args(choice, target, self.convert_audio);
        let output = self.run(args).await?;
        let stdout = String::from_utf8_lossy(&output.stdout);

        if let Some(printed) = parse_printed_path(&stdout) {
            if printed.starts_with(target.dir) && printed.is_file() {
                return Ok(printed);
            }
            warn!("yt-dlp reported unexpected path {:?}", printed);
        }

        find_written_file(target.dir, target.stem)
            .await?
            .ok_or_else(|| ServeError::FileNotFound(target.stem.to_string()))
    }
}

#[async_trait]
impl Extractor for YtDlpExtractor {
    fn id(&self) -> &'static str {
        "ytdlp"
    }

    fn supports(&self, url: &str) -> bool {
        url.starts_with("http://") || url.starts_with("https://")
    }

    /// Uses: yt-dlp --dump-json --no-download
    async fn extract_info(&self, url: &str) -> Result<VideoInfo> {
        debug!("Extracting video info for URL: {}", url);

        let output = self
            .run(vec![
                "--dump-json".to_string(),
                "--no-download".to_string(),
                "--no-playlist".to_string(),
                "--no-warnings".to_string(),
                url.to_string(),
            ])
            .await?;

        let json_str = String::from_utf8_lossy(&output.stdout);
        let video_info: VideoInfo = serde_json::from_str(json_str.trim()).map_err(|e| {
            ServeError::ExtractionError(format!("unreadable yt-dlp output: {}", e))
        })?;

        Ok(video_info)
    }

    async fn fetch(&self, choice: &StreamChoice, target: FetchTarget<'_>) -> Result<PathBuf> {
        let needs_conversion = choice.media == MediaFormat::Mp3 && self.convert_audio;

        if choice.format.is_direct_http() && !needs_conversion {
            let path = target.path_with_ext(&choice.format.ext);
            self.engine
                .download(&choice.format.url, &choice.format.http_headers, &path)
                .await?;
            return Ok(path);
        }

        debug!(
            "Handing format {} of {} to yt-dlp",
            choice.format.format_id, choice.source_url
        );
        self.fetch_with_ytdlp(choice, target).await
    }
}

/// Flags carrying the configured request identity
pub fn identity_args(identity: &RequestIdentity) -> Vec<String> {
    let mut args = vec!["--user-agent".to_string(), identity.effective_user_agent()];
    for (name, value) in &identity.headers {
        args.push("--add-header".to_string());
        args.push(format!("{}:{}", name, value));
    }
    if let Some(cookies) = &identity.cookies_file {
        args.push("--cookies".to_string());
        args.push(cookies.to_string_lossy().to_string());
    }
    args
}

/// Arguments for downloading one chosen stream through yt-dlp
pub fn build_fetch_args(
    choice: &StreamChoice,
    target: FetchTarget<'_>,
    convert_audio: bool,
) -> Vec<String> {
    // yt-dlp treats '%' in -o as a template marker
    let stem = target.stem.replace('%', "%%");
    let template = target.dir.join(format!("{}.%(ext)s", stem));

    let mut args = vec![
        "--no-playlist".to_string(),
        "--no-warnings".to_string(),
        "--no-progress".to_string(),
        "--print".to_string(),
        "after_move:filepath".to_string(),
        "-f".to_string(),
        choice.format.format_id.clone(),
        "-o".to_string(),
        template.to_string_lossy().to_string(),
    ];

    if choice.media == MediaFormat::Mp3 && convert_audio {
        args.extend([
            "-x".to_string(),
            "--audio-format".to_string(),
            "mp3".to_string(),
            "--audio-quality".to_string(),
            "0".to_string(),
        ]);
    }

    args.push(choice.source_url.clone());
    args
}

/// Last non-empty stdout line printed by `--print after_move:filepath`
pub fn parse_printed_path(stdout: &str) -> Option<PathBuf> {
    stdout
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .last()
        .map(PathBuf::from)
}

fn last_error_line(stderr: &str) -> String {
    stderr
        .lines()
        .map(str::trim)
        .filter(|line| line.starts_with("ERROR"))
        .last()
        .or_else(|| stderr.lines().map(str::trim).filter(|l| !l.is_empty()).last())
        .unwrap_or("yt-dlp exited with an error")
        .to_string()
}

async fn find_written_file(dir: &Path, stem: &str) -> Result<Option<PathBuf>> {
    let mut entries = tokio::fs::read_dir(dir).await?;
    while let Some(entry) = entries.next_entry().await? {
        let path = entry.path();
        let matches_stem = path
            .file_stem()
            .map(|s| s.to_string_lossy() == stem)
            .unwrap_or(false);
        let partial = path
            .extension()
            .map(|e| e == "part" || e == "ytdl")
            .unwrap_or(false);
        if matches_stem && !partial && path.is_file() {
            return Ok(Some(path));
        }
    }
    Ok(None)
}

// ============================================================
// yt-dlp Detection Functions
// ============================================================

/// Find yt-dlp binary with priority:
/// 1. Configured path
/// 2. System PATH
/// 3. Common installation paths
pub fn find_ytdlp(configured: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = configured {
        if path.is_file() && is_executable(path) {
            info!("✓ Using configured yt-dlp: {:?}", path);
            return Some(path.to_path_buf());
        }
        warn!("Configured yt-dlp {:?} is missing or not executable", path);
    }

    if let Ok(system) = which::which("yt-dlp") {
        info!("✓ Using system yt-dlp: {:?}", system);
        return Some(system);
    }

    if let Some(common) = find_in_common_paths() {
        info!("✓ Using yt-dlp from common path: {:?}", common);
        return Some(common);
    }

    warn!("✗ yt-dlp not found anywhere!");
    None
}

/// Find yt-dlp in common installation paths
fn find_in_common_paths() -> Option<PathBuf> {
    let common_paths = [
        // macOS Homebrew (Apple Silicon)
        "/opt/homebrew/bin/yt-dlp",
        // macOS Homebrew (Intel)
        "/usr/local/bin/yt-dlp",
        // System
        "/usr/bin/yt-dlp",
        // pip --user
        "~/.local/bin/yt-dlp",
    ];

    for path_str in common_paths {
        let expanded = match path_str.strip_prefix("~/") {
            Some(rest) => match dirs::home_dir() {
                Some(home) => home.join(rest),
                None => continue,
            },
            None => PathBuf::from(path_str),
        };

        if expanded.is_file() && is_executable(&expanded) {
            return Some(expanded);
        }
    }

    None
}

/// Check if a file is executable
fn is_executable(path: &Path) -> bool {
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;

        std::fs::metadata(path)
            .map(|metadata| metadata.permissions().mode() & 0o111 != 0)
            .unwrap_or(false)
    }

    #[cfg(not(unix))]
    {
        path.exists()
    }
}

// ============================================================
// Tests
// ============================================================
