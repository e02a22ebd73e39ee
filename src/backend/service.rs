use crate::downloader::{DownloadConfig, DownloadEngine, ScratchDir};
use crate::extractor::{
    select_format, DirectMediaExtractor, Extractor, FetchTarget, HybridExtractor, MediaFormat,
    Quality, StreamChoice, YtDlpExtractor,
};
use crate::utils::config::{RetryPolicy, ServerSettings};
use crate::utils::error::{Result, ServeError};
use crate::utils::filename::{content_type_for_filename, sanitize_stem};
use crate::utils::retry::with_retry;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};

/// One validated download job
#[derive(Debug, Clone)]
pub struct DownloadJob {
    pub url: String,
    pub format: MediaFormat,
    pub quality: Quality,
}

/// A finished download waiting to be streamed back.
///
/// Owns the scratch directory; dropping it removes the file.
#[derive(Debug)]
pub struct PreparedDownload {
    pub scratch: ScratchDir,
    pub path: PathBuf,
    pub filename: String,
    pub content_type: &'static str,
    pub size: u64,
    pub title: String,
    pub duration: Option<f64>,
}

/// Drives extract → select → fetch for a single request.
///
/// Holds no per-request state; one instance is shared by all handlers.
pub struct DownloadService {
    extractor: Arc<dyn Extractor>,
    retry: RetryPolicy,
    scratch_root: Option<PathBuf>,
}

impl DownloadService {
    pub fn new(
        extractor: Arc<dyn Extractor>,
        retry: RetryPolicy,
        scratch_root: Option<PathBuf>,
    ) -> Self {
        Self {
            extractor,
            retry,
            scratch_root,
        }
    }

    /// Wire up the production extractor registry from settings
    pub fn from_settings(settings: &ServerSettings) -> Result<Self> {
        let engine = DownloadEngine::new(DownloadConfig::from_settings(
            &settings.http,
            &settings.identity,
        ))?;

        // 1. Initialize extractors
        let ytdlp = Arc::new(YtDlpExtractor::new(
            &settings.extractor,
            settings.identity.clone(),
            engine.clone(),
        )?);
        let direct = Arc::new(DirectMediaExtractor::new(engine));

        // 2. Build hybrid registry with yt-dlp as the fallback
        let extractors: Vec<Arc<dyn Extractor>> = vec![direct];
        let hybrid = Arc::new(HybridExtractor::new(extractors, ytdlp));

        Ok(Self::new(
            hybrid,
            settings.retry.clone(),
            settings.scratch_root.clone(),
        ))
    }

    /// Resolve, download and stat the requested stream
    pub async fn prepare(&self, job: &DownloadJob) -> Result<PreparedDownload> {
        let scratch = ScratchDir::create(self.scratch_root.as_deref())?;

        let extractor = &self.extractor;
        let url = job.url.as_str();

        let info = with_retry(&self.retry, "extract_info", move |attempt| {
            if attempt > 1 {
                info!("Re-extracting {} (attempt {})", url, attempt);
            }
            extractor.extract_info(url)
        })
        .await?;

        let format = select_format(&info.formats, job.format, job.quality)
            .cloned()
            .ok_or_else(|| {
                ServeError::NoMatchingStream(format!(
                    "no {} stream available for {}",
                    job.format, job.url
                ))
            })?;
        info!(
            "Selected format {} ({}, height {:?}) for \"{}\"",
            format.format_id, format.ext, format.height, info.title
        );

        let choice = StreamChoice {
            source_url: job.url.clone(),
            format,
            media: job.format,
            extractor: info.extractor.clone(),
        };
        let stem = sanitize_stem(&info.title);
        let target = FetchTarget {
            dir: scratch.path(),
            stem: &stem,
        };

        let choice = &choice;
        let path = with_retry(&self.retry, "fetch", move |_| async move {
            clear_dir(target.dir).await;
            extractor.fetch(choice, target).await
        })
        .await?;

        let metadata = match tokio::fs::metadata(&path).await {
            Ok(m) if m.is_file() => m,
            _ => return Err(ServeError::FileNotFound(stem)),
        };

        let filename = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| format!("{}.{}", stem, job.format));

        Ok(PreparedDownload {
            content_type: content_type_for_filename(&filename),
            filename,
            size: metadata.len(),
            path,
            title: info.title,
            duration: info.duration,
            scratch,
        })
    }
}

/// Drop leftovers of a failed attempt before retrying
async fn clear_dir(dir: &std::path::Path) {
    let Ok(mut entries) = tokio::fs::read_dir(dir).await else {
        return;
    };
    while let Ok(Some(entry)) = entries.next_entry().await {
        if let Err(e) = tokio::fs::remove_file(entry.path()).await {
            warn!("Could not clear {:?}: {}", entry.path(), e);
        }
    }
}
