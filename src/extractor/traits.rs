use crate::extractor::models::{FetchTarget, StreamChoice, VideoInfo};
use crate::utils::error::Result;
use async_trait::async_trait;
use std::path::PathBuf;

/// Core trait for all video extractors
///
/// This trait is the boundary to the extraction collaborator (yt-dlp, a
/// direct file host, or a test stub). The service never parses site pages
/// itself.
#[async_trait]
pub trait Extractor: Send + Sync {
    /// Returns a unique identifier for this extractor (e.g., "ytdlp", "direct-media")
    fn id(&self) -> &'static str;

    /// Checks if this extractor can handle the given URL
    fn supports(&self, url: &str) -> bool;

    /// Extracts video information, including the available streams
    async fn extract_info(&self, url: &str) -> Result<VideoInfo>;

    /// Downloads the chosen stream into `target.dir` and returns the written file
    async fn fetch(&self, choice: &StreamChoice, target: FetchTarget<'_>) -> Result<PathBuf>;
}
