use crate::downloader::DownloadEngine;
use crate::extractor::models::{FetchTarget, Format, StreamChoice, VideoInfo};
use crate::extractor::traits::Extractor;
use crate::utils::error::{Result, ServeError};
use async_trait::async_trait;
use std::path::PathBuf;
use tracing::info;
use url::Url;

const VIDEO_EXTENSIONS: &[&str] = &["mp4", "webm", "mov", "mkv"];
const AUDIO_EXTENSIONS: &[&str] = &["mp3", "m4a", "ogg", "opus", "wav", "flac"];

/// Extractor for URLs that already point at a media file.
///
/// The URL itself is the only stream; no page is inspected.
pub struct DirectMediaExtractor {
    engine: DownloadEngine,
}

impl DirectMediaExtractor {
    pub fn new(engine: DownloadEngine) -> Self {
        Self { engine }
    }
}

fn media_extension(url: &str) -> Option<String> {
    let parsed = Url::parse(url).ok()?;
    let last = parsed.path_segments()?.next_back()?.to_string();
    let (_, ext) = last.rsplit_once('.')?;
    let ext = ext.to_ascii_lowercase();
    let known =
        VIDEO_EXTENSIONS.contains(&ext.as_str()) || AUDIO_EXTENSIONS.contains(&ext.as_str());
    known.then_some(ext)
}

fn title_from_url(url: &str) -> String {
    Url::parse(url)
        .ok()
        .and_then(|u| {
            let last = u.path_segments()?.next_back()?.to_string();
            let decoded = urlencoding::decode(&last).ok()?.into_owned();
            decoded.rsplit_once('.').map(|(stem, _)| stem.to_string())
        })
        .filter(|t| !t.trim().is_empty())
        .unwrap_or_else(|| "download".to_string())
}

#[async_trait]
impl Extractor for DirectMediaExtractor {
    fn id(&self) -> &'static str {
        "direct-media"
    }

    fn supports(&self, url: &str) -> bool {
        media_extension(url).is_some()
    }

    async fn extract_info(&self, url: &str) -> Result<VideoInfo> {
        let ext = media_extension(url)
            .ok_or_else(|| ServeError::ExtractionError(format!("not a media file URL: {}", url)))?;
        info!("Serving {} as a direct .{} file", url, ext);

        let is_video = VIDEO_EXTENSIONS.contains(&ext.as_str());
        let format = Format {
            format_id: "direct".to_string(),
            ext: ext.clone(),
            url: url.to_string(),
            protocol: Some("https".to_string()),
            vcodec: Some(if is_video { "unknown" } else { "none" }.to_string()),
            acodec: Some("unknown".to_string()),
            ..Default::default()
        };

        Ok(VideoInfo {
            id: title_from_url(url),
            title: title_from_url(url),
            url: url.to_string(),
            extractor: Some(self.id().to_string()),
            formats: vec![format],
            ..Default::default()
        })
    }

    async fn fetch(&self, choice: &StreamChoice, target: FetchTarget<'_>) -> Result<PathBuf> {
        let path = target.path_with_ext(&choice.format.ext);
        self.engine
            .download(&choice.format.url, &choice.format.http_headers, &path)
            .await?;
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::downloader::DownloadConfig;
    use crate::extractor::models::{MediaFormat, Quality};
    use crate::extractor::selector::select_format;

    fn extractor() -> DirectMediaExtractor {
        DirectMediaExtractor::new(DownloadEngine::new(DownloadConfig::default()).unwrap())
    }

    #[test]
    fn test_supports_media_urls_only() {
        let ex = extractor();
        assert!(ex.supports("https://cdn.example/files/clip.MP4?sig=1"));
        assert!(ex.supports("https://cdn.example/a/song.mp3"));
        assert!(!ex.supports("https://www.youtube.com/watch?v=abc123"));
        assert!(!ex.supports("https://youtu.be/abc123"));
        assert!(!ex.supports("not a url"));
    }

    #[tokio::test]
    async fn test_single_stream_is_selectable() {
        let ex = extractor();
        let info = ex
            .extract_info("https://cdn.example/files/My%20Clip.mp4")
            .await
            .unwrap();
        assert_eq!(info.title, "My Clip");
        let f = select_format(&info.formats, MediaFormat::Mp4, Quality::Highest).unwrap();
        assert_eq!(f.ext, "mp4");

        let audio = ex.extract_info("https://cdn.example/song.mp3").await.unwrap();
        assert!(select_format(&audio.formats, MediaFormat::Mp3, Quality::Lowest).is_some());
        assert!(select_format(&audio.formats, MediaFormat::Mp4, Quality::Lowest).is_none());
    }
}
