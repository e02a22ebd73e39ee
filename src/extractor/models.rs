//! Data structures for video information

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::path::Path;

/// Video information structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct VideoInfo {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default, alias = "webpage_url")]
    pub url: String,
    #[serde(default)]
    pub duration: Option<f64>,
    pub uploader: Option<String>,
    pub view_count: Option<u64>,
    pub extractor: Option<String>,
    #[serde(default)]
    pub formats: Vec<Format>,
}

/// Video format information
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Format {
    pub format_id: String,
    #[serde(default)]
    pub ext: String,
    #[serde(default)]
    pub url: String,
    pub protocol: Option<String>,
    pub resolution: Option<String>,
    pub filesize: Option<u64>,
    pub filesize_approx: Option<u64>,
    pub fps: Option<f32>,
    pub vcodec: Option<String>,
    pub acodec: Option<String>,
    pub format_note: Option<String>,
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub tbr: Option<f32>, // Total bitrate
    pub vbr: Option<f32>, // Video bitrate
    pub abr: Option<f32>, // Audio bitrate
    #[serde(default)]
    pub http_headers: HashMap<String, String>,
}

impl Format {
    pub fn has_video(&self) -> bool {
        codec_present(self.vcodec.as_deref())
    }

    pub fn has_audio(&self) -> bool {
        codec_present(self.acodec.as_deref())
    }

    /// Video and audio in a single stream
    pub fn is_progressive(&self) -> bool {
        self.has_video() && self.has_audio()
    }

    pub fn is_audio_only(&self) -> bool {
        !self.has_video() && self.has_audio()
    }

    /// Whether the stream is a plain HTTP(S) file rather than an HLS/DASH manifest
    pub fn is_direct_http(&self) -> bool {
        let protocol_ok = match self.protocol.as_deref() {
            None => true,
            Some(p) => matches!(p, "http" | "https"),
        };
        protocol_ok
            && (self.url.starts_with("http://") || self.url.starts_with("https://"))
            && !self.url.contains(".m3u8")
            && !self.url.contains(".mpd")
    }
}

fn codec_present(codec: Option<&str>) -> bool {
    matches!(codec, Some(c) if !c.is_empty() && c != "none")
}

/// Requested container family
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaFormat {
    #[default]
    Mp4,
    Mp3,
}

impl MediaFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            MediaFormat::Mp4 => "mp4",
            MediaFormat::Mp3 => "mp3",
        }
    }
}

impl fmt::Display for MediaFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Requested quality end of the available streams
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Quality {
    #[default]
    Highest,
    Lowest,
}

impl fmt::Display for Quality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Quality::Highest => "highest",
            Quality::Lowest => "lowest",
        })
    }
}

/// A stream picked for download
#[derive(Debug, Clone)]
pub struct StreamChoice {
    pub source_url: String,
    pub format: Format,
    pub media: MediaFormat,
    /// Id of the extractor that listed the stream
    pub extractor: Option<String>,
}

/// Where a collaborator should write the downloaded file
#[derive(Debug, Clone, Copy)]
pub struct FetchTarget<'a> {
    pub dir: &'a Path,
    pub stem: &'a str,
}

impl FetchTarget<'_> {
    /// Full path for a file with the given extension
    pub fn path_with_ext(&self, ext: &str) -> std::path::PathBuf {
        let ext = if ext.is_empty() { "bin" } else { ext };
        self.dir.join(format!("{}.{}", self.stem, ext))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_ytdlp_json() {
        let json = r#"{
            "id": "abc123",
            "title": "My Video",
            "webpage_url": "https://www.youtube.com/watch?v=abc123",
            "duration": 212,
            "uploader": "Someone",
            "formats": [
                {"format_id": "18", "ext": "mp4", "url": "https://r1.example/v18",
                 "protocol": "https", "vcodec": "avc1.42001E", "acodec": "mp4a.40.2",
                 "height": 360, "http_headers": {"User-Agent": "x"}},
                {"format_id": "140", "ext": "m4a", "url": "https://r1.example/a140",
                 "vcodec": "none", "acodec": "mp4a.40.2", "abr": 129.5}
            ]
        }"#;

        let info: VideoInfo = serde_json::from_str(json).unwrap();
        assert_eq!(info.title, "My Video");
        assert_eq!(info.url, "https://www.youtube.com/watch?v=abc123");
        assert_eq!(info.duration, Some(212.0));
        assert_eq!(info.formats.len(), 2);
        assert!(info.formats[0].is_progressive());
        assert!(info.formats[1].is_audio_only());
        assert_eq!(info.formats[0].http_headers.get("User-Agent").unwrap(), "x");
    }

    #[test]
    fn test_manifest_is_not_direct() {
        let hls = Format {
            format_id: "95".into(),
            url: "https://manifest.example/index.m3u8".into(),
            protocol: Some("m3u8_native".into()),
            ..Default::default()
        };
        assert!(!hls.is_direct_http());

        let plain = Format {
            format_id: "18".into(),
            url: "https://r1.example/v18".into(),
            protocol: Some("https".into()),
            ..Default::default()
        };
        assert!(plain.is_direct_http());
    }

    #[test]
    fn test_media_format_serde() {
        let f: MediaFormat = serde_json::from_str("\"mp3\"").unwrap();
        assert_eq!(f, MediaFormat::Mp3);
        assert!(serde_json::from_str::<MediaFormat>("\"avi\"").is_err());
        assert_eq!(Quality::default(), Quality::Highest);
    }
}
