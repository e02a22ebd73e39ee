//! Download request body parsing

use crate::backend::DownloadJob;
use crate::extractor::{MediaFormat, Quality};
use crate::utils::error::{Result, ServeError};
use serde::Deserialize;
use serde_json::error::Category;
use url::Url;

/// JSON body accepted by the download endpoint
#[derive(Debug, Deserialize)]
pub struct DownloadRequest {
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub format: Option<MediaFormat>,
    #[serde(default)]
    pub quality: Option<Quality>,
}

impl DownloadRequest {
    /// Parse and validate a raw request body into a job
    pub fn parse(body: &[u8]) -> Result<DownloadJob> {
        let request: DownloadRequest = serde_json::from_slice(body).map_err(|e| match e.classify() {
            Category::Syntax | Category::Eof | Category::Io => {
                ServeError::InvalidRequest("Invalid JSON data".to_string())
            }
            Category::Data => ServeError::InvalidRequest(format!("Invalid request: {}", e)),
        })?;

        request.into_job()
    }

    pub fn into_job(self) -> Result<DownloadJob> {
        let url = self
            .url
            .map(|u| u.trim().to_string())
            .filter(|u| !u.is_empty())
            .ok_or_else(|| ServeError::InvalidRequest("URL not provided".to_string()))?;

        match Url::parse(&url) {
            Ok(parsed) if matches!(parsed.scheme(), "http" | "https") && parsed.has_host() => {}
            _ => return Err(ServeError::InvalidUrl(url)),
        }

        Ok(DownloadJob {
            url,
            format: self.format.unwrap_or_default(),
            quality: self.quality.unwrap_or_default(),
        })
    }
}
