//! Streaming HTTP download engine

use crate::utils::config::{HttpSettings, RequestIdentity};
use crate::utils::error::{Result, ServeError};
use futures::StreamExt;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::{Client, StatusCode};
use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;
use tokio::fs::File;
use tokio::io::{AsyncWriteExt, BufWriter};
use tracing::{debug, info, warn};

/// Download configuration
#[derive(Debug, Clone)]
pub struct DownloadConfig {
    pub connect_timeout: Duration,
    pub read_timeout: Duration,
    pub identity: RequestIdentity,
}

impl DownloadConfig {
    pub fn from_settings(http: &HttpSettings, identity: &RequestIdentity) -> Self {
        Self {
            connect_timeout: Duration::from_secs(http.connect_timeout_secs),
            read_timeout: Duration::from_secs(http.read_timeout_secs),
            identity: identity.clone(),
        }
    }
}

impl Default for DownloadConfig {
    fn default() -> Self {
        Self::from_settings(&HttpSettings::default(), &RequestIdentity::default())
    }
}

/// Single-stream download engine.
///
/// Bodies are written chunk by chunk; a file is never buffered in memory.
#[derive(Clone)]
pub struct DownloadEngine {
    client: Client,
}

impl DownloadEngine {
    /// Create new download engine with configuration
    pub fn new(config: DownloadConfig) -> Result<Self> {
        let client = Client::builder()
            .user_agent(config.identity.effective_user_agent())
            .default_headers(to_header_map(&config.identity.headers))
            .connect_timeout(config.connect_timeout)
            .read_timeout(config.read_timeout)
            .build()
            .map_err(|e| ServeError::Config(format!("failed to create HTTP client: {}", e)))?;

        Ok(Self { client })
    }

    /// Download `url` into `output_path`, returning the number of bytes written
    ///
    /// `headers` are per-stream headers handed out by the extractor; they are
    /// sent on top of the identity's default headers.
    pub async fn download(
        &self,
        url: &str,
        headers: &HashMap<String, String>,
        output_path: &Path,
    ) -> Result<u64> {
        debug!("Starting direct download: {} -> {:?}", url, output_path);

        let response = self
            .client
            .get(url)
            .headers(to_header_map(headers))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(status_error(status, url));
        }

        let mut writer = BufWriter::new(File::create(output_path).await?);
        let mut stream = response.bytes_stream();
        let mut written = 0u64;

        while let Some(chunk) = stream.next().await {
            let chunk = chunk?;
            writer.write_all(&chunk).await?;
            written += chunk.len() as u64;
        }
        writer.flush().await?;

        info!("Downloaded {} bytes to {:?}", written, output_path);
        Ok(written)
    }
}

fn status_error(status: StatusCode, url: &str) -> ServeError {
    let message = format!("HTTP {} from {}", status, host_of(url));
    if status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error() {
        ServeError::Transient(message)
    } else {
        ServeError::DownloadError(message)
    }
}

fn host_of(url: &str) -> String {
    url::Url::parse(url)
        .ok()
        .and_then(|u| u.host_str().map(str::to_string))
        .unwrap_or_else(|| "upstream".to_string())
}

fn to_header_map<'a, I>(headers: I) -> HeaderMap
where
    I: IntoIterator<Item = (&'a String, &'a String)>,
{
    let mut map = HeaderMap::new();
    for (name, value) in headers {
        match (
            HeaderName::from_bytes(name.as_bytes()),
            HeaderValue::from_str(value),
        ) {
            (Ok(name), Ok(value)) => {
                map.insert(name, value);
            }
            _ => warn!("Skipping invalid header {:?}", name),
        }
    }
    map
}
