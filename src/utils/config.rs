//! Server configuration

use crate::utils::error::{Result, ServeError};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info};

/// Top-level server settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerSettings {
    /// Socket address to listen on
    pub bind: String,

    /// Parent directory for per-request scratch directories (system temp dir when unset)
    pub scratch_root: Option<PathBuf>,

    /// Allowed CORS origins; empty allows any origin
    pub cors_origins: Vec<String>,

    /// Retry policy for transient collaborator failures
    pub retry: RetryPolicy,

    /// Identity presented to upstream sites
    pub identity: RequestIdentity,

    /// yt-dlp collaborator settings
    pub extractor: ExtractorSettings,

    /// HTTP client timeouts for direct downloads
    pub http: HttpSettings,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            bind: "127.0.0.1:8000".to_string(),
            scratch_root: None,
            cors_origins: Vec::new(),
            retry: RetryPolicy::default(),
            identity: RequestIdentity::default(),
            extractor: ExtractorSettings::default(),
            http: HttpSettings::default(),
        }
    }
}

/// Bounded retry policy applied around extraction and download
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryPolicy {
    /// Total attempts including the first one
    pub max_attempts: u32,

    /// Delay before the second attempt; doubles for each following attempt
    pub base_delay_ms: u64,

    /// Upper bound of the uniform random jitter added to each delay
    pub max_jitter_ms: u64,
}

impl RetryPolicy {
    pub const MAX_ATTEMPTS_CAP: u32 = 5;

    /// Delay before attempt `attempt` (1-based), jitter excluded
    pub fn base_delay_for(&self, attempt: u32) -> Duration {
        if attempt <= 1 {
            return Duration::ZERO;
        }
        let factor = 1u64 << (attempt - 2).min(16);
        Duration::from_millis(self.base_delay_ms.saturating_mul(factor))
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay_ms: 500,
            max_jitter_ms: 250,
        }
    }
}

/// Request identity supplied to the collaborator and the download engine.
///
/// This is a static profile. Operators choosing a browser-like user agent or
/// cookies take responsibility for the upstream site's access policy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RequestIdentity {
    pub user_agent: Option<String>,
    pub headers: BTreeMap<String, String>,
    pub cookies_file: Option<PathBuf>,
}

impl RequestIdentity {
    /// User agent sent upstream; identifies the service unless overridden
    pub fn effective_user_agent(&self) -> String {
        self.user_agent
            .clone()
            .filter(|ua| !ua.trim().is_empty())
            .unwrap_or_else(|| concat!("tubeserve/", env!("CARGO_PKG_VERSION")).to_string())
    }
}

impl Default for RequestIdentity {
    fn default() -> Self {
        Self {
            user_agent: None,
            headers: BTreeMap::new(),
            cookies_file: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractorSettings {
    /// Explicit yt-dlp binary; searched for when unset
    pub ytdlp_path: Option<PathBuf>,

    /// Upper bound for a single yt-dlp invocation
    pub timeout_secs: u64,

    /// Convert audio downloads to mp3 (requires ffmpeg next to yt-dlp)
    pub convert_audio: bool,
}

impl ExtractorSettings {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Default for ExtractorSettings {
    fn default() -> Self {
        Self {
            ytdlp_path: None,
            timeout_secs: 300,
            convert_audio: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpSettings {
    pub connect_timeout_secs: u64,
    pub read_timeout_secs: u64,
}

impl Default for HttpSettings {
    fn default() -> Self {
        Self {
            connect_timeout_secs: 10,
            read_timeout_secs: 30,
        }
    }
}

impl ServerSettings {
    /// Load settings from an optional JSON file, then apply environment overrides
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut settings = match path {
            Some(path) => {
                info!("Loading settings from {}", path.display());
                let raw = std::fs::read_to_string(path).map_err(|e| {
                    ServeError::Config(format!("cannot read {}: {}", path.display(), e))
                })?;
                serde_json::from_str::<ServerSettings>(&raw)?
            }
            None => ServerSettings::default(),
        };

        settings.apply_env(|name| std::env::var(name).ok());
        settings.validate();
        Ok(settings)
    }

    /// Apply `PORT`, `FRONTEND_URL` and `YTDLP_PATH` overrides
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(port) = lookup("PORT").and_then(|v| v.trim().parse::<u16>().ok()) {
            debug!("PORT override: {}", port);
            self.bind = format!("0.0.0.0:{}", port);
        }

        if let Some(origin) = lookup("FRONTEND_URL") {
            let origin = origin.trim().trim_end_matches('/').to_string();
            if !origin.is_empty() && !self.cors_origins.contains(&origin) {
                self.cors_origins.push(origin);
            }
        }

        if let Some(path) = lookup("YTDLP_PATH").filter(|v| !v.trim().is_empty()) {
            self.extractor.ytdlp_path = Some(PathBuf::from(path.trim()));
        }
    }

    /// Enforce sane minimums and caps
    pub fn validate(&mut self) {
        self.retry.max_attempts = self
            .retry
            .max_attempts
            .clamp(1, RetryPolicy::MAX_ATTEMPTS_CAP);
        if self.extractor.timeout_secs == 0 {
            self.extractor.timeout_secs = ExtractorSettings::default().timeout_secs;
        }
        if self.http.connect_timeout_secs == 0 {
            self.http.connect_timeout_secs = HttpSettings::default().connect_timeout_secs;
        }
        if self.http.read_timeout_secs == 0 {
            self.http.read_timeout_secs = HttpSettings::default().read_timeout_secs;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_default_config() {
        let config = ServerSettings::default();
        assert_eq!(config.bind, "127.0.0.1:8000");
        assert_eq!(config.retry.max_attempts, 3);
        assert!(config.extractor.convert_audio);
        assert!(config.cors_origins.is_empty());
    }

    #[test]
    fn test_partial_json_keeps_defaults() {
        let settings: ServerSettings =
            serde_json::from_str(r#"{"retry": {"max_attempts": 2}}"#).unwrap();
        assert_eq!(settings.retry.max_attempts, 2);
        assert_eq!(settings.retry.base_delay_ms, 500);
        assert_eq!(settings.bind, "127.0.0.1:8000");
    }

    #[test]
    fn test_env_overrides() {
        let env: HashMap<&str, &str> = [
            ("PORT", "9090"),
            ("FRONTEND_URL", "https://example.netlify.app/"),
            ("YTDLP_PATH", "/opt/yt-dlp"),
        ]
        .into_iter()
        .collect();

        let mut settings = ServerSettings::default();
        settings.apply_env(|name| env.get(name).map(|v| v.to_string()));

        assert_eq!(settings.bind, "0.0.0.0:9090");
        assert_eq!(settings.cors_origins, vec!["https://example.netlify.app"]);
        assert_eq!(
            settings.extractor.ytdlp_path,
            Some(PathBuf::from("/opt/yt-dlp"))
        );
    }

    #[test]
    fn test_invalid_port_is_ignored() {
        let mut settings = ServerSettings::default();
        settings.apply_env(|name| (name == "PORT").then(|| "not-a-port".to_string()));
        assert_eq!(settings.bind, "127.0.0.1:8000");
    }

    #[test]
    fn test_validate_clamps_attempts() {
        let mut settings = ServerSettings::default();
        settings.retry.max_attempts = 0;
        settings.validate();
        assert_eq!(settings.retry.max_attempts, 1);

        settings.retry.max_attempts = 99;
        settings.validate();
        assert_eq!(settings.retry.max_attempts, RetryPolicy::MAX_ATTEMPTS_CAP);
    }

    #[test]
    fn test_backoff_schedule_doubles() {
        let policy = RetryPolicy {
            max_attempts: 4,
            base_delay_ms: 100,
            max_jitter_ms: 0,
        };
        assert_eq!(policy.base_delay_for(1), Duration::ZERO);
        assert_eq!(policy.base_delay_for(2), Duration::from_millis(100));
        assert_eq!(policy.base_delay_for(3), Duration::from_millis(200));
        assert_eq!(policy.base_delay_for(4), Duration::from_millis(400));
    }

    #[test]
    fn test_default_user_agent_identifies_service() {
        let identity = RequestIdentity::default();
        assert!(identity.effective_user_agent().starts_with("tubeserve/"));

        let custom = RequestIdentity {
            user_agent: Some("custom-agent/1.0".into()),
            ..Default::default()
        };
        assert_eq!(custom.effective_user_agent(), "custom-agent/1.0");
    }
}
