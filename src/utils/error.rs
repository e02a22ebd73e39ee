//! Error handling for tubeserve

use axum::http::StatusCode;
use thiserror::Error;

/// Main error type for tubeserve
#[derive(Debug, Error)]
pub enum ServeError {
    #[error("{0}")]
    InvalidRequest(String),

    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    #[error("Method {0} not allowed")]
    MethodNotAllowed(String),

    #[error("No matching stream: {0}")]
    NoMatchingStream(String),

    #[error("File not found after download: {0}")]
    FileNotFound(String),

    #[error("yt-dlp not found. Please install yt-dlp")]
    YtDlpNotFound,

    #[error("Failed to extract video info: {0}")]
    ExtractionError(String),

    #[error("Download failed: {0}")]
    DownloadError(String),

    /// Upstream refused or timed out; worth another attempt.
    #[error("Upstream temporarily unavailable: {0}")]
    Transient(String),

    #[error("Network error: {0}")]
    NetworkError(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl ServeError {
    /// HTTP status reported to the caller for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            ServeError::InvalidRequest(_) | ServeError::InvalidUrl(_) => StatusCode::BAD_REQUEST,
            ServeError::MethodNotAllowed(_) => StatusCode::METHOD_NOT_ALLOWED,
            ServeError::NoMatchingStream(_) | ServeError::FileNotFound(_) => StatusCode::NOT_FOUND,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Whether a retry policy may attempt the failed operation again
    pub fn is_transient(&self) -> bool {
        match self {
            ServeError::Transient(_) => true,
            ServeError::NetworkError(e) => e.is_timeout() || e.is_connect(),
            _ => false,
        }
    }

    /// Classify a collaborator failure message (usually yt-dlp stderr).
    pub fn from_upstream_message(message: &str) -> Self {
        let lower = message.to_ascii_lowercase();
        let trimmed = message.trim().to_string();

        if lower.contains("requested format is not available")
            || lower.contains("no video formats found")
        {
            return ServeError::NoMatchingStream(trimmed);
        }

        let transient_markers = [
            "http error 429",
            "too many requests",
            "http error 500",
            "http error 502",
            "http error 503",
            "http error 504",
            "timed out",
            "timeout",
            "connection reset",
            "temporary failure",
            "remote end closed connection",
        ];
        if transient_markers.iter().any(|m| lower.contains(m)) {
            return ServeError::Transient(trimmed);
        }

        ServeError::ExtractionError(trimmed)
    }
}

/// Result alias used across the library
pub type Result<T, E = ServeError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        assert_eq!(
            ServeError::InvalidRequest("x".into()).status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ServeError::MethodNotAllowed("GET".into()).status_code(),
            StatusCode::METHOD_NOT_ALLOWED
        );
        assert_eq!(
            ServeError::NoMatchingStream("mp3".into()).status_code(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            ServeError::FileNotFound("out".into()).status_code(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            ServeError::Transient("429".into()).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_classify_rate_limit_as_transient() {
        let err = ServeError::from_upstream_message(
            "ERROR: [youtube] abc123: HTTP Error 429: Too Many Requests",
        );
        assert!(err.is_transient());
        assert!(err.to_string().contains("429"));
    }

    #[test]
    fn test_classify_unavailable_as_permanent() {
        let err = ServeError::from_upstream_message("ERROR: [youtube] abc123: Video unavailable");
        assert!(matches!(err, ServeError::ExtractionError(_)));
        assert!(!err.is_transient());
    }

    #[test]
    fn test_classify_missing_format() {
        let err = ServeError::from_upstream_message(
            "ERROR: [youtube] abc123: Requested format is not available",
        );
        assert_eq!(err.status_code(), StatusCode::NOT_FOUND);
    }
}
