//! Error envelope and attachment responses

use crate::backend::PreparedDownload;
use crate::downloader::ScratchFileStream;
use crate::utils::error::{Result, ServeError};
use crate::utils::filename::{content_disposition, sanitize_ascii_filename};
use axum::body::Body;
use axum::http::header::{CONTENT_DISPOSITION, CONTENT_LENGTH, CONTENT_TYPE};
use axum::http::{HeaderMap, HeaderName, HeaderValue};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

pub const DOWNLOAD_FILENAME_HEADER: HeaderName = HeaderName::from_static("x-download-filename");

/// `{"status": "error", "message": ...}`
#[derive(Debug, Serialize)]
pub struct ErrorEnvelope {
    pub status: &'static str,
    pub message: String,
}

impl IntoResponse for ServeError {
    fn into_response(self) -> Response {
        let body = ErrorEnvelope {
            status: "error",
            message: self.to_string(),
        };
        (self.status_code(), Json(body)).into_response()
    }
}

/// Build the attachment response; the body owns the scratch directory.
pub async fn attachment(prepared: PreparedDownload) -> Result<Response> {
    let PreparedDownload {
        scratch,
        path,
        filename,
        content_type,
        size,
        ..
    } = prepared;

    let mut headers = HeaderMap::new();
    headers.insert(CONTENT_TYPE, HeaderValue::from_static(content_type));
    headers.insert(CONTENT_LENGTH, HeaderValue::from(size));
    headers.insert(
        CONTENT_DISPOSITION,
        HeaderValue::from_str(&content_disposition(&filename))
            .map_err(|_| ServeError::DownloadError("unusable filename".to_string()))?,
    );
    headers.insert(
        DOWNLOAD_FILENAME_HEADER,
        HeaderValue::from_str(&sanitize_ascii_filename(&filename))
            .map_err(|_| ServeError::DownloadError("unusable filename".to_string()))?,
    );

    let stream = ScratchFileStream::open(&path, scratch).await?;
    Ok((headers, Body::from_stream(stream)).into_response())
}
