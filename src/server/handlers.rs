use crate::server::request::DownloadRequest;
use crate::server::response::attachment;
use crate::server::AppState;
use crate::utils::error::ServeError;
use axum::body::Bytes;
use axum::extract::State;
use axum::http::Method;
use axum::response::{IntoResponse, Response};
use axum::Json;
use tracing::{error, info, info_span, Instrument};
use uuid::Uuid;

pub async fn root() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "message": "tubeserve API is running" }))
}

pub async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "ok" }))
}

/// POST /download
pub async fn download(State(state): State<AppState>, body: Bytes) -> Response {
    let request_id = Uuid::new_v4();
    let span = info_span!("download", %request_id);

    async move {
        let result: Result<Response, ServeError> = async {
            let job = DownloadRequest::parse(&body)?;
            info!("Download requested: {} ({}, {})", job.url, job.format, job.quality);

            let prepared = state.service.prepare(&job).await?;
            info!(
                "Sending {} ({} bytes, title \"{}\", duration {:?}s)",
                prepared.filename, prepared.size, prepared.title, prepared.duration
            );
            attachment(prepared).await
        }
        .await;

        match result {
            Ok(response) => response,
            Err(e) => {
                if e.status_code().is_server_error() {
                    error!("Download failed: {}", e);
                } else {
                    info!("Rejected request: {}", e);
                }
                e.into_response()
            }
        }
    }
    .instrument(span)
    .await
}

/// Any non-POST method on the download routes
pub async fn method_not_allowed(method: Method) -> Response {
    ServeError::MethodNotAllowed(method.to_string()).into_response()
}
