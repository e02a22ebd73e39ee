//! HTTP surface: router, handlers and response shaping

pub mod handlers;
pub mod request;
pub mod response;

use crate::backend::DownloadService;
use crate::utils::error::{Result, ServeError};
use axum::http::header::CONTENT_DISPOSITION;
use axum::http::{HeaderValue, Method};
use axum::routing::{get, post};
use axum::Router;
use std::sync::Arc;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

pub use request::DownloadRequest;
pub use response::ErrorEnvelope;

/// Shared, immutable handler state
#[derive(Clone)]
pub struct AppState {
    pub service: Arc<DownloadService>,
}

impl AppState {
    pub fn new(service: DownloadService) -> Self {
        Self {
            service: Arc::new(service),
        }
    }
}

/// Build the application router
pub fn router(state: AppState, cors_origins: &[String]) -> Result<Router> {
    let download_route = || post(handlers::download).fallback(handlers::method_not_allowed);

    Ok(Router::new()
        .route("/", get(handlers::root))
        .route("/api/health", get(handlers::health))
        .route("/download", download_route())
        .route("/api/download", download_route())
        .with_state(state)
        .layer(build_cors_layer(cors_origins)?)
        .layer(TraceLayer::new_for_http()))
}

fn build_cors_layer(origins: &[String]) -> Result<CorsLayer> {
    let allow_origin = if origins.is_empty() {
        warn!("No CORS origins configured; allowing any origin");
        AllowOrigin::any()
    } else {
        let values = origins
            .iter()
            .map(|origin| {
                HeaderValue::from_str(origin)
                    .map_err(|_| ServeError::Config(format!("invalid CORS origin: {}", origin)))
            })
            .collect::<Result<Vec<_>>>()?;
        info!("CORS allow-list: {:?}", origins);
        AllowOrigin::list(values)
    };

    Ok(CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers(Any)
        .expose_headers([
            CONTENT_DISPOSITION,
            response::DOWNLOAD_FILENAME_HEADER,
        ]))
}
