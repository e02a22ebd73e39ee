//! tubeserve library

pub mod backend;
pub mod downloader;
pub mod extractor;
pub mod server;
pub mod utils;

// Re-export main types for easier use
pub use backend::{DownloadJob, DownloadService, PreparedDownload};
pub use downloader::{DownloadConfig, DownloadEngine};
pub use extractor::{Extractor, Format, HybridExtractor, VideoInfo, YtDlpExtractor};
pub use server::{router, AppState};
pub use utils::{ServeError, ServerSettings};
