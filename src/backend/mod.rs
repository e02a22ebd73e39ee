pub mod service;

pub use service::{DownloadJob, DownloadService, PreparedDownload};
