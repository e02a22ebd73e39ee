//! Download engine and scratch storage

pub mod engine;
pub mod scratch;

// Re-export for convenience
pub use engine::{DownloadConfig, DownloadEngine};
pub use scratch::{ScratchDir, ScratchFileStream};
