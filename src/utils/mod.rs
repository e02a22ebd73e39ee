//! Utility modules for error handling and configuration

pub mod config;
pub mod error;
pub mod filename;
pub mod retry;

// Re-export for convenience
pub use config::{ExtractorSettings, HttpSettings, RequestIdentity, RetryPolicy, ServerSettings};
pub use error::ServeError;
