pub mod direct;
pub mod hybrid;
pub mod models;
pub mod selector;
pub mod traits;
pub mod ytdlp;

pub use direct::DirectMediaExtractor;
pub use hybrid::HybridExtractor;
pub use models::{FetchTarget, Format, MediaFormat, Quality, StreamChoice, VideoInfo};
pub use selector::select_format;
pub use traits::Extractor;
pub use ytdlp::YtDlpExtractor;
