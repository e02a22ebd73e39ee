use crate::extractor::models::{FetchTarget, StreamChoice, VideoInfo};
use crate::extractor::traits::Extractor;
use crate::utils::error::Result;
use async_trait::async_trait;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, info};

/// The Hybrid Extractor Registry
///
/// This struct holds a list of available extractors and routes requests
/// to the most appropriate one based on `supports(url)`.
pub struct HybridExtractor {
    extractors: Vec<Arc<dyn Extractor>>,
    fallback: Arc<dyn Extractor>,
}

impl HybridExtractor {
    /// Create a new HybridExtractor with the given registry and fallback
    pub fn new(extractors: Vec<Arc<dyn Extractor>>, fallback: Arc<dyn Extractor>) -> Self {
        Self {
            extractors,
            fallback,
        }
    }

    /// Find the best extractor for a given URL
    fn find_extractor(&self, url: &str) -> &Arc<dyn Extractor> {
        for extractor in &self.extractors {
            if extractor.supports(url) {
                debug!("Routing to extractor: {}", extractor.id());
                return extractor;
            }
        }
        debug!("Routing to fallback extractor: {}", self.fallback.id());
        &self.fallback
    }
}

#[async_trait]
impl Extractor for HybridExtractor {
    fn id(&self) -> &'static str {
        "hybrid"
    }

    fn supports(&self, url: &str) -> bool {
        self.extractors.iter().any(|e| e.supports(url)) || self.fallback.supports(url)
    }

    /// Extract video info using the best matching strategy
    async fn extract_info(&self, url: &str) -> Result<VideoInfo> {
        let extractor = self.find_extractor(url);
        match extractor.extract_info(url).await {
            Ok(mut info) => {
                info.extractor = Some(extractor.id().to_string());
                Ok(info)
            }
            Err(e) => {
                // If a specialized extractor fails, try the fallback
                if extractor.id() != self.fallback.id() {
                    info!(
                        "Primary extractor {} failed: {}. Retrying with fallback...",
                        extractor.id(),
                        e
                    );
                    let mut info = self.fallback.extract_info(url).await?;
                    info.extractor = Some(self.fallback.id().to_string());
                    Ok(info)
                } else {
                    Err(e)
                }
            }
        }
    }

    /// Fetch through the extractor that produced the stream list
    async fn fetch(&self, choice: &StreamChoice, target: FetchTarget<'_>) -> Result<PathBuf> {
        let owner = choice.extractor.as_deref();
        let extractor = if owner == Some(self.fallback.id()) {
            &self.fallback
        } else {
            self.extractors
                .iter()
                .find(|e| Some(e.id()) == owner)
                .unwrap_or_else(|| self.find_extractor(&choice.source_url))
        };
        extractor.fetch(choice, target).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extractor::models::{Format, MediaFormat};
    use crate::utils::error::ServeError;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct Named {
        id: &'static str,
        accepts: &'static str,
        fail: bool,
        fetched: AtomicUsize,
    }

    impl Named {
        fn new(id: &'static str, accepts: &'static str, fail: bool) -> Arc<Self> {
            Arc::new(Self {
                id,
                accepts,
                fail,
                fetched: AtomicUsize::new(0),
            })
        }
    }

    #[async_trait]
    impl Extractor for Named {
        fn id(&self) -> &'static str {
            self.id
        }

        fn supports(&self, url: &str) -> bool {
            url.contains(self.accepts)
        }

        async fn extract_info(&self, url: &str) -> Result<VideoInfo> {
            if self.fail {
                return Err(ServeError::ExtractionError(format!("{} refused", self.id)));
            }
            Ok(VideoInfo {
                title: self.id.to_string(),
                url: url.to_string(),
                ..Default::default()
            })
        }

        async fn fetch(&self, _choice: &StreamChoice, target: FetchTarget<'_>) -> Result<PathBuf> {
            self.fetched.fetch_add(1, Ordering::SeqCst);
            Ok(target.path_with_ext("mp4"))
        }
    }

    #[tokio::test]
    async fn test_routes_to_specialized_extractor() {
        let special = Named::new("special", ".mp4", false);
        let fallback = Named::new("fallback", "http", false);
        let hybrid = HybridExtractor::new(
            vec![special.clone() as Arc<dyn Extractor>],
            fallback.clone(),
        );

        let info = hybrid.extract_info("https://x.example/a.mp4").await.unwrap();
        assert_eq!(info.title, "special");
        assert_eq!(info.extractor.as_deref(), Some("special"));

        let info = hybrid.extract_info("https://youtu.be/abc").await.unwrap();
        assert_eq!(info.title, "fallback");
    }

    #[tokio::test]
    async fn test_falls_back_when_specialized_fails() {
        let special = Named::new("special", ".mp4", true);
        let fallback = Named::new("fallback", "http", false);
        let hybrid = HybridExtractor::new(vec![special as Arc<dyn Extractor>], fallback);

        let info = hybrid.extract_info("https://x.example/a.mp4").await.unwrap();
        assert_eq!(info.title, "fallback");
        assert_eq!(info.extractor.as_deref(), Some("fallback"));
    }

    #[tokio::test]
    async fn test_fetch_goes_to_owner() {
        let special = Named::new("special", ".mp4", false);
        let fallback = Named::new("fallback", "http", false);
        let hybrid = HybridExtractor::new(
            vec![special.clone() as Arc<dyn Extractor>],
            fallback.clone(),
        );

        let choice = StreamChoice {
            source_url: "https://x.example/a.mp4".to_string(),
            format: Format::default(),
            media: MediaFormat::Mp4,
            extractor: Some("fallback".to_string()),
        };
        let dir = tempfile::tempdir().unwrap();
        let target = FetchTarget {
            dir: dir.path(),
            stem: "a",
        };
        hybrid.fetch(&choice, target).await.unwrap();

        assert_eq!(fallback.fetched.load(Ordering::SeqCst), 1);
        assert_eq!(special.fetched.load(Ordering::SeqCst), 0);
    }
}
