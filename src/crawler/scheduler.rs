//! Bounded pool for resource downloads
//!
//! This module handles:
//! - Spawning one download task per distinct resource URL
//! - Global concurrency limiting via a semaphore
//! - Joining or abandoning the in-flight downloads

use crate::crawler::extractor::ResourceReference;
use crate::resources::{ResourceLocation, ResourceStore};
use std::collections::HashSet;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use url::Url;

/// Outcome counts of a finished download pool
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DownloadSummary {
    /// Resources cached locally
    pub cached: usize,

    /// Resources left pointing at their remote URL
    pub remote: usize,

    /// Tasks that panicked or were cancelled
    pub lost: usize,
}

/// Runs resource downloads in the background while chapters are still being walked
///
/// At most `max_concurrent` downloads are in flight at once. Each URL is
/// dispatched only once; the store guarantees a single download even if
/// other callers intern the same URL.
pub struct DownloadScheduler {
    store: Arc<ResourceStore>,
    semaphore: Arc<Semaphore>,
    tasks: JoinSet<(Url, ResourceLocation)>,
    dispatched: HashSet<Url>,
}

impl DownloadScheduler {
    /// Creates a scheduler
    ///
    /// # Arguments
    ///
    /// * `store` - The shared resource store downloads go through
    /// * `max_concurrent` - Maximum number of simultaneous downloads
    pub fn new(store: Arc<ResourceStore>, max_concurrent: usize) -> Self {
        Self {
            store,
            semaphore: Arc::new(Semaphore::new(max_concurrent.max(1))),
            tasks: JoinSet::new(),
            dispatched: HashSet::new(),
        }
    }

    /// Starts downloads for every reference not dispatched before
    ///
    /// Must be called from within a tokio runtime.
    pub fn dispatch(&mut self, references: Vec<ResourceReference>) {
        for reference in references {
            if !self.dispatched.insert(reference.source_url.clone()) {
                continue;
            }

            let store = Arc::clone(&self.store);
            let semaphore = Arc::clone(&self.semaphore);
            let url = reference.source_url;
            self.tasks.spawn(async move {
                // The semaphore is never closed
                let _permit = semaphore.acquire_owned().await.ok();
                let location = store.intern(&url).await;
                (url, location)
            });
        }
    }

    /// Number of distinct resources dispatched so far
    pub fn dispatched(&self) -> usize {
        self.dispatched.len()
    }

    /// Waits for every dispatched download to finish
    pub async fn finish(mut self) -> DownloadSummary {
        let mut summary = DownloadSummary::default();
        while let Some(joined) = self.tasks.join_next().await {
            match joined {
                Ok((_, ResourceLocation::Local(_))) => summary.cached += 1,
                Ok((_, ResourceLocation::Remote(_))) => summary.remote += 1,
                Err(e) => {
                    tracing::warn!("Download task did not complete: {}", e);
                    summary.lost += 1;
                }
            }
        }
        tracing::debug!(
            "Downloads finished: {} cached, {} remote",
            summary.cached,
            summary.remote
        );
        summary
    }

    /// Abandons all in-flight downloads
    pub async fn abort(mut self) {
        if !self.tasks.is_empty() {
            tracing::info!("Abandoning {} resource downloads", self.tasks.len());
        }
        self.tasks.shutdown().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crawler::extractor::ResourceKind;
    use crate::crawler::PageFetcher;
    use crate::config::FetcherConfig;
    use std::time::Duration;
    use wiremock::matchers::method;
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn store() -> Arc<ResourceStore> {
        let config = FetcherConfig {
            max_retries: 0,
            ..FetcherConfig::default()
        };
        Arc::new(ResourceStore::new(PageFetcher::new(&config).unwrap()))
    }

    fn reference(server: &MockServer, p: &str) -> ResourceReference {
        ResourceReference {
            source_url: Url::parse(&format!("{}{}", server.uri(), p)).unwrap(),
            referring_page: Url::parse(&format!("{}/1.html", server.uri())).unwrap(),
            kind: ResourceKind::Image,
        }
    }

    #[tokio::test]
    async fn test_finish_joins_all_downloads() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(b"img".to_vec()))
            .expect(3)
            .mount(&server)
            .await;

        let store = store();
        let mut scheduler = DownloadScheduler::new(Arc::clone(&store), 2);
        scheduler.dispatch(vec![
            reference(&server, "/a.png"),
            reference(&server, "/b.png"),
        ]);
        scheduler.dispatch(vec![
            reference(&server, "/a.png"),
            reference(&server, "/c.png"),
        ]);
        assert_eq!(scheduler.dispatched(), 3);

        let summary = scheduler.finish().await;
        assert_eq!(summary.cached, 3);
        assert_eq!(summary.remote, 0);
        assert_eq!(store.cached().len(), 3);
    }

    #[tokio::test]
    async fn test_abort_abandons_downloads() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_bytes(b"img".to_vec())
                    .set_delay(Duration::from_secs(5)),
            )
            .mount(&server)
            .await;

        let store = store();
        let mut scheduler = DownloadScheduler::new(Arc::clone(&store), 4);
        scheduler.dispatch(vec![reference(&server, "/slow.png")]);
        scheduler.abort().await;

        assert!(store.cached().is_empty());
        assert!(store.resource_map("x").is_empty());
    }
}
