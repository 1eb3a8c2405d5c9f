//! Single-flight resource cache
//!
//! Every resource URL is downloaded at most once per run, no matter how many
//! chapters reference it or how many tasks ask for it at the same time. The
//! first request claims a local file name and starts the download; everyone
//! else awaits the same cell.

use super::naming::NameRegistry;
use crate::crawler::PageFetcher;
use crate::FetchError;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use thiserror::Error;
use tokio::sync::OnceCell;
use url::Url;

/// Source URL → replacement reference used by the link rewriter
pub type ResourceMap = HashMap<String, String>;

/// Where a resource ended up
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResourceLocation {
    /// Cached under this file name in the resource directory
    Local(String),

    /// Download failed; keep referencing the source
    Remote(Url),
}

/// A downloaded resource
#[derive(Debug, Clone)]
pub struct CachedResource {
    pub source_url: Url,

    /// File name relative to the resource directory
    pub local_path: String,

    pub content: Vec<u8>,
}

/// A resource that could not be cached; never fatal
#[derive(Debug, Clone, Error)]
#[error("Could not cache {url}: {source}")]
pub struct ResourceDownloadError {
    pub url: Url,
    #[source]
    pub source: FetchError,
}

enum Outcome {
    Cached(CachedResource),
    Fallback,
}

struct Slot {
    file_name: String,
    outcome: OnceCell<Outcome>,
}

#[derive(Default)]
struct StoreState {
    slots: HashMap<Url, Arc<Slot>>,
    names: NameRegistry,
}

/// Shared cache of downloaded resources, keyed by absolute URL
pub struct ResourceStore {
    fetcher: PageFetcher,
    state: Mutex<StoreState>,
    warnings: Mutex<Vec<ResourceDownloadError>>,
    downloads: AtomicUsize,
}

impl ResourceStore {
    pub fn new(fetcher: PageFetcher) -> Self {
        Self {
            fetcher,
            state: Mutex::new(StoreState::default()),
            warnings: Mutex::new(Vec::new()),
            downloads: AtomicUsize::new(0),
        }
    }

    /// Ensures a resource is cached and returns where it lives
    ///
    /// The file name is assigned on the first call for a URL. Later and
    /// concurrent calls wait for that first download and reuse its outcome.
    pub async fn intern(&self, source_url: &Url) -> ResourceLocation {
        let slot = self.slot_for(source_url);
        let outcome = slot
            .outcome
            .get_or_init(|| self.download(source_url, &slot.file_name))
            .await;

        match outcome {
            Outcome::Cached(_) => ResourceLocation::Local(slot.file_name.clone()),
            Outcome::Fallback => ResourceLocation::Remote(source_url.clone()),
        }
    }

    fn slot_for(&self, source_url: &Url) -> Arc<Slot> {
        let mut state = self.lock_state();
        if let Some(slot) = state.slots.get(source_url) {
            return Arc::clone(slot);
        }

        let file_name = state.names.assign(source_url);
        let slot = Arc::new(Slot {
            file_name,
            outcome: OnceCell::new(),
        });
        state.slots.insert(source_url.clone(), Arc::clone(&slot));
        slot
    }

    async fn download(&self, source_url: &Url, file_name: &str) -> Outcome {
        self.downloads.fetch_add(1, Ordering::Relaxed);

        match self.fetcher.fetch_bytes(source_url).await {
            Ok(content) => {
                tracing::debug!(
                    "Cached {} as {} ({} bytes)",
                    source_url,
                    file_name,
                    content.len()
                );
                Outcome::Cached(CachedResource {
                    source_url: source_url.clone(),
                    local_path: file_name.to_string(),
                    content,
                })
            }
            Err(source) => {
                tracing::warn!("{}; keeping remote reference", source);
                self.warnings
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner)
                    .push(ResourceDownloadError {
                        url: source_url.clone(),
                        source,
                    });
                Outcome::Fallback
            }
        }
    }

    fn lock_state(&self) -> MutexGuard<'_, StoreState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Number of downloads started so far
    pub fn download_count(&self) -> usize {
        self.downloads.load(Ordering::Relaxed)
    }

    /// Builds the rewrite map from every finished download
    ///
    /// Cached resources map to `<dir>/<file>`, failed ones to themselves.
    /// Downloads still in flight are left out.
    pub fn resource_map(&self, dir: &str) -> ResourceMap {
        let state = self.lock_state();
        state
            .slots
            .iter()
            .filter_map(|(url, slot)| {
                let target = match slot.outcome.get()? {
                    Outcome::Cached(_) => format!("{}/{}", dir, slot.file_name),
                    Outcome::Fallback => url.to_string(),
                };
                Some((url.to_string(), target))
            })
            .collect()
    }

    /// The cached resources, ordered by file name
    pub fn cached(&self) -> Vec<CachedResource> {
        let state = self.lock_state();
        let mut cached: Vec<CachedResource> = state
            .slots
            .values()
            .filter_map(|slot| match slot.outcome.get() {
                Some(Outcome::Cached(resource)) => Some(resource.clone()),
                _ => None,
            })
            .collect();
        cached.sort_by(|a, b| a.local_path.cmp(&b.local_path));
        cached
    }

    /// Resources that fell back to their remote URL
    pub fn warnings(&self) -> Vec<ResourceDownloadError> {
        self.warnings
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}
