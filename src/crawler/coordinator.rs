//! Binding coordinator - main orchestration logic
//!
//! This module runs one book through the whole pipeline:
//! - Walking the chapter chain
//! - Downloading resources in the background as chapters arrive
//! - Merging chapters and rewriting references
//! - Writing the book and summarizing the run

use crate::book::{merge, rewrite, BookDocument};
use crate::config::{validate, Config};
use crate::crawler::extractor::ResourceExtractor;
use crate::crawler::fetcher::PageFetcher;
use crate::crawler::parser::PageRules;
use crate::crawler::scheduler::DownloadScheduler;
use crate::crawler::walker::ChapterWalker;
use crate::output::{BookReport, OutputWriter};
use crate::resources::ResourceStore;
use crate::url::normalize_url;
use crate::{BinderError, Stage};
use chrono::Utc;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Main binding coordinator structure
pub struct Coordinator {
    config: Arc<Config>,
    fetcher: PageFetcher,
    rules: PageRules,
    output_dir: PathBuf,
}

impl Coordinator {
    /// Creates a new coordinator instance
    ///
    /// # Arguments
    ///
    /// * `config` - The binder configuration
    ///
    /// # Returns
    ///
    /// * `Ok(Coordinator)` - Successfully created coordinator
    /// * `Err(BinderError)` - Invalid configuration or HTTP client setup failed
    pub fn new(config: Config) -> Result<Self, BinderError> {
        validate(&config)?;

        let fetcher = PageFetcher::new(&config.fetcher)?;
        let rules = PageRules::from_config(&config.walker)?;
        let output_dir = PathBuf::from(&config.output.directory);

        Ok(Self {
            config: Arc::new(config),
            fetcher,
            rules,
            output_dir,
        })
    }

    /// Writes output to `dir` instead of the configured directory
    pub fn with_output_dir(mut self, dir: impl AsRef<Path>) -> Self {
        self.output_dir = dir.as_ref().to_path_buf();
        self
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Binds the book containing `start_url`
    ///
    /// This is the core pipeline that:
    /// 1. Walks the chapter chain, dispatching resource downloads per chapter
    /// 2. Merges the chapters into one document
    /// 3. Acquires the output location
    /// 4. Waits for downloads and rewrites references
    /// 5. Commits the HTML and resource files
    ///
    /// Any fatal error aborts outstanding downloads and leaves no output.
    pub async fn run(&self, start_url: &str) -> Result<BookReport, BinderError> {
        let started_at = Utc::now();
        let start = normalize_url(start_url)?;
        tracing::info!("Binding book starting at {}", start);

        let store = Arc::new(ResourceStore::new(self.fetcher.clone()));
        let mut downloads = DownloadScheduler::new(
            Arc::clone(&store),
            self.config.resources.max_concurrent_downloads,
        );
        let extractor = ResourceExtractor::new(self.config.resources.include_scripts);
        let mut walker = ChapterWalker::new(
            start,
            self.fetcher.clone(),
            self.rules.clone(),
            &self.config.walker,
        );

        let mut chapters = Vec::new();
        loop {
            match walker.next_chapter().await {
                Ok(Some(chapter)) => {
                    downloads.dispatch(extractor.extract(&chapter));
                    chapters.push(chapter);
                }
                Ok(None) => break,
                Err(e) => {
                    downloads.abort().await;
                    return Err(BinderError::at(Stage::Walk, e));
                }
            }
        }
        tracing::info!(
            "Found {} chapters; {} resources queued",
            chapters.len(),
            downloads.dispatched()
        );

        let chapter_urls: Vec<String> = chapters.iter().map(|c| c.url.to_string()).collect();
        let book = match BookDocument::new(chapters) {
            Ok(book) => book,
            Err(e) => {
                downloads.abort().await;
                return Err(BinderError::at(Stage::Merge, e));
            }
        };
        let basename = book.basename();
        let title = book.title.clone();
        let author = book.author.clone();

        let mut merged = match merge(book) {
            Ok(merged) => merged,
            Err(e) => {
                downloads.abort().await;
                return Err(BinderError::at(Stage::Merge, e));
            }
        };

        let writer = match OutputWriter::prepare(&self.output_dir, &basename) {
            Ok(writer) => writer,
            Err(e) => {
                downloads.abort().await;
                return Err(BinderError::at(Stage::Output, e));
            }
        };

        let summary = downloads.finish().await;
        tracing::info!(
            "Cached {} resources ({} kept remote)",
            summary.cached,
            summary.remote
        );

        let resource_map = store.resource_map(&writer.resource_dir_name());
        let references_rewritten = rewrite(&mut merged, &resource_map);
        let html = merged.render();
        let cached = store.cached();

        let paths = writer
            .commit(&html, &cached)
            .map_err(|e| BinderError::at(Stage::Output, e))?;

        let remote_fallbacks = store
            .warnings()
            .into_iter()
            .map(|w| w.url.to_string())
            .collect();

        let finished_at = Utc::now();
        tracing::info!(
            "Bound '{}' ({} chapters) in {:.1}s",
            title,
            chapter_urls.len(),
            (finished_at - started_at).num_milliseconds() as f64 / 1000.0
        );

        Ok(BookReport {
            title,
            author,
            chapter_urls,
            resources_cached: cached.len(),
            remote_fallbacks,
            references_rewritten,
            html_path: paths.html,
            resource_dir: paths.resource_dir,
            started_at,
            finished_at,
        })
    }
}

/// Binds one book with the given configuration
///
/// This is the main entry point for library users.
///
/// # Arguments
///
/// * `config` - The binder configuration
/// * `start_url` - Any chapter of the book, usually the first
///
/// # Returns
///
/// * `Ok(BookReport)` - The book was written
/// * `Err(BinderError)` - Binding failed; no output was written
pub async fn bind_book(config: Config, start_url: &str) -> Result<BookReport, BinderError> {
    Coordinator::new(config)?.run(start_url).await
}
