//! Crawler module for walking and collecting a book
//!
//! This module contains the core binding logic, including:
//! - HTTP fetching with retry logic
//! - Chapter parsing and next-link discovery
//! - Chapter chain traversal
//! - Resource extraction and bounded background downloads
//! - Overall run coordination

mod coordinator;
mod extractor;
mod fetcher;
mod parser;
mod scheduler;
mod walker;

pub use coordinator::{bind_book, Coordinator};
pub use extractor::{
    absolutize_references, resource_attribute, ResourceExtractor, ResourceKind, ResourceReference,
};
pub use fetcher::{build_http_client, classify_status, FetchedPage, PageFetcher, RetryPolicy};
pub use parser::{parse_page, PageRules, ParsedPage};
pub use scheduler::{DownloadScheduler, DownloadSummary};
pub use walker::{ChapterWalker, TraversalContext};
