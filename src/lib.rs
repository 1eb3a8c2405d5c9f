//! Chapter-Binder: stitches a book published as a chain of linked HTML pages
//! into one self-contained local document
//!
//! The crate walks the chapter chain through "next" links, caches every image
//! and stylesheet the chapters reference, merges the chapters into a single
//! HTML file, and rewrites references so the result works offline.

pub mod book;
pub mod config;
pub mod crawler;
pub mod dom;
pub mod output;
pub mod resources;
pub mod state;
pub mod url;

use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// Main error type for Chapter-Binder operations
#[derive(Debug, Error)]
pub enum BinderError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("{0}")]
    Fetch(#[from] FetchError),

    #[error("{0}")]
    Merge(#[from] MergeError),

    #[error("{0}")]
    Output(#[from] OutputError),

    #[error("URL error: {0}")]
    UrlError(#[from] UrlError),

    #[error("HTTP client error: {0}")]
    Reqwest(#[from] reqwest::Error),

    #[error("{stage} stage failed: {source}")]
    Stage {
        stage: Stage,
        #[source]
        source: Box<BinderError>,
    },
}

impl BinderError {
    /// Wraps an error with the pipeline stage it occurred in
    pub fn at(stage: Stage, source: impl Into<BinderError>) -> Self {
        Self::Stage {
            stage,
            source: Box::new(source.into()),
        }
    }
}

/// Pipeline stage, used to give fatal errors context
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Walk,
    Merge,
    Output,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Walk => "walk",
            Self::Merge => "merge",
            Self::Output => "output",
        };
        f.write_str(name)
    }
}

/// Errors raised while fetching a page or resource
#[derive(Debug, Clone, Error)]
pub enum FetchError {
    /// Timeouts, connection failures, 5xx and 429 responses. Retried.
    #[error("Transient failure fetching {url}: {reason}")]
    Transient { url: String, reason: String },

    /// 4xx responses and malformed or unsupported URLs. Never retried.
    #[error("Permanent failure fetching {url}: {reason}")]
    Permanent { url: String, reason: String },
}

impl FetchError {
    /// Returns true if another attempt might succeed
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Transient { .. })
    }

    /// The URL the failed request was made for
    pub fn url(&self) -> &str {
        match self {
            Self::Transient { url, .. } | Self::Permanent { url, .. } => url,
        }
    }
}

/// Errors raised when a page cannot be turned into a chapter or merged
#[derive(Debug, Error)]
pub enum MergeError {
    #[error("No element matching '{selector}' on {url}")]
    MissingContent { url: String, selector: String },

    #[error("Duplicate chapter {url} in book")]
    DuplicateChapter { url: String },

    #[error("Chapter order is not strictly increasing at {url}")]
    OutOfOrder { url: String },

    #[error("Book has no chapters")]
    EmptyBook,
}

/// Errors raised while writing the merged document to disk
#[derive(Debug, Error)]
pub enum OutputError {
    #[error("Cannot acquire output location {path}: {source}")]
    Acquire {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid selector in config: {0}")]
    InvalidSelector(String),
}

/// URL-specific errors
#[derive(Debug, Error)]
pub enum UrlError {
    #[error("Failed to parse URL: {0}")]
    Parse(String),

    #[error("Invalid URL scheme: {0}")]
    InvalidScheme(String),

    #[error("Missing host in URL")]
    MissingHost,
}

/// Result type alias for Chapter-Binder operations
pub type Result<T> = std::result::Result<T, BinderError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

/// Result type alias for URL operations
pub type UrlResult<T> = std::result::Result<T, UrlError>;

// Re-export commonly used types
pub use book::{BookDocument, ChapterPage};
pub use config::Config;
pub use crawler::{bind_book, Coordinator};
pub use output::BookReport;
pub use state::WalkState;
pub use crate::url::normalize_url;
