//! Configuration module for Chapter-Binder
//!
//! This module handles loading, parsing, and validating TOML configuration files.
//!
//! # Example
//!
//! ```no_run
//! use chapter_binder::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("binder.toml")).unwrap();
//! println!("Chapters are read from: {}", config.walker.content_selector);
//! ```

mod parser;
mod types;
mod validation;

// Re-export types
pub use types::{Config, FetcherConfig, OutputConfig, ResourceConfig, WalkerConfig};

// Re-export parser functions
pub use parser::{compute_config_hash, load_config, load_config_with_hash, parse_config};
pub use validation::validate;
