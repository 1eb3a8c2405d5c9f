//! URL handling module for Chapter-Binder
//!
//! This module provides URL normalization for visited-page bookkeeping,
//! resolution of references against a page's base URL, and same-site checks.

mod domain;
mod normalize;

// Re-export main functions
pub use domain::{extract_domain, same_site};
pub use normalize::{normalize_url, page_key, resolve_link, resolve_resource};
