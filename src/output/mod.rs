//! Output module for writing the bound book and summarizing the run
//!
//! This module handles:
//! - Writing the merged HTML and its resource directory atomically
//! - Recording and printing the run summary

mod report;
mod writer;

pub use report::{print_report, BookReport};
pub use writer::{OutputPaths, OutputWriter};
