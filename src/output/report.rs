//! Run summary
//!
//! This module collects what a binding run produced and prints it in the
//! same plain layout the command line uses for all of its summaries.

use chrono::{DateTime, Duration, Utc};
use std::path::PathBuf;

/// Summary of a finished run
#[derive(Debug, Clone)]
pub struct BookReport {
    /// Title of the book
    pub title: String,

    /// Author, when the first chapter names one
    pub author: Option<String>,

    /// Chapter URLs in reading order
    pub chapter_urls: Vec<String>,

    /// Number of resources written to the resource directory
    pub resources_cached: usize,

    /// Resources that could not be downloaded and stay remote
    pub remote_fallbacks: Vec<String>,

    /// Number of attributes pointed at local files or anchors
    pub references_rewritten: usize,

    /// Path of the merged HTML file
    pub html_path: PathBuf,

    /// Path of the resource directory
    pub resource_dir: PathBuf,

    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

impl BookReport {
    pub fn chapter_count(&self) -> usize {
        self.chapter_urls.len()
    }

    /// Wall-clock time of the run
    pub fn duration(&self) -> Duration {
        self.finished_at - self.started_at
    }
}

/// Prints a report to stdout
pub fn print_report(report: &BookReport) {
    println!("=== Book Summary ===\n");

    println!("Book:");
    println!("  Title: {}", report.title);
    if let Some(author) = &report.author {
        println!("  Author: {}", author);
    }
    println!("  Chapters: {}", report.chapter_count());
    println!();

    println!("Resources:");
    println!("  Cached locally: {}", report.resources_cached);
    println!("  References rewritten: {}", report.references_rewritten);
    println!();

    if !report.remote_fallbacks.is_empty() {
        println!(
            "Remote Fallbacks ({}):",
            report.remote_fallbacks.len()
        );
        for url in &report.remote_fallbacks {
            println!("  - {}", url);
        }
        println!();
    }

    println!("Output:");
    println!("  {}", report.html_path.display());
    println!("  {}", report.resource_dir.display());
    println!();

    println!(
        "Started {} / finished {} ({:.1}s)",
        report.started_at.format("%Y-%m-%d %H:%M:%S UTC"),
        report.finished_at.format("%Y-%m-%d %H:%M:%S UTC"),
        report.duration().num_milliseconds() as f64 / 1000.0
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_book_report_creation() {
        let started_at = Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap();
        let report = BookReport {
            title: "Faust".to_string(),
            author: None,
            chapter_urls: vec!["https://example.com/1.html".to_string(); 3],
            resources_cached: 4,
            remote_fallbacks: vec![],
            references_rewritten: 9,
            html_path: PathBuf::from("Faust.html"),
            resource_dir: PathBuf::from("Faust_files"),
            started_at,
            finished_at: started_at + Duration::seconds(42),
        };

        assert_eq!(report.chapter_count(), 3);
        assert_eq!(report.duration().num_seconds(), 42);
    }
}
