//! Chapter-Binder main entry point
//!
//! This is the command-line interface for binding a chapter-per-page book
//! into a single offline HTML file.

use anyhow::Context;
use chapter_binder::config::{load_config_with_hash, validate, Config};
use chapter_binder::crawler::Coordinator;
use chapter_binder::output::print_report;
use clap::Parser;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// Chapter-Binder: stitches a chain of chapter pages into one HTML book
///
/// Starting from any chapter, Chapter-Binder follows "next" links to the end
/// of the book, caches images and stylesheets locally, and writes
/// `<title>.html` plus a `<title>_files/` directory.
#[derive(Parser, Debug)]
#[command(name = "chapter-binder")]
#[command(version)]
#[command(about = "Binds a chapter-per-page web book into one HTML file", long_about = None)]
struct Cli {
    /// URL of a chapter of the book
    #[arg(value_name = "URL")]
    url: String,

    /// Path to TOML configuration file
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Directory to write the book to (overrides the configuration)
    #[arg(short, long, value_name = "DIR")]
    output_dir: Option<PathBuf>,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    /// Validate config and show what would be done without fetching anything
    #[arg(long)]
    dry_run: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Setup logging based on verbosity
    setup_logging(cli.verbose, cli.quiet);

    let mut config = match &cli.config {
        Some(path) => {
            tracing::info!("Loading configuration from: {}", path.display());
            let (config, hash) = load_config_with_hash(path)
                .with_context(|| format!("Failed to load configuration from {}", path.display()))?;
            tracing::info!("Configuration loaded successfully (hash: {})", hash);
            config
        }
        None => {
            tracing::debug!("No configuration file given; using defaults");
            Config::default()
        }
    };

    if let Some(dir) = &cli.output_dir {
        config.output.directory = dir.display().to_string();
    }
    validate(&config).context("Invalid configuration")?;

    if cli.dry_run {
        handle_dry_run(&config, &cli.url);
        return Ok(());
    }

    handle_bind(config, &cli.url, cli.quiet).await
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        // Only show errors
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("chapter_binder=info,warn"),
            1 => EnvFilter::new("chapter_binder=debug,info"),
            2 => EnvFilter::new("chapter_binder=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .init();
}

/// Handles the --dry-run mode: shows the effective configuration
fn handle_dry_run(config: &Config, url: &str) {
    println!("=== Chapter-Binder Dry Run ===\n");

    println!("Start URL: {}", url);

    println!("\nFetcher:");
    println!("  User agent: {}", config.fetcher.user_agent);
    println!("  Timeout: {}s", config.fetcher.timeout_secs);
    println!("  Max retries: {}", config.fetcher.max_retries);
    println!("  Backoff base: {}ms", config.fetcher.backoff_base_ms);

    println!("\nWalker:");
    println!("  Content selector: {}", config.walker.content_selector);
    println!("  Next selectors: {}", config.walker.next_selectors.join(", "));
    println!("  Next link labels: {}", config.walker.next_link_labels.join(", "));
    println!("  Strip selectors ({}):", config.walker.strip_selectors.len());
    for selector in &config.walker.strip_selectors {
        println!("    - {}", selector);
    }
    println!("  Content starts after: {}", config.walker.content_start_after);
    println!(
        "  Content ends before last: {}",
        config.walker.content_end_before_last
    );
    println!("  Same site only: {}", config.walker.same_site_only);
    println!("  Max chapters: {}", config.walker.max_chapters);

    println!("\nResources:");
    println!(
        "  Max concurrent downloads: {}",
        config.resources.max_concurrent_downloads
    );
    println!("  Include scripts: {}", config.resources.include_scripts);

    println!("\nOutput:");
    println!("  Directory: {}", config.output.directory);

    println!("\n✓ Configuration is valid");
}

/// Handles the main binding operation
async fn handle_bind(config: Config, url: &str, quiet: bool) -> anyhow::Result<()> {
    let coordinator = Coordinator::new(config).context("Failed to set up the binder")?;

    match coordinator.run(url).await {
        Ok(report) => {
            tracing::info!("Book written to {}", report.html_path.display());
            for fallback in &report.remote_fallbacks {
                tracing::warn!("Resource kept remote: {}", fallback);
            }
            if !quiet {
                print_report(&report);
            }
            Ok(())
        }
        Err(e) => {
            tracing::error!("Binding failed: {}", e);
            Err(e.into())
        }
    }
}
