//! Best-seller crawler CLI
//!
//! Crawls the listing, enriches each book and writes a CSV file.

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use bestsellers::{
    error::Result,
    models::Config,
    pipeline,
    storage::CsvStorage,
    utils::SystemClock,
};
use clap::Parser;

/// Scrape best-selling books into a CSV file
#[derive(Parser, Debug)]
#[command(name = "bestsellers", version, about = "Scrape best-selling books into CSV")]
struct Cli {
    /// Number of books to collect
    #[arg(long)]
    limit: Option<usize>,

    /// Output CSV path
    #[arg(long, default_value = "data/samples/books_52.csv")]
    out: PathBuf,

    /// Maximum number of listing pages to visit
    #[arg(long)]
    max_pages: Option<usize>,

    /// First listing page to crawl
    #[arg(long)]
    start_url: Option<String>,

    /// Path to an optional TOML configuration file
    #[arg(short, long, default_value = "bestsellers.toml")]
    config: PathBuf,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

/// Initialize logging based on verbosity flag.
fn init_logging(verbose: bool) {
    let level = if verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp_secs()
        .init();
}

/// Main entry point for the CLI application.
#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let mut config = if cli.config.exists() {
        log::info!("Loading configuration from {}", cli.config.display());
        Config::load(&cli.config)?
    } else {
        log::debug!("No config at {}, using defaults", cli.config.display());
        Config::default()
    };

    if let Some(limit) = cli.limit {
        config.crawl.limit = limit;
    }
    if let Some(max_pages) = cli.max_pages {
        config.crawl.max_pages = max_pages;
    }
    if let Some(start_url) = cli.start_url {
        config.crawl.start_url = start_url;
    }

    if let Err(e) = config.validate() {
        log::error!("Config validation failed: {}", e);
        return Err(e);
    }

    let storage = CsvStorage::new(&cli.out);
    let outcome = pipeline::run_crawler(&config, &storage, Arc::new(SystemClock)).await?;

    log::info!(
        "[DONE] Saved {} rows to {}",
        outcome.records.len(),
        cli.out.display()
    );

    if outcome.first_page_failed() {
        log::error!("The first listing page could not be fetched: {}", outcome.stop);
        return Ok(ExitCode::FAILURE);
    }
    Ok(ExitCode::SUCCESS)
}
