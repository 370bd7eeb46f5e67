//! Shelf-Scraper main entry point
//!
//! This is the command-line interface for the Shelf-Scraper catalog crawler.

use anyhow::Context;
use clap::Parser;
use shelf_scraper::config::{read_config_with_hash, validate_config, Config};
use shelf_scraper::crawler::Coordinator;
use shelf_scraper::output::{load_statistics, print_run_summary, print_statistics};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

/// Shelf-Scraper: crawl a book catalog into a `;`-delimited dataset
///
/// Walks the catalog's categories, follows every listing page and extracts
/// each book's detail page. Every run is a full re-crawl.
#[derive(Parser, Debug)]
#[command(name = "shelf-scraper")]
#[command(version)]
#[command(about = "Crawl a book catalog into a dataset file", long_about = None)]
struct Cli {
    /// Path to TOML configuration file (defaults apply when omitted)
    #[arg(short, long, value_name = "CONFIG")]
    config: Option<PathBuf>,

    /// Override the dataset output path
    #[arg(short, long, value_name = "PATH")]
    output: Option<String>,

    /// Override the number of concurrent detail fetches
    #[arg(long, value_name = "N")]
    concurrency: Option<u32>,

    /// Override the per-request timeout in milliseconds
    #[arg(long, value_name = "MS")]
    timeout_ms: Option<u64>,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    /// Validate config and show what would be crawled without actually crawling
    #[arg(long, conflicts_with = "stats")]
    dry_run: bool,

    /// Show statistics of the existing dataset file and exit
    #[arg(long, conflicts_with = "dry_run")]
    stats: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    setup_logging(cli.verbose, cli.quiet);

    let config = build_config(&cli)?;

    if cli.dry_run {
        handle_dry_run(&config);
    } else if cli.stats {
        handle_stats(&config)?;
    } else {
        handle_crawl(config, cli.quiet).await?;
    }

    Ok(())
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("shelf_scraper=info,warn"),
            1 => EnvFilter::new("shelf_scraper=debug,info"),
            2 => EnvFilter::new("shelf_scraper=trace,debug"),
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

/// Defaults, then the config file, then command-line overrides; validated last
fn build_config(cli: &Cli) -> anyhow::Result<Config> {
    let mut config = match &cli.config {
        Some(path) => {
            tracing::info!("Loading configuration from: {}", path.display());
            let (config, hash) = read_config_with_hash(path)
                .with_context(|| format!("failed to load {}", path.display()))?;
            tracing::info!("Configuration loaded (hash: {})", hash);
            config
        }
        None => Config::default(),
    };

    if let Some(output) = &cli.output {
        config.output.dataset_path = output.clone();
    }
    if let Some(concurrency) = cli.concurrency {
        config.crawler.max_concurrent_details = concurrency;
    }
    if let Some(timeout_ms) = cli.timeout_ms {
        config.crawler.request_timeout_ms = timeout_ms;
    }

    validate_config(&config).context("invalid configuration")?;
    Ok(config)
}

/// Handles the --dry-run mode: shows the effective configuration
fn handle_dry_run(config: &Config) {
    println!("=== Shelf-Scraper Dry Run ===\n");

    println!("Crawler Configuration:");
    println!("  Root URL: {}", config.crawler.root_url);
    println!("  Request timeout: {}ms", config.crawler.request_timeout_ms);
    println!(
        "  Max concurrent details: {}",
        config.crawler.max_concurrent_details
    );
    println!("  Queue capacity: {}", config.crawler.queue_capacity);
    match config.crawler.max_consecutive_failures {
        0 => println!("  Failure breaker: disabled"),
        n => println!("  Failure breaker: {} consecutive failures", n),
    }
    println!("  Default currency: {}", config.crawler.currency);

    println!("\nUser Agent:");
    println!("  {}", config.user_agent.header_value());

    println!("\nOutput:");
    println!("  Dataset: {}", config.output.dataset_path);

    println!("\n✓ Configuration is valid");
}

/// Handles the --stats mode: summarizes the existing dataset
fn handle_stats(config: &Config) -> anyhow::Result<()> {
    let path = Path::new(&config.output.dataset_path);
    println!("Dataset: {}\n", path.display());

    let stats = load_statistics(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    print_statistics(&stats);

    Ok(())
}

/// Handles the main crawl operation
async fn handle_crawl(config: Config, quiet: bool) -> anyhow::Result<()> {
    tracing::info!(
        "Crawling {} with {} detail workers",
        config.crawler.root_url,
        config.crawler.max_concurrent_details
    );

    let coordinator = Coordinator::new(config).context("failed to start crawler")?;
    let stats = coordinator.run().await.context("crawl failed")?;

    if !quiet {
        print_run_summary(&stats, coordinator.dataset_path());
    }

    Ok(())
}
