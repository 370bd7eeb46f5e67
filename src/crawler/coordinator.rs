//! Crawler coordinator - main crawl orchestration logic
//!
//! This module runs one full crawl:
//! - Fetching the root page and enumerating categories
//! - One sequential paginator task per category, all running concurrently
//! - A bounded pool of detail workers fed through a bounded queue
//! - A single aggregator task collecting records and failures
//! - Assembling and writing the dataset

use crate::config::{validate_config, Config};
use crate::crawler::categories::enumerate_categories;
use crate::crawler::context::CrawlContext;
use crate::crawler::detail::DetailExtractor;
use crate::crawler::document::Document;
use crate::crawler::events::{aggregate, Collected, EventSink, FetchScope};
use crate::crawler::fetcher::Fetcher;
use crate::crawler::listing::ListingPaginator;
use crate::crawler::scheduler::Scheduler;
use crate::output::{Dataset, RunStats};
use crate::Result;
use chrono::Utc;
use std::path::Path;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinSet;
use url::Url;

/// Main crawler coordinator structure
pub struct Coordinator {
    config: Arc<Config>,
    fetcher: Fetcher,
    root_url: Url,
}

impl Coordinator {
    /// Creates a new coordinator instance
    ///
    /// # Returns
    ///
    /// * `Ok(Coordinator)` - Successfully created coordinator
    /// * `Err(ScrapeError)` - The configuration is invalid or the HTTP client could not be built
    pub fn new(config: Config) -> Result<Self> {
        validate_config(&config)?;
        let root_url = Url::parse(&config.crawler.root_url)?;
        let fetcher = Fetcher::from_config(&config.crawler, &config.user_agent)?;

        Ok(Self {
            config: Arc::new(config),
            fetcher,
            root_url,
        })
    }

    /// Crawls the whole catalog and returns the records in crawl order
    ///
    /// Never fails because of the site: an unreachable root or missing
    /// navigation simply yields no records.
    pub async fn crawl(&self) -> Result<Collected> {
        let crawler = &self.config.crawler;
        let started_at = Utc::now();
        tracing::info!("Starting crawl of {}", self.root_url);

        let (sink, events) = EventSink::channel();
        let aggregator = tokio::spawn(aggregate(events, crawler.progress_every));

        let ctx = CrawlContext::new(
            self.fetcher.clone(),
            sink.clone(),
            self.root_url.clone(),
            crawler.currency.clone(),
            crawler.max_consecutive_failures,
        );

        let categories = match ctx.fetch_page(&self.root_url).await {
            Ok(raw) => {
                let root = Document::parse(&raw);
                enumerate_categories(&root, &sink)
            }
            Err(e) => {
                sink.fetch_failed(FetchScope::Root, e);
                Vec::new()
            }
        };

        let (queue, queue_rx) = mpsc::channel(crawler.queue_capacity as usize);
        let scheduler = Scheduler::new(
            crawler.max_concurrent_details as usize,
            DetailExtractor::new(ctx.clone()),
            sink.clone(),
        );
        let workers = tokio::spawn(scheduler.run(queue_rx));

        let mut paginators = JoinSet::new();
        for category in categories {
            tracing::debug!("Paginating '{}' from {}", category.name, category.url);
            paginators.spawn(ListingPaginator::new(ctx.clone(), category).run(queue.clone()));
        }
        drop(queue);

        while let Some(result) = paginators.join_next().await {
            if let Err(e) = result {
                tracing::error!("Paginator task failed: {}", e);
            }
        }

        let processed = workers.await?;
        tracing::debug!("Detail workers processed {} items", processed);

        let cancelled = ctx.is_cancelled();
        drop(ctx);
        drop(sink);

        let mut collected = aggregator.await?;
        collected.stats.cancelled = cancelled;
        collected.stats.started_at = Some(started_at);
        collected.stats.finished_at = Some(Utc::now());

        if cancelled {
            tracing::error!(
                "Crawl cancelled: {} records kept, {} fetches skipped",
                collected.stats.records,
                collected.stats.skipped_after_cancel
            );
        }

        Ok(collected)
    }

    /// Crawls, assembles and writes the dataset
    ///
    /// The dataset is written even when it is empty, so a completed run
    /// always leaves a syntactically complete table behind.
    pub async fn run(&self) -> Result<RunStats> {
        let (records, mut stats) = self.crawl().await?.into_records();

        let dataset = Dataset::assemble(records);
        dataset.write(self.dataset_path())?;
        stats.rows_written = dataset.len();

        tracing::info!(
            "Crawl completed: {} rows, {} fetch failures, {} structural warnings",
            stats.rows_written,
            stats.fetch_failures(),
            stats.structural_warnings
        );

        Ok(stats)
    }

    pub fn dataset_path(&self) -> &Path {
        Path::new(&self.config.output.dataset_path)
    }
}

/// Runs the main crawl operation
///
/// 1. Fetch the root page and enumerate categories
/// 2. Paginate every category (sequential per category, concurrent across)
/// 3. Extract detail pages with a bounded worker pool
/// 4. Assign ids in crawl order and write the dataset
///
/// # Example
///
/// ```no_run
/// use shelf_scraper::config::Config;
/// use shelf_scraper::crawler::run_crawl;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let stats = run_crawl(Config::default()).await?;
/// println!("{} rows", stats.rows_written);
/// # Ok(())
/// # }
/// ```
pub async fn run_crawl(config: Config) -> Result<RunStats> {
    let coordinator = Coordinator::new(config)?;
    coordinator.run().await
}
