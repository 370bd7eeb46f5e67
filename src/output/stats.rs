//! Run statistics and dataset statistics
//!
//! [`RunStats`] is filled by the event aggregator during a crawl.
//! [`DatasetStatistics`] is computed from an existing dataset file.

use crate::model::BookRow;
use crate::output::{read_dataset, OutputResult};
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use std::path::Path;

/// Counters for one crawl run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunStats {
    /// Categories found in the navigation
    pub categories: usize,

    /// Listing pages fetched and parsed
    pub listing_pages: usize,

    /// Item references handed to the detail workers
    pub items_queued: usize,

    /// Records extracted
    pub records: usize,

    /// Rows in the written dataset
    pub rows_written: usize,

    pub root_failures: usize,
    pub listing_failures: usize,
    pub detail_failures: usize,

    /// Fetches abandoned because the run was cancelled
    pub skipped_after_cancel: usize,

    pub structural_warnings: usize,

    /// Whether the consecutive-failure breaker stopped the run
    pub cancelled: bool,

    pub started_at: Option<DateTime<Utc>>,
    pub finished_at: Option<DateTime<Utc>>,
}

impl RunStats {
    /// Failed fetches across every scope, not counting cancelled ones
    pub fn fetch_failures(&self) -> usize {
        self.root_failures + self.listing_failures + self.detail_failures
    }

    pub fn duration_seconds(&self) -> Option<i64> {
        match (self.started_at, self.finished_at) {
            (Some(start), Some(end)) => Some((end - start).num_seconds()),
            _ => None,
        }
    }
}

/// Prints the end-of-run summary
pub fn print_run_summary(stats: &RunStats, dataset_path: &Path) {
    println!("=== Crawl Summary ===\n");

    if let Some(started) = stats.started_at {
        println!("Started:  {}", started.to_rfc3339());
    }
    if let Some(seconds) = stats.duration_seconds() {
        println!("Duration: {}s", seconds);
    }
    println!();

    println!("Categories:       {}", stats.categories);
    println!("Listing pages:    {}", stats.listing_pages);
    println!("Items queued:     {}", stats.items_queued);
    println!("Records:          {}", stats.records);
    println!();

    println!("Fetch failures:   {}", stats.fetch_failures());
    println!("  root:           {}", stats.root_failures);
    println!("  listing:        {}", stats.listing_failures);
    println!("  detail:         {}", stats.detail_failures);
    println!("Structural warnings: {}", stats.structural_warnings);

    if stats.cancelled {
        println!(
            "\nRun cancelled after consecutive failures ({} fetches skipped)",
            stats.skipped_after_cancel
        );
    }

    println!(
        "\n✓ {} rows written to {}",
        stats.rows_written,
        dataset_path.display()
    );
}

/// Summary of an existing dataset file
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DatasetStatistics {
    pub rows: usize,

    /// Rows per category, by category name
    pub categories: BTreeMap<String, usize>,

    /// Mean of the known ratings (0 ratings excluded)
    pub average_stars: Option<f64>,

    /// Rows whose rating could not be read
    pub unrated: usize,

    /// Sum of the stock counts
    pub units_available: u64,
}

impl DatasetStatistics {
    pub fn from_rows(rows: &[BookRow]) -> Self {
        let mut stats = Self {
            rows: rows.len(),
            ..Self::default()
        };

        let mut star_total = 0u64;
        let mut rated = 0u64;
        for row in rows {
            *stats.categories.entry(row.category.clone()).or_insert(0) += 1;
            stats.units_available += u64::from(row.availability);

            if row.stars == 0 {
                stats.unrated += 1;
            } else {
                star_total += u64::from(row.stars);
                rated += 1;
            }
        }

        if rated > 0 {
            stats.average_stars = Some(star_total as f64 / rated as f64);
        }
        stats
    }
}

/// Loads statistics from a dataset file; a missing file yields empty statistics
pub fn load_statistics(path: &Path) -> OutputResult<DatasetStatistics> {
    let rows = read_dataset(path)?;
    Ok(DatasetStatistics::from_rows(&rows))
}

/// Prints dataset statistics to stdout
pub fn print_statistics(stats: &DatasetStatistics) {
    println!("=== Dataset Statistics ===\n");

    if stats.rows == 0 {
        println!("No data.");
        return;
    }

    println!("Rows:             {}", stats.rows);
    println!("Categories:       {}", stats.categories.len());
    match stats.average_stars {
        Some(avg) => println!("Average rating:   {:.2} ({} unrated)", avg, stats.unrated),
        None => println!("Average rating:   n/a"),
    }
    println!("Units available:  {}", stats.units_available);

    println!("\nRows per category:");
    for (category, count) in &stats.categories {
        println!("  {:<30} {}", category, count);
    }
}
