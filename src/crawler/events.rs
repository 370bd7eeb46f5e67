//! Run events and the single result aggregator
//!
//! Every component receives an [`EventSink`] from the coordinator instead of
//! writing to shared state. Sending never blocks. One aggregator task owns
//! the receiving end, keeps records ordered by [`ItemSeq`] and counts
//! failures for the run report.

use crate::crawler::document::StructureError;
use crate::crawler::fetcher::FetchError;
use crate::model::{ItemSeq, ScrapedBook};
use crate::output::RunStats;
use std::collections::BTreeMap;
use tokio::sync::mpsc;

/// Which unit of work a fetch failure belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchScope {
    Root,
    Listing,
    Detail,
}

/// Something that happened during a run
#[derive(Debug)]
pub enum CrawlEvent {
    /// Categories found in the navigation
    CategoriesFound(usize),

    /// A listing page was fetched and parsed
    ListingPage { category: String, items: usize },

    /// An item reference was handed to the detail workers
    ItemQueued,

    /// A detail page was extracted
    Record { seq: ItemSeq, book: ScrapedBook },

    /// A fetch failed and its unit of work was skipped
    FetchFailed { scope: FetchScope, error: FetchError },

    /// An expected container was missing; the scope degraded to empty
    Structure(StructureError),
}

/// Cloneable, non-blocking handle for reporting run events
#[derive(Debug, Clone)]
pub struct EventSink {
    tx: mpsc::UnboundedSender<CrawlEvent>,
}

impl EventSink {
    /// Creates a sink and the receiver the aggregator drains
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<CrawlEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    pub fn categories_found(&self, count: usize) {
        tracing::info!("Found {} categories", count);
        self.send(CrawlEvent::CategoriesFound(count));
    }

    pub fn listing_page(&self, category: &str, url: &url::Url, items: usize) {
        tracing::debug!("Listing page {} ({}): {} items", url, category, items);
        self.send(CrawlEvent::ListingPage {
            category: category.to_string(),
            items,
        });
    }

    pub fn item_queued(&self) {
        self.send(CrawlEvent::ItemQueued);
    }

    pub fn record(&self, seq: ItemSeq, book: ScrapedBook) {
        tracing::trace!("Extracted '{}'", book.title);
        self.send(CrawlEvent::Record { seq, book });
    }

    pub fn fetch_failed(&self, scope: FetchScope, error: FetchError) {
        if error.is_cancelled() {
            tracing::debug!("Skipped {:?} fetch: {}", scope, error);
        } else {
            tracing::warn!("Skipping {:?} page: {}", scope, error);
        }
        self.send(CrawlEvent::FetchFailed { scope, error });
    }

    pub fn structure(&self, error: StructureError) {
        tracing::warn!("Structural parse warning: {}", error);
        self.send(CrawlEvent::Structure(error));
    }

    fn send(&self, event: CrawlEvent) {
        // The aggregator only goes away after every sink is dropped
        if self.tx.send(event).is_err() {
            tracing::debug!("Event dropped: aggregator already finished");
        }
    }
}

/// Everything the aggregator gathered over a run
#[derive(Debug, Default)]
pub struct Collected {
    /// Extracted records in crawl order
    pub records: BTreeMap<ItemSeq, ScrapedBook>,

    pub stats: RunStats,
}

impl Collected {
    /// Records in crawl order, ready for assembly
    pub fn into_records(self) -> (Vec<ScrapedBook>, RunStats) {
        (self.records.into_values().collect(), self.stats)
    }
}

/// Drains events until every sink is dropped
///
/// Logs a progress line every `progress_every` records (0 disables).
pub async fn aggregate(
    mut rx: mpsc::UnboundedReceiver<CrawlEvent>,
    progress_every: u32,
) -> Collected {
    let mut collected = Collected::default();

    while let Some(event) = rx.recv().await {
        let stats = &mut collected.stats;
        match event {
            CrawlEvent::CategoriesFound(count) => stats.categories = count,
            CrawlEvent::ListingPage { .. } => stats.listing_pages += 1,
            CrawlEvent::ItemQueued => stats.items_queued += 1,
            CrawlEvent::Record { seq, book } => {
                if collected.records.insert(seq, book).is_some() {
                    tracing::warn!("Duplicate record for {:?} replaced", seq);
                }
                stats.records = collected.records.len();

                if progress_every > 0 && stats.records % progress_every as usize == 0 {
                    tracing::info!(
                        "Progress: {} of {} queued items extracted",
                        stats.records,
                        stats.items_queued
                    );
                }
            }
            CrawlEvent::FetchFailed { scope, error } => {
                if error.is_cancelled() {
                    stats.skipped_after_cancel += 1;
                } else {
                    match scope {
                        FetchScope::Root => stats.root_failures += 1,
                        FetchScope::Listing => stats.listing_failures += 1,
                        FetchScope::Detail => stats.detail_failures += 1,
                    }
                }
            }
            CrawlEvent::Structure(_) => stats.structural_warnings += 1,
        }
    }

    collected
}
