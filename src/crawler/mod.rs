//! Crawler module for catalog fetching and extraction
//!
//! This module contains the crawl-and-extract pipeline:
//! - HTTP fetching with typed failures
//! - HTML parsing and lookups
//! - Category enumeration, listing pagination and detail extraction
//! - Bounded detail workers and the run coordinator

mod categories;
mod context;
mod coordinator;
mod detail;
mod document;
mod events;
mod fetcher;
mod listing;
mod scheduler;

pub use categories::{enumerate_categories, parse_categories};
pub use context::CrawlContext;
pub use coordinator::{run_crawl, Coordinator};
pub use detail::{
    availability_count, extract_book, star_rating, strip_currency, DetailExtractor, ExtractError,
    DESCRIPTION_PLACEHOLDER,
};
pub use document::{resolve_href, Document, StructureError};
pub use events::{aggregate, Collected, CrawlEvent, EventSink, FetchScope};
pub use fetcher::{build_http_client, FetchError, FetchErrorKind, Fetcher, RawDocument};
pub use listing::{parse_listing, ListingPage, ListingPaginator};
pub use scheduler::{FailureBreaker, Scheduler};
