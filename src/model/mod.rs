//! Crawl-scoped data model
//!
//! All of these values are built during one run, held in memory and
//! discarded once the dataset has been written.

mod book;
mod refs;

pub use book::{BookRow, ScrapedBook};
pub use refs::{CategoryRef, ItemRef, ItemSeq};
