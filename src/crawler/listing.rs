//! Listing pagination for a single category
//!
//! Pages are strictly sequential: page N+1's URL is only known once page N
//! has been parsed. A fetch failure ends the category early; items already
//! emitted are kept.

use crate::crawler::context::CrawlContext;
use crate::crawler::document::{attr, by_tag_class, select_first, text_content, Document, StructureError};
use crate::crawler::events::FetchScope;
use crate::model::{CategoryRef, ItemRef, ItemSeq};
use std::collections::HashSet;
use tokio::sync::mpsc;
use url::Url;

/// Item cards and the next-page link found on one listing page
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListingPage {
    pub items: Vec<ItemRef>,
    pub next: Option<Url>,

    /// Cards without a usable detail link
    pub skipped_cards: usize,
}

/// Parses one listing page of `category`
///
/// Detail and next-page links resolve against the page's own URL.
pub fn parse_listing(doc: &Document, category: &CategoryRef, page: usize) -> ListingPage {
    let mut items = Vec::new();
    let mut skipped_cards = 0;

    for card in doc.find_all(&by_tag_class("article", "product_pod")) {
        let Some(detail_url) = select_first(card, "a")
            .and_then(|a| attr(a, "href"))
            .and_then(|href| doc.resolve(href))
        else {
            skipped_cards += 1;
            continue;
        };

        let title = select_first(card, "h3 a")
            .map(|a| match attr(a, "title") {
                Some(title) => title.trim().to_string(),
                None => text_content(a),
            })
            .unwrap_or_default();

        items.push(ItemRef {
            seq: ItemSeq {
                category: category.position,
                page,
                slot: items.len(),
            },
            category: category.name.clone(),
            listing_page_url: doc.url().clone(),
            title,
            detail_url,
        });
    }

    let next = doc
        .find_first(&by_tag_class("li", "next"))
        .and_then(|li| select_first(li, "a"))
        .and_then(|a| attr(a, "href"))
        .and_then(|href| doc.resolve(href));

    ListingPage {
        items,
        next,
        skipped_cards,
    }
}

/// Walks one category's "next" chain, one page at a time
///
/// The sequence is finite and cannot be restarted: once a page fails, has
/// no next link, or links back to a visited page, [`next_page`] keeps
/// returning `None`.
///
/// [`next_page`]: ListingPaginator::next_page
pub struct ListingPaginator {
    ctx: CrawlContext,
    category: CategoryRef,
    next: Option<Url>,
    page: usize,
    visited: HashSet<Url>,
}

impl ListingPaginator {
    pub fn new(ctx: CrawlContext, category: CategoryRef) -> Self {
        let next = Some(category.url.clone());
        Self {
            ctx,
            category,
            next,
            page: 0,
            visited: HashSet::new(),
        }
    }

    /// Fetches and parses the next listing page
    pub async fn next_page(&mut self) -> Option<Vec<ItemRef>> {
        let url = self.next.take()?;
        self.visited.insert(url.clone());

        let raw = match self.ctx.fetch_page(&url).await {
            Ok(raw) => raw,
            Err(e) => {
                self.ctx.sink.fetch_failed(FetchScope::Listing, e);
                return None;
            }
        };

        let (listing, page_url) = {
            let doc = Document::parse(&raw);
            (parse_listing(&doc, &self.category, self.page), doc.url().clone())
        };
        self.page += 1;

        if listing.skipped_cards > 0 {
            self.ctx.sink.structure(StructureError::MissingElement {
                url: page_url.to_string(),
                selector: "article.product_pod a[href]".to_string(),
            });
        }
        self.ctx
            .sink
            .listing_page(&self.category.name, &page_url, listing.items.len());

        // A redirect may land on a page already walked
        self.visited.insert(page_url);

        match listing.next {
            Some(next) if self.visited.contains(&next) => {
                self.ctx.sink.structure(StructureError::PaginationLoop {
                    url: next.to_string(),
                });
            }
            next => self.next = next,
        }

        Some(listing.items)
    }

    /// Drives the paginator to the end, feeding every item into `queue`
    ///
    /// Returns the number of items queued. Stops early when the queue's
    /// receiving side is gone.
    pub async fn run(mut self, queue: mpsc::Sender<ItemRef>) -> usize {
        let mut queued = 0;
        while let Some(items) = self.next_page().await {
            for item in items {
                if queue.send(item).await.is_err() {
                    tracing::debug!("Detail queue closed, stopping '{}'", self.category.name);
                    return queued;
                }
                self.ctx.sink.item_queued();
                queued += 1;
            }
        }

        tracing::debug!(
            "Category '{}' done: {} pages, {} items",
            self.category.name,
            self.page,
            queued
        );
        queued
    }
}
