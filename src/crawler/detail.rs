//! Detail page extraction
//!
//! Every field has its own fallback, so a missing marker never costs the
//! whole record:
//!
//! | Field | Source | Fallback |
//! |-------|--------|----------|
//! | description | first `p` after `div#product_description` | placeholder text |
//! | stars | second class of `p.star-rating` | 0 |
//! | table fields | `table.table-striped` rows, exact `th` labels | empty / 0 |
//! | availability | `(N) available` in the Availability row | 0 |
//! | image | first `img` src, resolved against the catalog root | empty |

use crate::crawler::context::CrawlContext;
use crate::crawler::document::{attr, by_tag_class, select_all, select_first, text_content, Document};
use crate::crawler::fetcher::FetchError;
use crate::model::{ItemRef, ScrapedBook};
use regex::Regex;
use std::sync::OnceLock;
use thiserror::Error;
use url::Url;

/// Description recorded when the page has no description block
pub const DESCRIPTION_PLACEHOLDER: &str = "Descrição não disponível";

/// Why an item produced no record
#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("skipped {url}: {source}")]
    Skipped { url: String, source: FetchError },
}

/// Maps the rating class token to a star count; unknown tokens are 0
pub fn star_rating(token: &str) -> u8 {
    match token {
        "One" => 1,
        "Two" => 2,
        "Three" => 3,
        "Four" => 4,
        "Five" => 5,
        _ => 0,
    }
}

/// Stock count from text such as `In stock (22 available)`; 0 without a match
pub fn availability_count(text: &str) -> u32 {
    static PATTERN: OnceLock<Option<Regex>> = OnceLock::new();
    let pattern = PATTERN.get_or_init(|| Regex::new(r"(\d+) available").ok());

    pattern
        .as_ref()
        .and_then(|re| re.captures(text))
        .and_then(|caps| caps.get(1))
        .and_then(|m| m.as_str().parse().ok())
        .unwrap_or(0)
}

/// Splits a price into its leading currency glyph and the decimal text
///
/// `"£51.77"` becomes `("£", "51.77")`; a bare amount has an empty glyph.
pub fn strip_currency(value: &str) -> (String, String) {
    let value = value.trim();
    let split = value
        .find(|c: char| c.is_ascii_digit() || c == '-' || c == '.')
        .unwrap_or(value.len());
    let (glyph, amount) = value.split_at(split);
    (glyph.trim().to_string(), amount.trim().to_string())
}

/// Extracts every field of a parsed detail page
pub fn extract_book(doc: &Document, item: &ItemRef, site_root: &Url, default_currency: &str) -> ScrapedBook {
    let mut book = ScrapedBook::from_item(item);

    book.image_url = doc
        .find_first("img")
        .and_then(|img| attr(img, "src"))
        .and_then(|src| site_root.join(src.trim()).ok())
        .map(|url| url.to_string())
        .unwrap_or_default();

    book.description = doc
        .find_first("div#product_description")
        .and_then(|marker| doc.find_next_after(marker, "p"))
        .map(text_content)
        .unwrap_or_else(|| DESCRIPTION_PLACEHOLDER.to_string());

    book.stars = doc
        .find_first(&by_tag_class("p", "star-rating"))
        .and_then(|p| attr(p, "class"))
        .and_then(|classes| classes.split_whitespace().nth(1))
        .map(star_rating)
        .unwrap_or(0);

    let mut glyph = None;
    let mut price = |value: &str| {
        let (g, amount) = strip_currency(value);
        if glyph.is_none() && !g.is_empty() {
            glyph = Some(g);
        }
        amount
    };

    if let Some(table) = doc.find_first(&by_tag_class("table", "table table-striped")) {
        for row in select_all(table, "tr") {
            let (Some(th), Some(td)) = (select_first(row, "th"), select_first(row, "td")) else {
                continue;
            };
            let label = text_content(th);
            let value = text_content(td);

            match label.as_str() {
                "UPC" => book.upc = value,
                "Product Type" => book.product_type = value,
                "Price (excl. tax)" => book.price_excl_tax = price(&value),
                "Price (incl. tax)" => book.price_incl_tax = price(&value),
                "Tax" => book.tax = price(&value),
                "Availability" => book.availability = availability_count(&value),
                "Number of reviews" => book.review_count = value.parse().unwrap_or(0),
                _ => {}
            }
        }
    }

    book.currency = glyph.unwrap_or_else(|| default_currency.to_string());
    book
}

/// Fetches and extracts detail pages
#[derive(Debug, Clone)]
pub struct DetailExtractor {
    ctx: CrawlContext,
}

impl DetailExtractor {
    pub fn new(ctx: CrawlContext) -> Self {
        Self { ctx }
    }

    /// Produces the record for one item, or `Skipped` when its page could not be fetched
    pub async fn extract(&self, item: &ItemRef) -> Result<ScrapedBook, ExtractError> {
        let raw = self
            .ctx
            .fetch_page(&item.detail_url)
            .await
            .map_err(|source| ExtractError::Skipped {
                url: item.detail_url.to_string(),
                source,
            })?;

        let doc = Document::parse(&raw);
        Ok(extract_book(&doc, item, &self.ctx.site_root, &self.ctx.currency))
    }
}
