//! HTML document tree and lookup helpers
//!
//! Parsing never fails: malformed markup yields whatever tree html5ever
//! recovers. All lookups are CSS selectors; an invalid selector simply
//! matches nothing.

use crate::crawler::fetcher::RawDocument;
use scraper::{ElementRef, Html, Selector};
use thiserror::Error;
use url::Url;

/// An expected container or element was absent from a page
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StructureError {
    #[error("no element matching '{selector}' on {url}")]
    MissingElement { url: String, selector: String },

    #[error("pagination loop on {url}: next page already visited")]
    PaginationLoop { url: String },
}

/// A parsed page together with the URL it was fetched from
pub struct Document {
    html: Html,
    url: Url,
}

impl Document {
    /// Parses fetched markup
    pub fn parse(raw: &RawDocument) -> Self {
        Self::from_html(&raw.body, raw.url.clone())
    }

    /// Parses markup that was obtained some other way
    pub fn from_html(html: &str, url: Url) -> Self {
        Self {
            html: Html::parse_document(html),
            url,
        }
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    /// First element in document order matching the selector
    pub fn find_first(&self, css: &str) -> Option<ElementRef<'_>> {
        let selector = selector(css)?;
        self.html.select(&selector).next()
    }

    /// Every element matching the selector, in document order
    pub fn find_all(&self, css: &str) -> Vec<ElementRef<'_>> {
        match selector(css) {
            Some(selector) => self.html.select(&selector).collect(),
            None => Vec::new(),
        }
    }

    /// First `tag` element that follows `anchor` in document order
    ///
    /// The anchor's own descendants come first, then everything after it.
    pub fn find_next_after<'a>(&'a self, anchor: ElementRef<'a>, tag: &str) -> Option<ElementRef<'a>> {
        let mut passed = false;
        for node in self.html.tree.root().descendants() {
            if !passed {
                passed = node.id() == anchor.id();
                continue;
            }
            if let Some(element) = ElementRef::wrap(node) {
                if element.value().name() == tag {
                    return Some(element);
                }
            }
        }
        None
    }

    /// Resolves an href against this document's URL
    pub fn resolve(&self, href: &str) -> Option<Url> {
        resolve_href(&self.url, href)
    }

    pub fn missing(&self, css: &str) -> StructureError {
        StructureError::MissingElement {
            url: self.url.to_string(),
            selector: css.to_string(),
        }
    }
}

/// Builds a `tag.class1.class2` selector from a tag and a space-separated class list
pub fn by_tag_class(tag: &str, classes: &str) -> String {
    let mut css = tag.to_string();
    for class in classes.split_whitespace() {
        css.push('.');
        css.push_str(class);
    }
    css
}

/// First descendant of `element` matching the selector
pub fn select_first<'a>(element: ElementRef<'a>, css: &str) -> Option<ElementRef<'a>> {
    let selector = selector(css)?;
    element.select(&selector).next()
}

/// Every descendant of `element` matching the selector
pub fn select_all<'a>(element: ElementRef<'a>, css: &str) -> Vec<ElementRef<'a>> {
    match selector(css) {
        Some(selector) => element.select(&selector).collect(),
        None => Vec::new(),
    }
}

/// Attribute value, if present
pub fn attr<'a>(element: ElementRef<'a>, name: &str) -> Option<&'a str> {
    element.value().attr(name)
}

/// Text content with every text node trimmed and empty nodes dropped
pub fn text_content(element: ElementRef<'_>) -> String {
    element
        .text()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .collect::<String>()
}

/// Resolves an href to an absolute http(s) URL
///
/// Returns None for empty hrefs, fragment-only links, `javascript:`,
/// `mailto:`, `tel:` and `data:` links, and anything that fails to resolve.
pub fn resolve_href(base: &Url, href: &str) -> Option<Url> {
    let href = href.trim();

    if href.is_empty() || href.starts_with('#') {
        return None;
    }

    if href.starts_with("javascript:")
        || href.starts_with("mailto:")
        || href.starts_with("tel:")
        || href.starts_with("data:")
    {
        return None;
    }

    let absolute = base.join(href).ok()?;
    if absolute.scheme() == "http" || absolute.scheme() == "https" {
        Some(absolute)
    } else {
        None
    }
}

fn selector(css: &str) -> Option<Selector> {
    match Selector::parse(css) {
        Ok(selector) => Some(selector),
        Err(e) => {
            tracing::warn!("Invalid selector '{}': {:?}", css, e);
            None
        }
    }
}
