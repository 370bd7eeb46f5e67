//! Category enumeration from the root page's navigation
//!
//! The navigation is a `ul.nav.nav-list` whose first nested `ul` holds one
//! `li` per category, each with a relative link to the category's first
//! listing page.

use crate::crawler::document::{attr, by_tag_class, select_all, select_first, text_content, Document, StructureError};
use crate::crawler::events::EventSink;
use crate::model::CategoryRef;

/// Returns the categories in navigation order
///
/// A missing navigation container is reported through the sink as a
/// structural warning and yields no categories.
pub fn enumerate_categories(root: &Document, sink: &EventSink) -> Vec<CategoryRef> {
    match parse_categories(root) {
        Ok(categories) => {
            sink.categories_found(categories.len());
            categories
        }
        Err(e) => {
            sink.structure(e);
            sink.categories_found(0);
            Vec::new()
        }
    }
}

/// Parses the navigation; `Err` when the container or its nested list is absent
pub fn parse_categories(root: &Document) -> Result<Vec<CategoryRef>, StructureError> {
    let nav_css = by_tag_class("ul", "nav nav-list");
    let nav = root.find_first(&nav_css).ok_or_else(|| root.missing(&nav_css))?;
    let list = root
        .find_next_after(nav, "ul")
        .ok_or_else(|| root.missing(&format!("{} ul", nav_css)))?;

    let mut categories = Vec::new();
    for entry in select_all(list, "li") {
        let name = text_content(entry);
        let Some(url) = select_first(entry, "a")
            .and_then(|a| attr(a, "href"))
            .and_then(|href| root.resolve(href))
        else {
            tracing::debug!("Skipping category '{}' without a usable link", name);
            continue;
        };

        categories.push(CategoryRef {
            position: categories.len(),
            name,
            url,
        });
    }

    Ok(categories)
}
