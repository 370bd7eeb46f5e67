use url::Url;

/// A category discovered in the site navigation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategoryRef {
    /// Position in the navigation list (0-based)
    pub position: usize,

    /// Category name as displayed in the navigation
    pub name: String,

    /// Absolute URL of the category's first listing page
    pub url: Url,
}

/// Crawl position of an item: navigation order, then page order, then card order
///
/// Ordering on this key reproduces the order a one-fetch-at-a-time crawl
/// would have produced, whatever order the concurrent workers finish in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ItemSeq {
    /// Position of the category in the navigation
    pub category: usize,

    /// Listing page number within the category (0-based)
    pub page: usize,

    /// Card position on the listing page (0-based)
    pub slot: usize,
}

/// One item card encountered while paginating a category
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemRef {
    pub seq: ItemSeq,

    /// Name of the category the card was listed under
    pub category: String,

    /// Listing page the card was found on
    pub listing_page_url: Url,

    pub title: String,

    /// Absolute URL of the item's detail page
    pub detail_url: Url,
}
