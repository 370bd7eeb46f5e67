use serde::Deserialize;

/// Root of the catalog crawled when no configuration overrides it
pub const DEFAULT_ROOT_URL: &str = "https://books.toscrape.com/";

/// Dataset location used by the query service, relative to the working directory
pub const DEFAULT_DATASET_PATH: &str = "data/books_dataset.csv";

/// Main configuration structure for Shelf-Scraper
///
/// Every section is optional; a missing file behaves like an empty one.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub crawler: CrawlerConfig,
    #[serde(rename = "user-agent")]
    pub user_agent: UserAgentConfig,
    pub output: OutputConfig,
}

/// Crawler behavior configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct CrawlerConfig {
    /// Catalog root page holding the category navigation
    pub root_url: String,

    /// Per-request timeout (milliseconds)
    pub request_timeout_ms: u64,

    /// Maximum number of detail pages fetched at once
    pub max_concurrent_details: u32,

    /// Capacity of the queue between paginators and detail workers
    pub queue_capacity: u32,

    /// Consecutive fetch failures that cancel the run (0 disables)
    pub max_consecutive_failures: u32,

    /// Log a progress line every N extracted records
    pub progress_every: u32,

    /// Currency glyph recorded when prices carry none
    pub currency: String,
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            root_url: DEFAULT_ROOT_URL.to_string(),
            request_timeout_ms: 10_000,
            max_concurrent_details: 8,
            queue_capacity: 64,
            max_consecutive_failures: 25,
            progress_every: 50,
            currency: "£".to_string(),
        }
    }
}

/// User agent identification configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct UserAgentConfig {
    /// Name of the crawler
    pub crawler_name: String,

    /// Version of the crawler
    pub crawler_version: String,

    /// URL with information about the crawler
    pub contact_url: String,
}

impl Default for UserAgentConfig {
    fn default() -> Self {
        Self {
            crawler_name: "ShelfScraper".to_string(),
            crawler_version: env!("CARGO_PKG_VERSION").to_string(),
            contact_url: "https://github.com/shelf-scraper/shelf-scraper".to_string(),
        }
    }
}

impl UserAgentConfig {
    /// Formats the User-Agent header: `Name/Version (+ContactURL)`
    pub fn header_value(&self) -> String {
        format!(
            "{}/{} (+{})",
            self.crawler_name, self.crawler_version, self.contact_url
        )
    }
}

/// Output configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct OutputConfig {
    /// Path of the `;`-delimited dataset file
    pub dataset_path: String,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            dataset_path: DEFAULT_DATASET_PATH.to_string(),
        }
    }
}
