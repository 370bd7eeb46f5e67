//! HTTP fetcher implementation
//!
//! This module handles all HTTP requests for the crawler:
//! - Building the shared HTTP client with the user agent and timeout
//! - GET requests for listing and detail pages
//! - Error classification into [`FetchError`]
//!
//! A fetch is exactly one round trip. Nothing here retries; callers skip
//! the unit of work that failed.

use crate::config::{CrawlerConfig, UserAgentConfig};
use reqwest::{redirect::Policy, Client};
use std::time::Duration;
use thiserror::Error;
use url::Url;

/// Raw markup retrieved for a URL
#[derive(Debug, Clone)]
pub struct RawDocument {
    /// Final URL after redirects
    pub url: Url,

    /// HTTP status code
    pub status_code: u16,

    /// Page body, decoded as UTF-8
    pub body: String,
}

/// Why a fetch failed
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FetchErrorKind {
    #[error("request timed out")]
    Timeout,

    #[error("connection failed: {0}")]
    Connect(String),

    #[error("HTTP status {0}")]
    Status(u16),

    #[error("failed to read body: {0}")]
    Body(String),

    #[error("request failed: {0}")]
    Request(String),

    #[error("run cancelled")]
    Cancelled,
}

/// A failed fetch, carrying the URL and the underlying cause
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("failed to fetch {url}: {kind}")]
pub struct FetchError {
    pub url: String,
    pub kind: FetchErrorKind,
}

impl FetchError {
    pub fn new(url: &Url, kind: FetchErrorKind) -> Self {
        Self {
            url: url.to_string(),
            kind,
        }
    }

    pub fn is_cancelled(&self) -> bool {
        self.kind == FetchErrorKind::Cancelled
    }

    fn from_reqwest(url: &Url, e: reqwest::Error) -> Self {
        let kind = if e.is_timeout() {
            FetchErrorKind::Timeout
        } else if e.is_connect() {
            FetchErrorKind::Connect(e.to_string())
        } else if e.is_body() || e.is_decode() {
            FetchErrorKind::Body(e.to_string())
        } else {
            FetchErrorKind::Request(e.to_string())
        };
        Self::new(url, kind)
    }
}

/// Builds an HTTP client with proper configuration
///
/// # Arguments
///
/// * `crawler` - Crawler settings (request timeout)
/// * `user_agent` - The user agent configuration
///
/// # Example
///
/// ```no_run
/// use shelf_scraper::config::Config;
/// use shelf_scraper::crawler::build_http_client;
///
/// let config = Config::default();
/// let client = build_http_client(&config.crawler, &config.user_agent).unwrap();
/// ```
pub fn build_http_client(
    crawler: &CrawlerConfig,
    user_agent: &UserAgentConfig,
) -> Result<Client, reqwest::Error> {
    Client::builder()
        .user_agent(user_agent.header_value())
        .timeout(Duration::from_millis(crawler.request_timeout_ms))
        .redirect(Policy::limited(10))
        .gzip(true)
        .brotli(true)
        .build()
}

/// Retrieves pages over a shared client
#[derive(Debug, Clone)]
pub struct Fetcher {
    client: Client,
}

impl Fetcher {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    /// Builds the client from configuration and wraps it
    pub fn from_config(
        crawler: &CrawlerConfig,
        user_agent: &UserAgentConfig,
    ) -> Result<Self, reqwest::Error> {
        Ok(Self::new(build_http_client(crawler, user_agent)?))
    }

    /// Fetches a URL, converting every transport failure into a [`FetchError`]
    ///
    /// # Error Classification
    ///
    /// | Condition | Kind |
    /// |-----------|------|
    /// | Timeout (connect or read) | Timeout |
    /// | Connection refused / DNS / TLS | Connect |
    /// | Non-2xx status | Status |
    /// | Body could not be read | Body |
    /// | Anything else | Request |
    pub async fn fetch(&self, url: &Url) -> Result<RawDocument, FetchError> {
        let response = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(|e| FetchError::from_reqwest(url, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::new(
                url,
                FetchErrorKind::Status(status.as_u16()),
            ));
        }

        let final_url = response.url().clone();

        // Decode as UTF-8 whatever the declared charset is
        let bytes = response
            .bytes()
            .await
            .map_err(|e| FetchError::from_reqwest(url, e))?;
        let body = String::from_utf8_lossy(&bytes).into_owned();

        tracing::trace!("Fetched {} ({} bytes)", final_url, body.len());

        Ok(RawDocument {
            url: final_url,
            status_code: status.as_u16(),
            body,
        })
    }
}
