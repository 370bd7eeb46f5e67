//! Shared per-run handles passed to every crawl component

use crate::crawler::events::EventSink;
use crate::crawler::fetcher::{FetchError, FetchErrorKind, Fetcher, RawDocument};
use crate::crawler::scheduler::FailureBreaker;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use url::Url;

/// Handles owned by the coordinator and cloned into each task
#[derive(Debug, Clone)]
pub struct CrawlContext {
    pub fetcher: Fetcher,
    pub sink: EventSink,
    pub breaker: Arc<FailureBreaker>,
    pub token: CancellationToken,

    /// Catalog root; image URLs resolve against it
    pub site_root: Url,

    /// Currency recorded when prices carry no glyph
    pub currency: String,
}

impl CrawlContext {
    pub fn new(
        fetcher: Fetcher,
        sink: EventSink,
        site_root: Url,
        currency: String,
        max_consecutive_failures: u32,
    ) -> Self {
        let token = CancellationToken::new();
        let breaker = Arc::new(FailureBreaker::new(max_consecutive_failures, token.clone()));
        Self {
            fetcher,
            sink,
            breaker,
            token,
            site_root,
            currency,
        }
    }

    /// Fetches one page unless the run has been cancelled
    ///
    /// Every outcome feeds the consecutive-failure breaker. A fetch in
    /// flight when the run is cancelled is abandoned.
    pub async fn fetch_page(&self, url: &Url) -> Result<RawDocument, FetchError> {
        if self.token.is_cancelled() {
            return Err(FetchError::new(url, FetchErrorKind::Cancelled));
        }

        let result = tokio::select! {
            biased;
            _ = self.token.cancelled() => Err(FetchError::new(url, FetchErrorKind::Cancelled)),
            result = self.fetcher.fetch(url) => result,
        };

        match &result {
            Ok(_) => self.breaker.record_success(),
            Err(e) if !e.is_cancelled() => {
                if self.breaker.record_failure() {
                    tracing::error!(
                        "{} consecutive fetch failures, cancelling the run (last: {})",
                        self.breaker.ceiling(),
                        e
                    );
                }
            }
            Err(_) => {}
        }

        result
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }
}
