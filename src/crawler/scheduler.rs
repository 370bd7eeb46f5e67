//! Detail worker pool and the consecutive-failure breaker
//!
//! This module handles:
//! - Bounded concurrency for detail fetches via a semaphore
//! - Draining the item queue fed by the paginators
//! - Cancelling the whole run after too many consecutive fetch failures

use crate::crawler::detail::{DetailExtractor, ExtractError};
use crate::crawler::events::{EventSink, FetchScope};
use crate::model::ItemRef;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use tokio::sync::{mpsc, Semaphore};
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

/// Cancels the run once `ceiling` fetches in a row have failed
///
/// Any successful fetch resets the count. A ceiling of 0 disables it.
#[derive(Debug)]
pub struct FailureBreaker {
    ceiling: u32,
    consecutive: AtomicU32,
    token: CancellationToken,
}

impl FailureBreaker {
    pub fn new(ceiling: u32, token: CancellationToken) -> Self {
        Self {
            ceiling,
            consecutive: AtomicU32::new(0),
            token,
        }
    }

    pub fn ceiling(&self) -> u32 {
        self.ceiling
    }

    pub fn record_success(&self) {
        self.consecutive.store(0, Ordering::SeqCst);
    }

    /// Returns true when this failure tripped the breaker
    pub fn record_failure(&self) -> bool {
        if self.ceiling == 0 {
            return false;
        }

        let failures = self.consecutive.fetch_add(1, Ordering::SeqCst) + 1;
        if failures >= self.ceiling && !self.token.is_cancelled() {
            self.token.cancel();
            return true;
        }
        false
    }

    pub fn consecutive_failures(&self) -> u32 {
        self.consecutive.load(Ordering::SeqCst)
    }
}

/// Runs detail extraction for queued items with at most N fetches at once
pub struct Scheduler {
    /// Global semaphore for limiting concurrent detail fetches
    semaphore: Arc<Semaphore>,

    extractor: Arc<DetailExtractor>,

    sink: EventSink,
}

impl Scheduler {
    pub fn new(max_concurrent: usize, extractor: DetailExtractor, sink: EventSink) -> Self {
        Self {
            semaphore: Arc::new(Semaphore::new(max_concurrent.max(1))),
            extractor: Arc::new(extractor),
            sink,
        }
    }

    /// Consumes the queue until every paginator has dropped its sender
    ///
    /// Waits for a free slot before taking each item, so a full pool
    /// back-pressures the paginators through the bounded queue. Returns the
    /// number of items processed.
    pub async fn run(self, mut queue: mpsc::Receiver<ItemRef>) -> usize {
        let mut tasks = JoinSet::new();
        let mut processed = 0;

        loop {
            let permit = match self.semaphore.clone().acquire_owned().await {
                Ok(permit) => permit,
                Err(_) => break,
            };
            let Some(item) = queue.recv().await else {
                break;
            };

            let extractor = Arc::clone(&self.extractor);
            let sink = self.sink.clone();
            tasks.spawn(async move {
                let _permit = permit;
                match extractor.extract(&item).await {
                    Ok(book) => sink.record(item.seq, book),
                    Err(ExtractError::Skipped { source, .. }) => {
                        sink.fetch_failed(FetchScope::Detail, source)
                    }
                }
            });
            processed += 1;

            while let Some(result) = tasks.try_join_next() {
                log_task_result(result);
            }
        }

        while let Some(result) = tasks.join_next().await {
            log_task_result(result);
        }

        processed
    }
}

fn log_task_result(result: Result<(), tokio::task::JoinError>) {
    if let Err(e) = result {
        tracing::error!("Detail task failed: {}", e);
    }
}
