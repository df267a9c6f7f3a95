//! Mock listing source for testing.

use crate::error::{MapError, Result};
use crate::listing::{Listing, ListingFilter};
use crate::providers::ListingSource;
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::{Notify, oneshot};

type Reply = oneshot::Sender<Result<Vec<Listing>>>;

enum Outcome {
    Ready(Result<Vec<Listing>>),
    Gated(oneshot::Receiver<Result<Vec<Listing>>>),
}

#[derive(Debug, Default)]
struct SourceLog {
    catalog: Vec<Listing>,
    gated: bool,
    fail_next: Option<String>,
    filters: Vec<ListingFilter>,
    pending: Vec<Option<Reply>>,
}

/// Mock listing source.
///
/// In immediate mode every fetch resolves at once with the catalog filtered
/// through [`ListingFilter::apply`]. In gated mode every fetch waits until
/// the test resolves it by call index, which makes out-of-order completion
/// reproducible.
#[derive(Debug, Clone, Default)]
pub struct MockListingSource {
    log: Arc<Mutex<SourceLog>>,
    called: Arc<Notify>,
}

impl MockListingSource {
    /// Immediate source serving `catalog`.
    #[must_use]
    pub fn new(catalog: Vec<Listing>) -> Self {
        let source = Self::default();
        source.log().catalog = catalog;
        source
    }

    /// Gated source: fetches wait for [`resolve`](Self::resolve).
    #[must_use]
    pub fn gated() -> Self {
        let source = Self::default();
        source.log().gated = true;
        source
    }

    fn log(&self) -> MutexGuard<'_, SourceLog> {
        self.log.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Replace the catalog served in immediate mode.
    pub fn set_catalog(&self, catalog: Vec<Listing>) {
        self.log().catalog = catalog;
    }

    /// Fail the next fetch.
    pub fn fail_next(&self, reason: impl Into<String>) {
        self.log().fail_next = Some(reason.into());
    }

    /// Number of fetches so far.
    #[must_use]
    pub fn calls(&self) -> usize {
        self.log().filters.len()
    }

    /// Filters of every fetch, in call order.
    #[must_use]
    pub fn filters(&self) -> Vec<ListingFilter> {
        self.log().filters.clone()
    }

    /// Wait until at least `count` fetches were made.
    pub async fn wait_for_calls(&self, count: usize) {
        loop {
            let notified = self.called.notified();
            if self.calls() >= count {
                return;
            }
            notified.await;
        }
    }

    /// Resolve gated fetch number `call` (0-based).
    ///
    /// Returns `false` if there is no such pending fetch or its caller is
    /// gone.
    pub fn resolve(&self, call: usize, listings: Vec<Listing>) -> bool {
        self.reply(call, Ok(listings))
    }

    /// Fail gated fetch number `call` (0-based).
    pub fn fail(&self, call: usize, reason: impl Into<String>) -> bool {
        self.reply(call, Err(MapError::ListingFetch(reason.into())))
    }

    fn reply(&self, call: usize, result: Result<Vec<Listing>>) -> bool {
        let reply = self.log().pending.get_mut(call).and_then(Option::take);
        reply.is_some_and(|reply| reply.send(result).is_ok())
    }
}

impl ListingSource for MockListingSource {
    fn fetch(&self, filter: &ListingFilter) -> impl Future<Output = Result<Vec<Listing>>> + Send {
        let outcome = {
            let mut log = self.log();
            log.filters.push(filter.clone());
            if let Some(reason) = log.fail_next.take() {
                log.pending.push(None);
                Outcome::Ready(Err(MapError::ListingFetch(reason)))
            } else if log.gated {
                let (tx, rx) = oneshot::channel();
                log.pending.push(Some(tx));
                Outcome::Gated(rx)
            } else {
                log.pending.push(None);
                Outcome::Ready(Ok(filter.apply(log.catalog.iter().cloned())))
            }
        };
        self.called.notify_waiters();

        async move {
            match outcome {
                Outcome::Ready(result) => result,
                Outcome::Gated(rx) => rx
                    .await
                    .unwrap_or_else(|_| Err(MapError::ListingFetch("fetch abandoned".to_string()))),
            }
        }
    }
}
