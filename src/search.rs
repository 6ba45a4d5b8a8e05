//! Search requests
//!
//! Request/response plumbing between callers, the coordinator and the
//! short-lived worker threads that run lookups.
//!
//! A request carries a `Deadline`. The worker checks it right before
//! delivering; once it has passed (or the caller gave up) the result is
//! dropped without a send. The lookup itself is not interrupted.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use crossbeam::channel::Sender;

use crate::chain::Transaction;
use crate::error::Result;
use crate::index::Index;
use crate::store::LogReader;

/// What a caller gets back from a search
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SearchOutcome {
    /// Matching transactions in log order
    Found(Vec<Transaction>),

    /// Lookup finished with no matches
    NotFound,

    /// Deadline passed before a result arrived
    TimedOut,
}

impl SearchOutcome {
    pub fn is_found(&self) -> bool {
        matches!(self, SearchOutcome::Found(_))
    }

    /// Matching transactions, empty unless `Found`
    pub fn transactions(&self) -> &[Transaction] {
        match self {
            SearchOutcome::Found(txs) => txs,
            _ => &[],
        }
    }
}

/// Point in time after which a result must not be delivered
#[derive(Debug, Clone)]
pub struct Deadline {
    /// `None` when the timeout is too far out to represent
    at: Option<Instant>,
    cancelled: Arc<AtomicBool>,
}

impl Deadline {
    pub fn after(timeout: Duration) -> Self {
        Self {
            at: Instant::now().checked_add(timeout),
            cancelled: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn instant(&self) -> Option<Instant> {
        self.at
    }

    /// Caller stopped waiting
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Release);
    }

    pub fn is_expired(&self) -> bool {
        self.cancelled.load(Ordering::Acquire) || self.at.is_some_and(|at| Instant::now() >= at)
    }
}

/// A lookup queued on the coordinator
pub(crate) struct SearchRequest {
    pub key: String,
    pub deadline: Deadline,
    pub sink: Sender<Result<Vec<Transaction>>>,
}

impl SearchRequest {
    /// Send the result unless the deadline has passed
    ///
    /// Returns whether a send happened.
    pub fn deliver(self, result: Result<Vec<Transaction>>) -> bool {
        if self.deadline.is_expired() {
            tracing::debug!("Discarding late search result for '{}'", self.key);
            return false;
        }
        self.sink.try_send(result).is_ok()
    }
}

/// How a worker answers a request
pub(crate) enum Lookup {
    Index(Arc<dyn Index>),
    FullScan(LogReader),
}

impl Lookup {
    pub fn run(&self, key: &str) -> Result<Vec<Transaction>> {
        match self {
            Lookup::Index(index) => index.get(key),
            Lookup::FullScan(reader) => reader.full_scan(key),
        }
    }
}
