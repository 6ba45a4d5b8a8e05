//! Coordinator Module
//!
//! The single actor that owns the log, the index and the chain tip.
//!
//! ## Responsibilities
//! - Buffer ingested transactions and cut them into blocks
//! - Flush on block size, on the periodic timer, on demand and at shutdown
//! - Append each block durably, then extend the index, then roll the tip
//! - Hand searches to worker threads without blocking the event loop
//! - Recover the chain tip and rebuild the index on startup
//!
//! ## Concurrency Model: Single Writer / Many Readers
//!
//! - **Writes**: every event is handled on one thread, one at a time. The
//!   coordinator is the only code that touches the `LogWriter`, the pending
//!   buffer, `last_block_hash` and `offset`. A flush blocks the loop until
//!   fsync returns; nothing else is processed mid-flush.
//!
//! - **Reads**: each search runs on its own short-lived thread against the
//!   index (or a full scan). Workers share the `LogReader`, which serializes
//!   seek + read internally.
//!
//! ```text
//!   Chain (handle, Clone)          Coordinator thread
//!   ───────────────────            ───────────────────────────────
//!   submit  ──Ingest──┐            select! {
//!   search  ──Search──┤  events ──▶   recv(events) -> handle(event)
//!   flush   ──Flush───┤               recv(ticker) -> flush pending
//!   stats   ──Stats───┤            }
//!   shutdown──Shutdown┘                 │ Search
//!                                       ▼
//!                                 worker thread ──▶ index.get / full_scan
//!                                       │ deliver unless deadline passed
//!                                       ▼
//!                                 caller's result channel
//! ```

use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam::channel::{bounded, select, tick, Receiver, RecvError, RecvTimeoutError, Sender};
use parking_lot::Mutex;
use tracing::{Dispatch, Span};

use crate::chain::{self, genesis_hash, short_hash, Block, Digest, Transaction};
use crate::config::{Config, IndexKind};
use crate::error::{ChainError, Result};
use crate::index::{self, Index};
use crate::search::{Deadline, Lookup, SearchOutcome, SearchRequest};
use crate::store::{LogReader, LogRecovery, LogWriter};

/// Max events queued ahead of the coordinator before submitters block
const EVENT_QUEUE_CAPACITY: usize = 1024;

/// Events processed by the coordinator, one at a time
pub(crate) enum Event {
    Ingest(Transaction),
    Search(SearchRequest),
    Flush(Sender<Result<()>>),
    Stats(Sender<ChainStats>),
    Shutdown(Sender<()>),
}

/// Snapshot of coordinator state
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChainStats {
    /// Offset the next block will be written at
    pub offset: u64,

    /// Hash the next block will chain to
    pub last_block_hash: Digest,

    /// Transactions waiting for the next flush
    pub pending: usize,

    /// Blocks appended since open
    pub blocks_written: u64,

    /// Flushes that failed since open
    pub failed_flushes: u64,

    /// Active index variant, None when searches full-scan
    pub index_kind: Option<IndexKind>,
}

/// What the loop should do after an event
enum Step {
    Continue,
    RestartTimer,
    Stop,
}

// =============================================================================
// Chain Handle
// =============================================================================

/// Cloneable handle to a running coordinator
///
/// When the last handle is dropped the coordinator flushes and exits.
#[derive(Clone)]
pub struct Chain {
    events: Sender<Event>,
    worker: Arc<Mutex<Option<JoinHandle<()>>>>,
}

impl Chain {
    /// Recover the log and start the coordinator thread
    ///
    /// Logs go to the subscriber that is current for the caller.
    pub fn open(config: Config) -> Result<Self> {
        let dispatch = tracing::dispatcher::get_default(|d| d.clone());
        let span = tracing::info_span!("chain", file = %config.data_file.display());
        Self::open_with_logger(config, dispatch, span)
    }

    /// Like `open`, with an explicit subscriber and parent span
    ///
    /// The coordinator thread and every search worker log through `dispatch`
    /// inside `span`.
    pub fn open_with_logger(config: Config, dispatch: Dispatch, span: Span) -> Result<Self> {
        config.validate()?;

        let coordinator = tracing::dispatcher::with_default(&dispatch, || {
            span.in_scope(|| Coordinator::recover(&config, dispatch.clone(), span.clone()))
        })?;

        Self::spawn(coordinator)
    }

    /// Start the loop on its own thread
    fn spawn(coordinator: Coordinator) -> Result<Self> {
        let (events, inbox) = bounded(EVENT_QUEUE_CAPACITY);

        let handle = thread::Builder::new()
            .name("chainlog-coordinator".to_string())
            .spawn(move || {
                let dispatch = coordinator.dispatch.clone();
                tracing::dispatcher::with_default(&dispatch, || coordinator.run(inbox))
            })?;

        Ok(Self {
            events,
            worker: Arc::new(Mutex::new(Some(handle))),
        })
    }

    /// Queue a transaction for the next block
    ///
    /// Returns its id once the coordinator has accepted it. The transaction is
    /// not durable until its block is flushed.
    pub fn submit(&self, key: impl Into<String>, value: impl Into<String>) -> Result<Digest> {
        let tx = Transaction::new(key, value);
        let id = *tx.id();
        self.send(Event::Ingest(tx))?;
        Ok(id)
    }

    /// Look up every transaction with `key`, waiting at most `timeout`
    pub fn search(&self, key: impl Into<String>, timeout: Duration) -> Result<SearchOutcome> {
        let (sink, results) = bounded(1);
        let deadline = Deadline::after(timeout);

        self.send(Event::Search(SearchRequest {
            key: key.into(),
            deadline: deadline.clone(),
            sink,
        }))?;

        let received = match deadline.instant() {
            Some(at) => results.recv_deadline(at),
            None => results.recv().map_err(|_| RecvTimeoutError::Disconnected),
        };

        match received {
            Ok(Ok(transactions)) => Ok(SearchOutcome::Found(transactions)),
            Ok(Err(ChainError::KeyNotFound)) => Ok(SearchOutcome::NotFound),
            Ok(Err(e)) => Err(e),
            Err(RecvTimeoutError::Timeout) => {
                deadline.cancel();
                Ok(SearchOutcome::TimedOut)
            }
            // Worker dropped the sink: either it saw the deadline pass or the
            // coordinator went away before running the request
            Err(RecvTimeoutError::Disconnected) if deadline.is_expired() => {
                Ok(SearchOutcome::TimedOut)
            }
            Err(RecvTimeoutError::Disconnected) => Err(ChainError::Closed),
        }
    }

    /// Flush pending transactions now and wait for the result
    pub fn flush(&self) -> Result<()> {
        let (ack, done) = bounded(1);
        self.send(Event::Flush(ack))?;
        done.recv().map_err(|_| ChainError::Closed)?
    }

    /// Current coordinator state, after every previously queued event
    pub fn stats(&self) -> Result<ChainStats> {
        let (reply, stats) = bounded(1);
        self.send(Event::Stats(reply))?;
        stats.recv().map_err(|_| ChainError::Closed)
    }

    /// Flush, close the log and stop the coordinator
    ///
    /// Waits at most `grace` for confirmation; `TimedOut` if it doesn't come.
    pub fn shutdown(&self, grace: Duration) -> Result<()> {
        let (ack, done) = bounded(1);
        self.send(Event::Shutdown(ack))?;

        match done.recv_timeout(grace) {
            Ok(()) => {
                if let Some(handle) = self.worker.lock().take() {
                    let _ = handle.join();
                }
                Ok(())
            }
            Err(RecvTimeoutError::Timeout) => Err(ChainError::TimedOut),
            Err(RecvTimeoutError::Disconnected) => Err(ChainError::Closed),
        }
    }

    fn send(&self, event: Event) -> Result<()> {
        self.events.send(event).map_err(|_| ChainError::Closed)
    }
}

// =============================================================================
// Coordinator Actor
// =============================================================================

/// State owned by the coordinator thread
struct Coordinator {
    writer: LogWriter,
    reader: LogReader,
    index: Option<Arc<dyn Index>>,

    pending: Vec<Transaction>,
    last_block_hash: Digest,
    offset: u64,

    block_size: usize,
    flush_period: Duration,

    blocks_written: u64,
    failed_flushes: u64,

    dispatch: Dispatch,
    span: Span,
}

impl Coordinator {
    /// Open the log and rebuild in-memory state
    ///
    /// On startup:
    /// 1. Truncate a torn tail (only if configured)
    /// 2. Open the append handle (creates the file)
    /// 3. Read the chain tip from the last 32 bytes, genesis if too short
    /// 4. Rebuild the index by replaying the log, or take the file length
    fn recover(config: &Config, dispatch: Dispatch, span: Span) -> Result<Self> {
        let path = &config.data_file;

        if config.repair_torn_tail && path.exists() {
            let report = LogRecovery::truncate_torn_tail(path)?;
            tracing::info!(
                "Verified log: {} blocks, {} transactions, truncated={}",
                report.blocks,
                report.transactions,
                report.was_truncated
            );
        }

        let writer = LogWriter::open(path)?;
        let reader = LogReader::open(path)?;

        let last_block_hash = match reader.tail_hash() {
            Ok(hash) => hash,
            Err(ChainError::ShortRead { .. }) => {
                tracing::info!("Empty log, chaining from genesis");
                genesis_hash()
            }
            Err(e) => return Err(e),
        };

        let (index, offset): (Option<Arc<dyn Index>>, u64) = if config.index_enabled {
            let (index, end) = index::build(config.index_kind, reader.clone())?;
            (Some(Arc::from(index)), end)
        } else {
            (None, writer.len()?)
        };

        tracing::info!(
            "Chain recovered: offset={}, tip={}, index={}",
            offset,
            short_hash(&last_block_hash),
            index
                .as_ref()
                .map(|i| i.kind().to_string())
                .unwrap_or_else(|| "off".to_string())
        );

        Ok(Self {
            writer,
            reader,
            index,
            pending: Vec::with_capacity(config.block_size),
            last_block_hash,
            offset,
            block_size: config.block_size,
            flush_period: config.flush_period,
            blocks_written: 0,
            failed_flushes: 0,
            dispatch,
            span,
        })
    }

    /// Event loop; returns after shutdown
    fn run(mut self, inbox: Receiver<Event>) {
        let span = self.span.clone();
        let _entered = span.enter();

        let mut ticker = tick(self.flush_period);

        loop {
            let step = select! {
                recv(inbox) -> event => self.handle(event),
                recv(ticker) -> _ => {
                    tracing::trace!("Flush by ticker");
                    let _ = self.flush_and_record();
                    Step::Continue
                }
            };

            match step {
                Step::Continue => {}
                Step::RestartTimer => ticker = tick(self.flush_period),
                Step::Stop => return,
            }
        }
    }

    fn handle(&mut self, event: std::result::Result<Event, RecvError>) -> Step {
        match event {
            Ok(Event::Ingest(tx)) => {
                tracing::debug!("Receive transaction key='{}'", tx.key());
                self.pending.push(tx);

                if self.pending.len() >= self.block_size {
                    let _ = self.flush_and_record();
                    // so the next tick doesn't flush a nearly empty block
                    return Step::RestartTimer;
                }
                Step::Continue
            }
            Ok(Event::Search(request)) => {
                self.spawn_search(request);
                Step::Continue
            }
            Ok(Event::Flush(ack)) => {
                let _ = ack.send(self.flush_and_record());
                Step::RestartTimer
            }
            Ok(Event::Stats(reply)) => {
                let _ = reply.send(self.stats());
                Step::Continue
            }
            Ok(Event::Shutdown(ack)) => {
                self.shutdown();
                let _ = ack.send(());
                Step::Stop
            }
            Err(RecvError) => {
                tracing::info!("All chain handles dropped");
                self.shutdown();
                Step::Stop
            }
        }
    }

    /// Flush, logging and counting failures
    ///
    /// A failed batch is not re-queued.
    fn flush_and_record(&mut self) -> Result<()> {
        let result = self.flush();
        if let Err(e) = &result {
            self.failed_flushes += 1;
            tracing::error!("Flush failed, batch dropped: {}", e);
        }
        result
    }

    /// Turn pending transactions into a durably appended block
    fn flush(&mut self) -> Result<()> {
        if self.pending.is_empty() {
            tracing::debug!("Skip flushing empty block");
            return Ok(());
        }

        let transactions = std::mem::replace(&mut self.pending, Vec::with_capacity(self.block_size));
        let block = Block::new(self.last_block_hash, transactions);
        let record = chain::encode(&block)?;

        if let Err(e) = self.writer.append(&record) {
            // drop whatever part of the record landed so framing stays intact
            if let Err(rollback) = self.writer.truncate(self.offset) {
                tracing::error!(
                    "Failed to roll {} back to offset {}: {}",
                    self.writer.path().display(),
                    self.offset,
                    rollback
                );
                // next record goes at the real end
                if let Ok(len) = self.writer.len() {
                    self.offset = len;
                }
            }
            return Err(e);
        }

        if let Some(index) = &self.index {
            index.update(self.offset, &block);
        }

        tracing::info!(
            "Flushed block {} at offset {}: {} transactions, {} bytes",
            short_hash(block.block_hash()),
            self.offset,
            block.transactions().len(),
            record.len()
        );

        self.offset += record.len() as u64;
        self.last_block_hash = *block.block_hash();
        self.blocks_written += 1;

        Ok(())
    }

    /// Run a lookup on its own thread
    fn spawn_search(&self, request: SearchRequest) {
        tracing::debug!("Search by key '{}'", request.key);

        if request.deadline.is_expired() {
            tracing::debug!("Search for '{}' expired before it started", request.key);
            return;
        }

        let lookup = match &self.index {
            Some(index) => Lookup::Index(Arc::clone(index)),
            None => Lookup::FullScan(self.reader.clone()),
        };
        let dispatch = self.dispatch.clone();
        let span = self.span.clone();

        let spawned = thread::Builder::new()
            .name("chainlog-search".to_string())
            .spawn(move || {
                tracing::dispatcher::with_default(&dispatch, || {
                    let _entered = span.enter();
                    let result = lookup.run(&request.key);
                    if let Err(e) = &result {
                        if !matches!(e, ChainError::KeyNotFound) {
                            tracing::warn!("Search for '{}' failed: {}", request.key, e);
                        }
                    }
                    request.deliver(result);
                })
            });

        if let Err(e) = spawned {
            tracing::error!("Failed to spawn search worker: {}", e);
        }
    }

    fn stats(&self) -> ChainStats {
        ChainStats {
            offset: self.offset,
            last_block_hash: self.last_block_hash,
            pending: self.pending.len(),
            blocks_written: self.blocks_written,
            failed_flushes: self.failed_flushes,
            index_kind: self.index.as_ref().map(|i| i.kind()),
        }
    }

    /// Final flush and sync; handles close when self drops
    fn shutdown(&mut self) {
        tracing::info!("Shutdown chain");

        let _ = self.flush_and_record();
        if let Err(e) = self.writer.sync() {
            tracing::error!("Final sync of {} failed: {}", self.writer.path().display(), e);
        }
    }
}
