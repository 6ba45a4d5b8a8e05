//! Inverted index
//!
//! Exact map from key to the offsets of every block containing it.
//!
//! ```text
//!   log                                        index
//!   0    block0: {hello} {apple}               apple  -> [0]
//!   120  block1: {banana}                      banana -> [120]
//!   230  block2: {pear} {hello} {world}        hello  -> [0, 230]
//!                                              pear   -> [230]
//!                                              world  -> [230]
//! ```

use std::collections::HashMap;
use std::fs::File;
use std::io::{BufReader, Read, Seek};

use parking_lot::RwLock;

use crate::chain::{Block, Transaction};
use crate::config::IndexKind;
use crate::error::{ChainError, Result};
use crate::store::LogReader;

use super::Index;

/// Exact key → block offsets index
pub struct InvertedIndex<R = BufReader<File>> {
    /// One entry per transaction occurrence, ascending
    offsets: RwLock<HashMap<String, Vec<u64>>>,

    reader: LogReader<R>,
}

impl<R: Read + Seek> InvertedIndex<R> {
    /// Empty index over `reader`
    pub fn new(reader: LogReader<R>) -> Self {
        Self {
            offsets: RwLock::new(HashMap::new()),
            reader,
        }
    }

    /// Replay the whole log into a fresh index
    ///
    /// Returns the index and the offset just past the last record.
    pub fn build(reader: LogReader<R>) -> Result<(Self, u64)> {
        let index = Self::new(reader);
        let mut blocks = 0u64;

        let end = {
            let mut offsets = index.offsets.write();
            index.reader.replay(|offset, block| {
                push_offsets(&mut offsets, offset, block);
                blocks += 1;
            })?
        };

        tracing::debug!(
            "InvertedIndex has been built from {} blocks ({} keys)",
            blocks,
            index.key_count()
        );
        Ok((index, end))
    }

    /// Snapshot of the offsets recorded for `key`
    pub fn offsets(&self, key: &str) -> Vec<u64> {
        self.offsets.read().get(key).cloned().unwrap_or_default()
    }

    /// Number of distinct keys
    pub fn key_count(&self) -> usize {
        self.offsets.read().len()
    }
}

impl<R: Read + Seek + Send> Index for InvertedIndex<R> {
    fn get(&self, key: &str) -> Result<Vec<Transaction>> {
        // Snapshot, then release the map before touching the reader
        let offsets = self.offsets(key);
        if offsets.is_empty() {
            return Err(ChainError::KeyNotFound);
        }

        let mut transactions = Vec::with_capacity(offsets.len());
        let mut last = None;
        for offset in offsets {
            // a key repeated within one block is stored once per occurrence
            if last == Some(offset) {
                continue;
            }
            last = Some(offset);

            let block = self.reader.read_at(offset)?;
            transactions.extend(block.matching(key).cloned());
        }

        if transactions.is_empty() {
            return Err(ChainError::KeyNotFound);
        }
        Ok(transactions)
    }

    fn update(&self, offset: u64, block: &Block) {
        let mut offsets = self.offsets.write();
        push_offsets(&mut offsets, offset, block);
    }

    fn kind(&self) -> IndexKind {
        IndexKind::Exact
    }
}

/// One offset per transaction, so a key repeated within a block repeats
fn push_offsets(offsets: &mut HashMap<String, Vec<u64>>, offset: u64, block: &Block) {
    for tx in block.transactions() {
        offsets.entry(tx.key().to_string()).or_default().push(offset);
    }
}
