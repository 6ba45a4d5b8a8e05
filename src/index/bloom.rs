//! Bloom filter index
//!
//! Keeps one small filter per block instead of every key. A lookup tests
//! each filter and only reads the blocks that might hold the key, then
//! drops false positives with an exact key check.

use std::fs::File;
use std::io::{BufReader, Read, Seek};

use parking_lot::RwLock;

use crate::chain::{Block, Transaction};
use crate::config::IndexKind;
use crate::error::{ChainError, Result};
use crate::store::LogReader;

use super::filter::{BloomFilter, ProbeKey};
use super::Index;

/// Filter over one block's keys
struct BlockFilter {
    filter: BloomFilter,
    offset: u64,
}

impl BlockFilter {
    fn from_block(offset: u64, block: &Block) -> Self {
        let mut filter = BloomFilter::with_capacity(block.transactions().len());
        for tx in block.transactions() {
            filter.insert(tx.key().as_bytes());
        }
        Self { filter, offset }
    }
}

/// Approximate index: ordered (filter, offset) per block, append-only
pub struct BloomFilterIndex<R = BufReader<File>> {
    blocks: RwLock<Vec<BlockFilter>>,
    reader: LogReader<R>,
}

impl<R: Read + Seek> BloomFilterIndex<R> {
    /// Empty index over `reader`
    pub fn new(reader: LogReader<R>) -> Self {
        Self {
            blocks: RwLock::new(Vec::with_capacity(32)),
            reader,
        }
    }

    /// Replay the whole log into a fresh index
    ///
    /// Returns the index and the offset just past the last record.
    pub fn build(reader: LogReader<R>) -> Result<(Self, u64)> {
        let index = Self::new(reader);

        let end = {
            let mut blocks = index.blocks.write();
            index.reader.replay(|offset, block| {
                blocks.push(BlockFilter::from_block(offset, block));
            })?
        };

        tracing::debug!(
            "BloomFilterIndex has been built from {} blocks ({} filter bytes)",
            index.block_count(),
            index.filter_bytes()
        );
        Ok((index, end))
    }

    /// Number of indexed blocks
    pub fn block_count(&self) -> usize {
        self.blocks.read().len()
    }

    /// Total bytes held by all filters
    pub fn filter_bytes(&self) -> usize {
        self.blocks.read().iter().map(|b| b.filter.size_bytes()).sum()
    }

    /// Offsets of blocks whose filter may contain `key`
    pub fn candidates(&self, key: &str) -> Vec<u64> {
        let probe = ProbeKey::new(key.as_bytes());
        self.blocks
            .read()
            .iter()
            .filter(|b| b.filter.contains_probe(&probe))
            .map(|b| b.offset)
            .collect()
    }
}

impl<R: Read + Seek + Send> Index for BloomFilterIndex<R> {
    fn get(&self, key: &str) -> Result<Vec<Transaction>> {
        let candidates = self.candidates(key);

        let mut transactions = Vec::new();
        let mut false_positives = 0usize;
        for offset in candidates {
            let block = self.reader.read_at(offset)?;
            let before = transactions.len();
            transactions.extend(block.matching(key).cloned());
            if transactions.len() == before {
                false_positives += 1;
            }
        }

        if false_positives > 0 {
            tracing::trace!("Bloom lookup for '{}' hit {} false positives", key, false_positives);
        }

        if transactions.is_empty() {
            return Err(ChainError::KeyNotFound);
        }
        Ok(transactions)
    }

    fn update(&self, offset: u64, block: &Block) {
        let entry = BlockFilter::from_block(offset, block);
        self.blocks.write().push(entry);
    }

    fn kind(&self) -> IndexKind {
        IndexKind::Bloom
    }
}
