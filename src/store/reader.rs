//! Log Reader
//!
//! Shared, offset-addressed read handle over the log file.

use std::fs::File;
use std::io::{BufReader, Read, Seek, SeekFrom};
use std::path::Path;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::chain::{self, short_hash, Block, Digest, Transaction, DIGEST_SIZE};
use crate::error::{ChainError, Field, Result};

/// Read handle shared by the index and search workers
///
/// The file position is part of the shared state, so every seek + read pair
/// is one critical section. Clones share the same handle.
pub struct LogReader<R = BufReader<File>> {
    inner: Arc<Mutex<R>>,
}

impl<R> Clone for LogReader<R> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl LogReader<BufReader<File>> {
    /// Open the log file read-only
    pub fn open(path: &Path) -> Result<Self> {
        let file = File::open(path)?;
        Ok(Self::from_source(BufReader::new(file)))
    }
}

impl<R: Read + Seek> LogReader<R> {
    /// Wrap any seekable source (files, in-memory buffers)
    pub fn from_source(source: R) -> Self {
        Self {
            inner: Arc::new(Mutex::new(source)),
        }
    }

    /// Read the block whose record starts at `offset`
    pub fn read_at(&self, offset: u64) -> Result<Block> {
        let mut source = self.inner.lock();
        source.seek(SeekFrom::Start(offset))?;
        let (block, _) = chain::decode(&mut *source)?;
        Ok(block)
    }

    /// Decode every record from the start, in file order
    ///
    /// Returns the offset just past the last complete record. Any error other
    /// than a clean end of log is surfaced.
    pub fn replay<F>(&self, mut visit: F) -> Result<u64>
    where
        F: FnMut(u64, &Block),
    {
        let mut source = self.inner.lock();
        let mut end = source.seek(SeekFrom::Start(0))?;

        loop {
            match chain::decode(&mut *source) {
                Ok((block, offset)) => {
                    visit(offset, &block);
                    end = source.stream_position()?;
                }
                Err(e) if e.is_end_of_log() => break,
                Err(e) => return Err(e),
            }
        }

        Ok(end)
    }

    /// Collect every transaction with `key`, scanning the whole log
    pub fn full_scan(&self, key: &str) -> Result<Vec<Transaction>> {
        let mut transactions = Vec::new();
        let mut blocks = 0u64;

        self.replay(|offset, block| {
            tracing::trace!(
                "Scan block {} at offset {}",
                short_hash(block.block_hash()),
                offset
            );
            transactions.extend(block.matching(key).cloned());
            blocks += 1;
        })?;

        tracing::debug!(
            "Full scan for '{}' over {} blocks found {} transactions",
            key,
            blocks,
            transactions.len()
        );

        if transactions.is_empty() {
            return Err(ChainError::KeyNotFound);
        }
        Ok(transactions)
    }

    /// Hash of the last record, read from the final 32 bytes
    ///
    /// Fails with `ShortRead` when the log holds fewer than 32 bytes.
    pub fn tail_hash(&self) -> Result<Digest> {
        let mut source = self.inner.lock();
        let size = source.seek(SeekFrom::End(0))?;

        if size < DIGEST_SIZE as u64 {
            return Err(ChainError::ShortRead {
                field: Field::Digest,
                expected: DIGEST_SIZE,
                actual: size as usize,
            });
        }

        source.seek(SeekFrom::Start(size - DIGEST_SIZE as u64))?;
        let mut digest = [0u8; DIGEST_SIZE];
        source.read_exact(&mut digest)?;
        Ok(digest)
    }

    /// Current size of the underlying source
    pub fn len(&self) -> Result<u64> {
        let mut source = self.inner.lock();
        Ok(source.seek(SeekFrom::End(0))?)
    }

    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.len()? == 0)
    }
}
