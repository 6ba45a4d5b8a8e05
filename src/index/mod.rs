//! Index Module
//!
//! Secondary indexes from transaction key to the blocks holding it.
//!
//! ## Variants
//! - `InvertedIndex`: key → every block offset it occurs in. Exact, one
//!   offset per transaction occurrence.
//! - `BloomFilterIndex`: one bloom filter per block. Approximate pre-filter;
//!   false positives cost an extra block read, there are no false negatives.
//!
//! Both are built by replaying the log at startup and then extended by the
//! coordinator exactly once per appended block, before the next mutation.
//!
//! ## Locking
//! The offset map / filter list sits behind a RwLock. `get` snapshots the
//! candidate offsets, drops that lock, then reads blocks through the shared
//! `LogReader`, whose own mutex serializes seek + read.

mod filter;
mod inverted;
mod bloom;

use std::io::{Read, Seek};

use crate::chain::{Block, Transaction};
use crate::config::IndexKind;
use crate::error::Result;
use crate::store::LogReader;

pub use filter::{BloomFilter, ProbeKey};
pub use inverted::InvertedIndex;
pub use bloom::BloomFilterIndex;

/// Key lookup over the indexed history of the log
pub trait Index: Send + Sync {
    /// Every transaction with `key`, in ascending block-offset order
    ///
    /// Fails with `KeyNotFound` when nothing matches.
    fn get(&self, key: &str) -> Result<Vec<Transaction>>;

    /// Extend the index with a block durably appended at `offset`
    fn update(&self, offset: u64, block: &Block);

    /// Which variant this is
    fn kind(&self) -> IndexKind;
}

/// Build the configured index variant by replaying the log
///
/// Returns the index and the offset just past the last record.
pub fn build<R>(kind: IndexKind, reader: LogReader<R>) -> Result<(Box<dyn Index>, u64)>
where
    R: Read + Seek + Send + 'static,
{
    tracing::info!("Start building {} index", kind);

    let (index, end): (Box<dyn Index>, u64) = match kind {
        IndexKind::Exact => {
            let (index, end) = InvertedIndex::build(reader)?;
            (Box::new(index), end)
        }
        IndexKind::Bloom => {
            let (index, end) = BloomFilterIndex::build(reader)?;
            (Box::new(index), end)
        }
    };

    Ok((index, end))
}
