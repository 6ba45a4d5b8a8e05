//! Log Recovery
//!
//! Verifies a log file after a crash and optionally cuts off a torn tail.

use std::fs::{File, OpenOptions};
use std::io::BufReader;
use std::path::Path;

use crate::chain::{self, genesis_hash, Digest};
use crate::error::Result;

/// Inspects and repairs log files
pub struct LogRecovery;

/// Result of a verification pass
#[derive(Debug, Clone, Default)]
pub struct RecoveryReport {
    /// Number of complete records
    pub blocks: u64,

    /// Number of transactions across those records
    pub transactions: u64,

    /// Offset just past the last complete record
    pub valid_len: u64,

    /// Size of the file on disk
    pub file_len: u64,

    /// Whether the file ends in a partially written record
    pub torn_tail: bool,

    /// Record offsets whose prev hash doesn't match the preceding block
    pub broken_links: Vec<u64>,

    /// Record offsets whose trailer or content hash disagrees with the block
    pub hash_mismatches: Vec<u64>,

    /// Hash of the last complete block
    pub last_block_hash: Option<Digest>,

    /// Whether the torn tail was truncated away
    pub was_truncated: bool,
}

impl RecoveryReport {
    /// No torn tail, no broken links, no hash mismatches
    pub fn is_clean(&self) -> bool {
        !self.torn_tail && self.broken_links.is_empty() && self.hash_mismatches.is_empty()
    }
}

impl LogRecovery {
    /// Walk the whole log without modifying it
    ///
    /// A truncated final record is reported as a torn tail. A malformed body
    /// is corruption and is returned as an error.
    pub fn verify(path: &Path) -> Result<RecoveryReport> {
        let file = File::open(path)?;
        let file_len = file.metadata()?.len();
        let mut source = BufReader::new(file);

        let mut report = RecoveryReport {
            file_len,
            ..Default::default()
        };
        let mut expected_prev = genesis_hash();

        loop {
            match chain::decode_record(&mut source) {
                Ok(record) => {
                    let block = &record.block;
                    if block.prev_block_hash() != &expected_prev {
                        report.broken_links.push(record.offset);
                    }
                    if &record.trailer != block.block_hash() || !block.is_hash_valid() {
                        report.hash_mismatches.push(record.offset);
                    }

                    expected_prev = *block.block_hash();
                    report.blocks += 1;
                    report.transactions += block.transactions().len() as u64;
                    report.valid_len = record.offset + record.len;
                    report.last_block_hash = Some(*block.block_hash());
                }
                Err(e) if e.is_end_of_log() => break,
                Err(crate::ChainError::ShortRead { .. }) => {
                    report.torn_tail = true;
                    break;
                }
                Err(e) => return Err(e),
            }
        }

        Ok(report)
    }

    /// Truncate a torn final record back to the last record boundary
    pub fn truncate_torn_tail(path: &Path) -> Result<RecoveryReport> {
        let mut report = Self::verify(path)?;

        if report.torn_tail {
            let file = OpenOptions::new().write(true).open(path)?;
            file.set_len(report.valid_len)?;
            file.sync_all()?;

            tracing::warn!(
                "Truncated torn tail of {}: {} -> {} bytes",
                path.display(),
                report.file_len,
                report.valid_len
            );

            report.file_len = report.valid_len;
            report.was_truncated = true;
        }

        Ok(report)
    }
}
