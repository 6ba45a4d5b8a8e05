//! Tests for LogRecovery
//!
//! These tests verify:
//! - Verification of a clean log
//! - Verification of an empty log
//! - Torn tail detection and truncation
//! - Broken chain links and hash mismatches are reported
//! - Malformed bodies are surfaced as errors

use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::PathBuf;

use chainlog::chain::{encode, genesis_hash, Block, Transaction};
use chainlog::error::ChainError;
use chainlog::store::{LogRecovery, LogWriter};
use tempfile::TempDir;

// =============================================================================
// Helper Functions
// =============================================================================

fn setup_temp_log() -> (TempDir, PathBuf) {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("chain.log");
    (temp_dir, path)
}

fn linked_blocks(count: usize) -> Vec<Block> {
    let mut prev = genesis_hash();
    (0..count)
        .map(|i| {
            let txs = (0..=i)
                .map(|j| Transaction::with_timestamp(format!("k{}", j), format!("v{}", i), i as i64))
                .collect();
            let block = Block::with_timestamp(prev, txs, i as i64);
            prev = *block.block_hash();
            block
        })
        .collect()
}

fn write_blocks(path: &PathBuf, blocks: &[Block]) {
    let mut writer = LogWriter::open(path).unwrap();
    for block in blocks {
        writer.append(&encode(block).unwrap()).unwrap();
    }
}

fn append_raw(path: &PathBuf, bytes: &[u8]) {
    let mut file = OpenOptions::new().append(true).open(path).unwrap();
    file.write_all(bytes).unwrap();
    file.sync_all().unwrap();
}

// =============================================================================
// Verify Tests
// =============================================================================

#[test]
fn test_verify_clean_log() {
    let (_temp, path) = setup_temp_log();
    let blocks = linked_blocks(3);
    write_blocks(&path, &blocks);

    let report = LogRecovery::verify(&path).unwrap();

    assert!(report.is_clean());
    assert_eq!(report.blocks, 3);
    assert_eq!(report.transactions, 1 + 2 + 3);
    assert_eq!(report.valid_len, report.file_len);
    assert_eq!(report.last_block_hash, Some(*blocks[2].block_hash()));
    assert!(!report.was_truncated);
}

#[test]
fn test_verify_empty_log() {
    let (_temp, path) = setup_temp_log();
    fs::File::create(&path).unwrap();

    let report = LogRecovery::verify(&path).unwrap();

    assert!(report.is_clean());
    assert_eq!(report.blocks, 0);
    assert_eq!(report.valid_len, 0);
    assert_eq!(report.last_block_hash, None);
}

#[test]
fn test_verify_detects_broken_link() {
    let (_temp, path) = setup_temp_log();
    let b0 = Block::with_timestamp(genesis_hash(), vec![Transaction::with_timestamp("a", "1", 1)], 1);
    // chains to genesis instead of b0
    let b1 = Block::with_timestamp(genesis_hash(), vec![Transaction::with_timestamp("b", "2", 2)], 2);
    write_blocks(&path, &[b0.clone(), b1]);

    let report = LogRecovery::verify(&path).unwrap();

    let second_offset = encode(&b0).unwrap().len() as u64;
    assert_eq!(report.broken_links, vec![second_offset]);
    assert!(report.hash_mismatches.is_empty());
    assert!(!report.is_clean());
}

#[test]
fn test_verify_detects_trailer_mismatch() {
    let (_temp, path) = setup_temp_log();
    let block = linked_blocks(1).remove(0);
    let mut record = encode(&block).unwrap().to_vec();
    let last = record.len() - 1;
    record[last] ^= 0xFF;
    fs::write(&path, &record).unwrap();

    let report = LogRecovery::verify(&path).unwrap();

    assert_eq!(report.hash_mismatches, vec![0]);
    assert!(report.broken_links.is_empty());
}

#[test]
fn test_verify_surfaces_malformed_body() {
    let (_temp, path) = setup_temp_log();
    write_blocks(&path, &linked_blocks(1));

    let body = b"garbage!";
    let mut raw = (body.len() as u32).to_le_bytes().to_vec();
    raw.extend_from_slice(body);
    raw.extend_from_slice(&[0u8; 32]);
    append_raw(&path, &raw);

    assert!(matches!(LogRecovery::verify(&path), Err(ChainError::Decode(_))));
}

// =============================================================================
// Torn Tail Tests
// =============================================================================

#[test]
fn test_verify_reports_torn_tail() {
    let (_temp, path) = setup_temp_log();
    let blocks = linked_blocks(2);
    write_blocks(&path, &blocks);
    let clean_len = fs::metadata(&path).unwrap().len();

    let partial = encode(&linked_blocks(3)[2]).unwrap();
    append_raw(&path, &partial[..partial.len() / 2]);

    let report = LogRecovery::verify(&path).unwrap();

    assert!(report.torn_tail);
    assert_eq!(report.blocks, 2);
    assert_eq!(report.valid_len, clean_len);
    assert!(report.file_len > clean_len);
    // verify never modifies the file
    assert_eq!(fs::metadata(&path).unwrap().len(), report.file_len);
}

#[test]
fn test_truncate_torn_tail() {
    let (_temp, path) = setup_temp_log();
    let blocks = linked_blocks(2);
    write_blocks(&path, &blocks);
    let clean_len = fs::metadata(&path).unwrap().len();
    append_raw(&path, &[7, 0, 0]);

    let report = LogRecovery::truncate_torn_tail(&path).unwrap();

    assert!(report.was_truncated);
    assert_eq!(fs::metadata(&path).unwrap().len(), clean_len);

    let after = LogRecovery::verify(&path).unwrap();
    assert!(after.is_clean());
    assert_eq!(after.last_block_hash, Some(*blocks[1].block_hash()));
}

#[test]
fn test_truncate_clean_log_is_noop() {
    let (_temp, path) = setup_temp_log();
    write_blocks(&path, &linked_blocks(2));
    let len = fs::metadata(&path).unwrap().len();

    let report = LogRecovery::truncate_torn_tail(&path).unwrap();

    assert!(!report.was_truncated);
    assert_eq!(fs::metadata(&path).unwrap().len(), len);
}
