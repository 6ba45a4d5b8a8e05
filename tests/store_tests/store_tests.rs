//! Tests for LogWriter and LogReader against real files
//!
//! These tests verify:
//! - Appended records are readable at the offsets the writer produced
//! - A reader opened before appends sees the later records
//! - Tail hash tracks the last appended block
//! - Full scans collect matches across blocks in log order

use std::path::PathBuf;

use chainlog::chain::{encode, genesis_hash, Block, Transaction};
use chainlog::error::ChainError;
use chainlog::store::{LogReader, LogWriter};
use tempfile::TempDir;

// =============================================================================
// Helper Functions
// =============================================================================

fn setup_temp_log() -> (TempDir, PathBuf) {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("chain.log");
    (temp_dir, path)
}

/// Append `blocks` and return the offset each one landed at
fn append_all(writer: &mut LogWriter, blocks: &[Block]) -> Vec<u64> {
    blocks
        .iter()
        .map(|block| {
            let offset = writer.len().unwrap();
            writer.append(&encode(block).unwrap()).unwrap();
            offset
        })
        .collect()
}

fn block_after(prev: &Block, txs: Vec<Transaction>, ts: i64) -> Block {
    Block::with_timestamp(*prev.block_hash(), txs, ts)
}

// =============================================================================
// Writer / Reader Tests
// =============================================================================

#[test]
fn test_read_back_appended_blocks() {
    let (_temp, path) = setup_temp_log();
    let mut writer = LogWriter::open(&path).unwrap();

    let b0 = Block::with_timestamp(genesis_hash(), vec![Transaction::with_timestamp("a", "1", 1)], 1);
    let b1 = block_after(&b0, vec![Transaction::with_timestamp("b", "2", 2)], 2);
    let offsets = append_all(&mut writer, &[b0.clone(), b1.clone()]);

    let reader = LogReader::open(&path).unwrap();
    assert_eq!(reader.read_at(offsets[0]).unwrap(), b0);
    assert_eq!(reader.read_at(offsets[1]).unwrap(), b1);
    assert_eq!(reader.len().unwrap(), writer.len().unwrap());
}

#[test]
fn test_reader_sees_later_appends() {
    let (_temp, path) = setup_temp_log();
    let mut writer = LogWriter::open(&path).unwrap();
    let reader = LogReader::open(&path).unwrap();

    assert!(reader.is_empty().unwrap());

    let b0 = Block::with_timestamp(genesis_hash(), vec![Transaction::with_timestamp("a", "1", 1)], 1);
    let offsets = append_all(&mut writer, &[b0.clone()]);

    assert_eq!(reader.read_at(offsets[0]).unwrap(), b0);
    assert_eq!(&reader.tail_hash().unwrap(), b0.block_hash());
}

#[test]
fn test_tail_hash_follows_appends() {
    let (_temp, path) = setup_temp_log();
    let mut writer = LogWriter::open(&path).unwrap();
    let reader = LogReader::open(&path).unwrap();

    let b0 = Block::with_timestamp(genesis_hash(), vec![Transaction::with_timestamp("a", "1", 1)], 1);
    let b1 = block_after(&b0, vec![Transaction::with_timestamp("a", "2", 2)], 2);

    append_all(&mut writer, &[b0.clone()]);
    assert_eq!(&reader.tail_hash().unwrap(), b0.block_hash());

    append_all(&mut writer, &[b1.clone()]);
    assert_eq!(&reader.tail_hash().unwrap(), b1.block_hash());
}

#[test]
fn test_tail_hash_on_empty_file() {
    let (_temp, path) = setup_temp_log();
    LogWriter::open(&path).unwrap();

    let reader = LogReader::open(&path).unwrap();
    assert!(matches!(reader.tail_hash(), Err(ChainError::ShortRead { actual: 0, .. })));
}

#[test]
fn test_open_missing_file_for_read() {
    let (_temp, path) = setup_temp_log();

    assert!(matches!(LogReader::open(&path), Err(ChainError::Io(_))));
}

// =============================================================================
// Replay / Full Scan Tests
// =============================================================================

#[test]
fn test_replay_reports_offsets_and_end() {
    let (_temp, path) = setup_temp_log();
    let mut writer = LogWriter::open(&path).unwrap();

    let b0 = Block::with_timestamp(genesis_hash(), vec![Transaction::with_timestamp("a", "1", 1)], 1);
    let b1 = block_after(&b0, vec![], 2);
    let b2 = block_after(&b1, vec![Transaction::with_timestamp("c", "3", 3)], 3);
    let offsets = append_all(&mut writer, &[b0, b1, b2]);

    let reader = LogReader::open(&path).unwrap();
    let mut seen = Vec::new();
    let end = reader.replay(|offset, _| seen.push(offset)).unwrap();

    assert_eq!(seen, offsets);
    assert_eq!(end, writer.len().unwrap());
}

#[test]
fn test_full_scan_over_file() {
    let (_temp, path) = setup_temp_log();
    let mut writer = LogWriter::open(&path).unwrap();

    let b0 = Block::with_timestamp(
        genesis_hash(),
        vec![
            Transaction::with_timestamp("key", "v1", 1),
            Transaction::with_timestamp("other", "x", 1),
        ],
        1,
    );
    let b1 = block_after(&b0, vec![Transaction::with_timestamp("key", "v2", 2)], 2);
    append_all(&mut writer, &[b0, b1]);

    let reader = LogReader::open(&path).unwrap();
    let values: Vec<String> = reader
        .full_scan("key")
        .unwrap()
        .iter()
        .map(|tx| tx.value().to_string())
        .collect();

    assert_eq!(values, vec!["v1", "v2"]);
    assert!(matches!(reader.full_scan("missing"), Err(ChainError::KeyNotFound)));
}
