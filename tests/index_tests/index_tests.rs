//! Tests for the key indexes over real log files
//!
//! These tests verify:
//! - Build from an existing log, then incremental updates
//! - Both variants agree with a full scan (property test)
//! - Repeated keys inside one block come back once per occurrence
//! - The `index::build` factory picks the right variant

use std::path::{Path, PathBuf};

use chainlog::chain::{encode, genesis_hash, Block, Transaction};
use chainlog::config::IndexKind;
use chainlog::error::ChainError;
use chainlog::index::{self, BloomFilterIndex, Index, InvertedIndex};
use chainlog::store::{LogReader, LogWriter};
use proptest::prelude::*;
use tempfile::TempDir;

// =============================================================================
// Helper Functions
// =============================================================================

fn setup_temp_log() -> (TempDir, PathBuf) {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("chain.log");
    (temp_dir, path)
}

/// Write a linked chain where block `i` holds `batches[i]` as (key, value)
fn write_chain(path: &Path, batches: &[Vec<(String, String)>]) -> Vec<(u64, Block)> {
    let mut writer = LogWriter::open(path).unwrap();
    let mut prev = genesis_hash();
    let mut written = Vec::new();

    for (i, batch) in batches.iter().enumerate() {
        let txs = batch
            .iter()
            .map(|(k, v)| Transaction::with_timestamp(k.clone(), v.clone(), i as i64))
            .collect();
        let block = Block::with_timestamp(prev, txs, i as i64);
        let offset = writer.len().unwrap();
        writer.append(&encode(&block).unwrap()).unwrap();
        prev = *block.block_hash();
        written.push((offset, block));
    }
    written
}

fn kv(pairs: &[(&str, &str)]) -> Vec<(String, String)> {
    pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
}

fn values(result: chainlog::Result<Vec<Transaction>>) -> Vec<String> {
    match result {
        Ok(txs) => txs.iter().map(|tx| tx.value().to_string()).collect(),
        Err(ChainError::KeyNotFound) => Vec::new(),
        Err(e) => panic!("unexpected error: {}", e),
    }
}

// =============================================================================
// Build + Update Tests
// =============================================================================

#[test]
fn test_inverted_build_then_update() {
    let (_temp, path) = setup_temp_log();
    write_chain(&path, &[kv(&[("hello", "1"), ("apple", "2")]), kv(&[("banana", "3")])]);

    let (index, end) = InvertedIndex::build(LogReader::open(&path).unwrap()).unwrap();
    assert_eq!(end, std::fs::metadata(&path).unwrap().len());
    assert_eq!(values(index.get("hello")), vec!["1"]);

    // a block appended after the build
    let reader = LogReader::open(&path).unwrap();
    let prev = reader.tail_hash().unwrap();
    let block = Block::with_timestamp(prev, vec![Transaction::with_timestamp("hello", "4", 9)], 9);
    LogWriter::open(&path).unwrap().append(&encode(&block).unwrap()).unwrap();
    index.update(end, &block);

    assert_eq!(values(index.get("hello")), vec!["1", "4"]);
    assert_eq!(index.offsets("hello"), vec![0, end]);
}

#[test]
fn test_bloom_build_then_update() {
    let (_temp, path) = setup_temp_log();
    write_chain(&path, &[kv(&[("hello", "1")]), kv(&[("world", "2")])]);

    let (index, end) = BloomFilterIndex::build(LogReader::open(&path).unwrap()).unwrap();
    assert_eq!(index.block_count(), 2);

    let reader = LogReader::open(&path).unwrap();
    let block = Block::with_timestamp(
        reader.tail_hash().unwrap(),
        vec![Transaction::with_timestamp("hello", "3", 9)],
        9,
    );
    LogWriter::open(&path).unwrap().append(&encode(&block).unwrap()).unwrap();
    index.update(end, &block);

    assert_eq!(index.block_count(), 3);
    assert_eq!(values(index.get("hello")), vec!["1", "3"]);
    assert!(matches!(index.get("absent"), Err(ChainError::KeyNotFound)));
}

#[test]
fn test_build_on_empty_log() {
    let (_temp, path) = setup_temp_log();
    LogWriter::open(&path).unwrap();

    for kind in [IndexKind::Exact, IndexKind::Bloom] {
        let (built, end) = index::build(kind, LogReader::open(&path).unwrap()).unwrap();
        assert_eq!(end, 0);
        assert_eq!(built.kind(), kind);
        assert!(matches!(built.get("anything"), Err(ChainError::KeyNotFound)));
    }
}

#[test]
fn test_build_fails_on_torn_log() {
    let (_temp, path) = setup_temp_log();
    write_chain(&path, &[kv(&[("a", "1")])]);
    let len = std::fs::metadata(&path).unwrap().len();
    std::fs::OpenOptions::new()
        .write(true)
        .open(&path)
        .unwrap()
        .set_len(len - 3)
        .unwrap();

    for kind in [IndexKind::Exact, IndexKind::Bloom] {
        let result = index::build(kind, LogReader::open(&path).unwrap());
        assert!(matches!(result, Err(ChainError::ShortRead { .. })));
    }
}

#[test]
fn test_repeated_key_in_block() {
    let (_temp, path) = setup_temp_log();
    write_chain(&path, &[kv(&[("k", "a"), ("k", "b")])]);

    let (inverted, _) = InvertedIndex::build(LogReader::open(&path).unwrap()).unwrap();
    let (bloom, _) = BloomFilterIndex::build(LogReader::open(&path).unwrap()).unwrap();

    // one offset per occurrence, but the block is only read once
    assert_eq!(inverted.offsets("k"), vec![0, 0]);
    assert_eq!(values(inverted.get("k")), vec!["a", "b"]);
    assert_eq!(values(bloom.get("k")), vec!["a", "b"]);
    assert_eq!(values(LogReader::open(&path).unwrap().full_scan("k")), vec!["a", "b"]);
}

// =============================================================================
// Equivalence Property
// =============================================================================

/// Blocks drawn from a tiny key alphabet, so keys repeat within and across blocks
fn batches_strategy() -> impl Strategy<Value = Vec<Vec<(String, String)>>> {
    let pair = ("[a-c]{1,2}", "[0-9]{1,3}");
    prop::collection::vec(prop::collection::vec(pair, 0..6), 0..8)
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn prop_indexes_agree_with_full_scan(
        batches in batches_strategy(),
        probes in prop::collection::vec("[a-g]{1,2}", 1..8),
    ) {
        let (_temp, path) = setup_temp_log();
        write_chain(&path, &batches);

        let reader = LogReader::open(&path).unwrap();
        let (inverted, _) = InvertedIndex::build(reader.clone()).unwrap();
        let (bloom, _) = BloomFilterIndex::build(reader.clone()).unwrap();

        for key in &probes {
            let expected = values(reader.full_scan(key));
            prop_assert_eq!(&values(inverted.get(key)), &expected);
            prop_assert_eq!(&values(bloom.get(key)), &expected);
        }
    }
}
