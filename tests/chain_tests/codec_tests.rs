//! Tests for the block record codec
//!
//! These tests verify:
//! - Exact on-disk layout of a known block (golden bytes)
//! - Sequential decoding lands on record boundaries
//! - Clean end of log vs a partial header
//! - Digest fields of the wrong length
//! - Decoding a record that follows arbitrary leading bytes

use std::io::{Cursor, Seek, SeekFrom};

use chainlog::chain::{decode, decode_record, encode, genesis_hash, Block, Transaction, HEADER_SIZE};
use chainlog::error::{ChainError, Field};

const GOLDEN_BODY: &str = concat!(
    r#"{"Timestamp":1700000001,"#,
    r#""prev-block-hash":"TheBEBHsIXrISp4DeoJ1in3jGDQohqiKN+ur+Q9Sr3M=","#,
    r#""block-hash":"bPhXLITqDBgjcT/f1bb9on0NH3vhsjb6Sa1wE/fwX4U=","#,
    r#""transactions":[{"id":"dIZpukBo4M5HbAxlg5FOjA4NGT5TzxobQTo8sRBbDoY=","#,
    r#""key":"key1","value":"value1","timestamp":1700000000}]}"#
);

const GOLDEN_HASH_HEX: &str = "6cf8572c84ea0c1823713fdfd5b6fda27d0d1f7be1b236fa49ad7013f7f05f85";

// =============================================================================
// Helper Functions
// =============================================================================

fn golden_block() -> Block {
    Block::with_timestamp(
        genesis_hash(),
        vec![Transaction::with_timestamp("key1", "value1", 1_700_000_000)],
        1_700_000_001,
    )
}

fn hex(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{:02x}", b)).collect()
}

fn chain_of(len: usize) -> Vec<Block> {
    let mut prev = genesis_hash();
    (0..len)
        .map(|i| {
            let block = Block::with_timestamp(
                prev,
                vec![Transaction::with_timestamp(format!("key{}", i), format!("value{}", i), i as i64)],
                i as i64,
            );
            prev = *block.block_hash();
            block
        })
        .collect()
}

fn log_bytes(blocks: &[Block]) -> Vec<u8> {
    blocks.iter().flat_map(|b| encode(b).unwrap().to_vec()).collect()
}

// =============================================================================
// Layout Tests
// =============================================================================

#[test]
fn test_golden_record_layout() {
    let record = encode(&golden_block()).unwrap();
    let body_len = GOLDEN_BODY.len();

    assert_eq!(record.len(), HEADER_SIZE + body_len + 32);
    assert_eq!(&record[..4], &(body_len as u32).to_le_bytes());
    assert_eq!(std::str::from_utf8(&record[4..4 + body_len]).unwrap(), GOLDEN_BODY);
    assert_eq!(hex(&record[4 + body_len..]), GOLDEN_HASH_HEX);
}

#[test]
fn test_golden_record_decodes() {
    let mut bytes = (GOLDEN_BODY.len() as u32).to_le_bytes().to_vec();
    bytes.extend_from_slice(GOLDEN_BODY.as_bytes());
    bytes.extend_from_slice(golden_block().block_hash());

    let (block, offset) = decode(&mut Cursor::new(bytes)).unwrap();

    assert_eq!(offset, 0);
    assert_eq!(block, golden_block());
    assert!(block.is_hash_valid());
    assert_eq!(hex(block.block_hash()), GOLDEN_HASH_HEX);
}

// =============================================================================
// Sequential Decode Tests
// =============================================================================

#[test]
fn test_decode_sequence_and_offsets() {
    let blocks = chain_of(4);
    let bytes = log_bytes(&blocks);
    let total = bytes.len() as u64;
    let mut cursor = Cursor::new(bytes);

    let mut expected_offset = 0u64;
    for expected in &blocks {
        let record = decode_record(&mut cursor).unwrap();
        assert_eq!(record.offset, expected_offset);
        assert_eq!(&record.block, expected);
        assert_eq!(&record.trailer, expected.block_hash());
        expected_offset += record.len;
        assert_eq!(cursor.position(), expected_offset);
    }

    assert_eq!(expected_offset, total);
    let err = decode(&mut cursor).unwrap_err();
    assert!(err.is_end_of_log());
}

#[test]
fn test_decode_after_leading_bytes() {
    let block = golden_block();
    let mut bytes = vec![0xAB; 256];
    bytes.extend_from_slice(&encode(&block).unwrap());

    let mut cursor = Cursor::new(bytes);
    cursor.seek(SeekFrom::Start(256)).unwrap();
    let (decoded, offset) = decode(&mut cursor).unwrap();

    assert_eq!(offset, 256);
    assert_eq!(decoded, block);
}

// =============================================================================
// Failure Tests
// =============================================================================

#[test]
fn test_empty_stream_is_end_of_log() {
    let err = decode(&mut Cursor::new(Vec::new())).unwrap_err();

    assert!(matches!(err, ChainError::ShortRead { field: Field::Header, actual: 0, .. }));
    assert!(err.is_end_of_log());
}

#[test]
fn test_partial_header() {
    let err = decode(&mut Cursor::new(vec![1u8, 0])).unwrap_err();

    assert!(matches!(err, ChainError::ShortRead { field: Field::Header, expected: 4, actual: 2 }));
    assert!(!err.is_end_of_log());
}

#[test]
fn test_digest_must_be_32_bytes() {
    let body = GOLDEN_BODY.replace("TheBEBHsIXrISp4DeoJ1in3jGDQohqiKN+ur+Q9Sr3M=", "AAAA");
    let mut bytes = (body.len() as u32).to_le_bytes().to_vec();
    bytes.extend_from_slice(body.as_bytes());
    bytes.extend_from_slice(&[0u8; 32]);

    let err = decode(&mut Cursor::new(bytes)).unwrap_err();
    assert!(matches!(err, ChainError::Decode(_)));
}
