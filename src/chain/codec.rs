//! Record codec
//!
//! Encoding and decoding of framed block records.
//!
//! ## Record Format
//! ```text
//! ┌──────────┬──────────────────────────┬──────────────────┐
//! │ Len (4)  │   JSON Block (Len bytes) │  BlockHash (32)  │
//! └──────────┴──────────────────────────┴──────────────────┘
//! ```

use std::io::{self, Read, Seek};

use bytes::{BufMut, Bytes, BytesMut};

use crate::error::{ChainError, Field, Result};

use super::{Block, Digest, DIGEST_SIZE};

/// Length prefix size
pub const HEADER_SIZE: usize = 4;

/// Encode a block into a framed record
///
/// Format: len (4, LE) + JSON body + block hash (32)
pub fn encode(block: &Block) -> Result<Bytes> {
    let body = serde_json::to_vec(block)
        .map_err(|e| ChainError::Serialization(format!("Failed to encode block: {}", e)))?;

    let body_len = u32::try_from(body.len()).map_err(|_| {
        ChainError::Serialization(format!("Block body too large: {} bytes", body.len()))
    })?;

    let mut record = BytesMut::with_capacity(HEADER_SIZE + body.len() + DIGEST_SIZE);
    record.put_u32_le(body_len);
    record.put_slice(&body);
    record.put_slice(block.block_hash());

    Ok(record.freeze())
}

/// A decoded record with its framing metadata
#[derive(Debug, Clone)]
pub struct Record {
    pub block: Block,
    /// Where the record starts
    pub offset: u64,
    /// Total framed length
    pub len: u64,
    /// Trailing 32 bytes as stored on disk
    pub trailer: Digest,
}

/// Decode the record at the reader's current position
///
/// Returns the block and the offset its record starts at. On success the
/// reader sits on the next record boundary (or end of stream).
///
/// Errors:
/// - `ShortRead { field: Header, actual: 0 }`: clean end of log
/// - `ShortRead` on any other field: truncated record
/// - `Decode`: malformed JSON body
pub fn decode<R: Read + Seek>(reader: &mut R) -> Result<(Block, u64)> {
    let record = decode_record(reader)?;
    Ok((record.block, record.offset))
}

/// Decode a record keeping its length and trailing digest
pub fn decode_record<R: Read + Seek>(reader: &mut R) -> Result<Record> {
    let offset = reader.stream_position()?;

    let mut header = [0u8; HEADER_SIZE];
    let n = read_full(reader, &mut header)?;
    if n < HEADER_SIZE {
        return Err(ChainError::ShortRead {
            field: Field::Header,
            expected: HEADER_SIZE,
            actual: n,
        });
    }
    let body_len = u32::from_le_bytes(header) as usize;

    // take() bounds the allocation by what's actually on disk
    let mut body = Vec::new();
    let n = reader.by_ref().take(body_len as u64).read_to_end(&mut body)?;
    if n < body_len {
        return Err(ChainError::ShortRead {
            field: Field::Body,
            expected: body_len,
            actual: n,
        });
    }

    let block: Block = serde_json::from_slice(&body).map_err(|e| {
        ChainError::Decode(format!("Malformed block at offset {}: {}", offset, e))
    })?;

    let mut trailer = [0u8; DIGEST_SIZE];
    let n = read_full(reader, &mut trailer)?;
    if n < DIGEST_SIZE {
        return Err(ChainError::ShortRead {
            field: Field::Digest,
            expected: DIGEST_SIZE,
            actual: n,
        });
    }

    Ok(Record {
        block,
        offset,
        len: (HEADER_SIZE + body_len + DIGEST_SIZE) as u64,
        trailer,
    })
}

/// Like read_exact, but reports how many bytes were available
fn read_full<R: Read>(reader: &mut R, buf: &mut [u8]) -> io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
    Ok(filled)
}
