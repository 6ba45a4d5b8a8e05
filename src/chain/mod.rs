//! Chain Module
//!
//! Transactions, hash-chained blocks and the on-disk record codec.
//! Pure: nothing in here touches the filesystem.
//!
//! ## Record Format
//! ```text
//! ┌──────────────────────────────────────────────────────┐
//! │ Record 1                                             │
//! │ ┌─────────┬────────────────────┬──────────────────┐  │
//! │ │ Len (4) │ JSON Block (Len)   │ BlockHash (32)   │  │
//! │ └─────────┴────────────────────┴──────────────────┘  │
//! ├──────────────────────────────────────────────────────┤
//! │ Record 2 ...                                         │
//! └──────────────────────────────────────────────────────┘
//! ```
//! Len is little-endian. Records are contiguous, no padding. The trailing
//! hash of the last record is the chain tip.

mod transaction;
mod block;
mod codec;

use sha2::{Digest as _, Sha256};

pub use transaction::Transaction;
pub use block::Block;
pub use codec::{decode, decode_record, encode, Record, HEADER_SIZE};

/// Size of every hash in the chain
pub const DIGEST_SIZE: usize = 32;

/// Seed string of the genesis digest
pub const GENESIS_SEED: &str = "Genesis block";

/// SHA-256 output
pub type Digest = [u8; DIGEST_SIZE];

/// Hash that the first block of an empty log chains to
pub fn genesis_hash() -> Digest {
    Sha256::digest(GENESIS_SEED.as_bytes()).into()
}

/// Current unix time in seconds
pub(crate) fn unix_now() -> i64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or_default()
}

/// Short hex prefix of a digest, for logs
pub fn short_hash(digest: &Digest) -> String {
    digest[..6].iter().map(|b| format!("{:02x}", b)).collect()
}

/// Digests travel through JSON as standard padded base64
pub(crate) mod serde_digest {
    use base64::engine::general_purpose::STANDARD;
    use base64::Engine as _;
    use serde::de::Error as _;
    use serde::{Deserialize, Deserializer, Serializer};

    use super::{Digest, DIGEST_SIZE};

    pub fn serialize<S: Serializer>(digest: &Digest, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&STANDARD.encode(digest))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Digest, D::Error> {
        let encoded = String::deserialize(deserializer)?;
        let raw = STANDARD.decode(encoded.as_bytes()).map_err(D::Error::custom)?;
        raw.as_slice().try_into().map_err(|_| {
            D::Error::custom(format!(
                "digest must be {} bytes, got {}",
                DIGEST_SIZE,
                raw.len()
            ))
        })
    }
}
