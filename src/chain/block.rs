//! Block definitions
//!
//! An ordered batch of transactions chained to its predecessor by hash.

use serde::{Deserialize, Serialize};
use sha2::{Digest as _, Sha256};

use super::{serde_digest, unix_now, Digest, Transaction};

/// An immutable, hash-chained batch of transactions
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Block {
    /// Unix seconds
    #[serde(rename = "Timestamp")]
    timestamp: i64,

    #[serde(rename = "prev-block-hash", with = "serde_digest")]
    prev_block_hash: Digest,

    /// SHA-256(tx ids ‖ decimal timestamp)
    #[serde(rename = "block-hash", with = "serde_digest")]
    block_hash: Digest,

    /// Ingestion order
    transactions: Vec<Transaction>,
}

impl Block {
    /// Build a block stamped with the current time
    pub fn new(prev_block_hash: Digest, transactions: Vec<Transaction>) -> Self {
        Self::with_timestamp(prev_block_hash, transactions, unix_now())
    }

    /// Build a block with an explicit timestamp
    pub fn with_timestamp(prev_block_hash: Digest, transactions: Vec<Transaction>, timestamp: i64) -> Self {
        Self {
            timestamp,
            prev_block_hash,
            block_hash: compute_hash(&transactions, timestamp),
            transactions,
        }
    }

    /// Recompute the hash from contents and compare with the stored one
    pub fn is_hash_valid(&self) -> bool {
        compute_hash(&self.transactions, self.timestamp) == self.block_hash
    }

    pub fn timestamp(&self) -> i64 {
        self.timestamp
    }

    pub fn prev_block_hash(&self) -> &Digest {
        &self.prev_block_hash
    }

    pub fn block_hash(&self) -> &Digest {
        &self.block_hash
    }

    pub fn transactions(&self) -> &[Transaction] {
        &self.transactions
    }

    /// Transactions whose key equals `key`, in block order
    pub fn matching<'a>(&'a self, key: &'a str) -> impl Iterator<Item = &'a Transaction> + 'a {
        self.transactions.iter().filter(move |tx| tx.key() == key)
    }
}

fn compute_hash(transactions: &[Transaction], timestamp: i64) -> Digest {
    let mut hasher = Sha256::new();
    for tx in transactions {
        hasher.update(tx.id());
    }
    hasher.update(timestamp.to_string().as_bytes());
    hasher.finalize().into()
}
