//! Transaction definitions
//!
//! A single key/value write, identified by its content digest.

use serde::{Deserialize, Serialize};
use sha2::{Digest as _, Sha256};

use super::{serde_digest, unix_now, Digest};

/// An immutable key/value transaction
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    /// SHA-256(key ‖ value ‖ decimal timestamp)
    #[serde(with = "serde_digest")]
    id: Digest,

    key: String,

    value: String,

    /// Unix seconds
    timestamp: i64,
}

impl Transaction {
    /// Create a transaction stamped with the current time
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self::with_timestamp(key, value, unix_now())
    }

    /// Create a transaction with an explicit timestamp
    ///
    /// Identical (key, value, timestamp) triples produce identical ids.
    pub fn with_timestamp(key: impl Into<String>, value: impl Into<String>, timestamp: i64) -> Self {
        let key = key.into();
        let value = value.into();

        let mut hasher = Sha256::new();
        hasher.update(key.as_bytes());
        hasher.update(value.as_bytes());
        hasher.update(timestamp.to_string().as_bytes());

        Self {
            id: hasher.finalize().into(),
            key,
            value,
            timestamp,
        }
    }

    pub fn id(&self) -> &Digest {
        &self.id
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn value(&self) -> &str {
        &self.value
    }

    pub fn timestamp(&self) -> i64 {
        self.timestamp
    }
}
