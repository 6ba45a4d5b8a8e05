//! Configuration for ChainLog
//!
//! Centralized configuration with sensible defaults.

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use crate::error::{ChainError, Result};

/// Main configuration for a ChainLog instance
#[derive(Debug, Clone)]
pub struct Config {
    // -------------------------------------------------------------------------
    // Log Configuration
    // -------------------------------------------------------------------------
    /// Path of the append-only block log
    pub data_file: PathBuf,

    /// Truncate a partially written final record on startup
    pub repair_torn_tail: bool,

    // -------------------------------------------------------------------------
    // Block Configuration
    // -------------------------------------------------------------------------
    /// Number of pending transactions that triggers an eager flush
    pub block_size: usize,

    /// Period of the flush timer
    pub flush_period: Duration,

    // -------------------------------------------------------------------------
    // Index Configuration
    // -------------------------------------------------------------------------
    /// Maintain an in-memory index (otherwise searches do a full scan)
    pub index_enabled: bool,

    /// Which index variant to build
    pub index_kind: IndexKind,

    // -------------------------------------------------------------------------
    // Request Limits
    // -------------------------------------------------------------------------
    /// Max key length in bytes
    pub key_max_size: usize,

    /// Max value length in bytes
    pub value_max_size: usize,

    /// Default deadline for searches that don't carry their own
    pub search_timeout: Duration,

    /// How long shutdown waits for the coordinator to confirm
    pub shutdown_grace: Duration,

    // -------------------------------------------------------------------------
    // Network Configuration
    // -------------------------------------------------------------------------
    /// TCP listen address
    pub listen_addr: String,

    /// Max concurrent client connections
    pub max_connections: usize,

    /// Connection read timeout (milliseconds)
    pub read_timeout_ms: u64,

    /// Connection write timeout (milliseconds)
    pub write_timeout_ms: u64,
}

/// Index variant selection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexKind {
    /// Key -> block offsets, exact
    Exact,

    /// Per-block bloom filters, approximate pre-filter
    Bloom,
}

impl FromStr for IndexKind {
    type Err = ChainError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "exact" => Ok(IndexKind::Exact),
            "bloom" => Ok(IndexKind::Bloom),
            other => Err(ChainError::Config(format!(
                "Unknown index kind '{}' (expected 'exact' or 'bloom')",
                other
            ))),
        }
    }
}

impl fmt::Display for IndexKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IndexKind::Exact => f.write_str("exact"),
            IndexKind::Bloom => f.write_str("bloom"),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_file: PathBuf::from("./chainlog_data/chain.log"),
            repair_torn_tail: false,
            block_size: 100,
            flush_period: Duration::from_secs(1),
            index_enabled: true,
            index_kind: IndexKind::Exact,
            key_max_size: 256,
            value_max_size: 4096,
            search_timeout: Duration::from_secs(1),
            shutdown_grace: Duration::from_secs(1),
            listen_addr: "127.0.0.1:7070".to_string(),
            max_connections: 1024,
            read_timeout_ms: 5000,
            write_timeout_ms: 5000,
        }
    }
}

impl Config {
    /// Create a new config builder
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::default()
    }

    /// Check invariants the coordinator relies on
    pub fn validate(&self) -> Result<()> {
        if self.block_size == 0 {
            return Err(ChainError::Config("block_size must be > 0".to_string()));
        }
        if self.flush_period.is_zero() {
            return Err(ChainError::Config("flush_period must be > 0".to_string()));
        }
        if self.key_max_size == 0 {
            return Err(ChainError::Config("key_max_size must be > 0".to_string()));
        }
        Ok(())
    }
}

/// Builder for Config
#[derive(Default)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Set the log file path
    pub fn data_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.data_file = path.into();
        self
    }

    /// Truncate a torn final record on startup
    pub fn repair_torn_tail(mut self, repair: bool) -> Self {
        self.config.repair_torn_tail = repair;
        self
    }

    /// Set the transaction count that triggers an eager flush
    pub fn block_size(mut self, size: usize) -> Self {
        self.config.block_size = size;
        self
    }

    /// Set the flush timer period
    pub fn flush_period(mut self, period: Duration) -> Self {
        self.config.flush_period = period;
        self
    }

    /// Enable or disable the in-memory index
    pub fn index_enabled(mut self, enabled: bool) -> Self {
        self.config.index_enabled = enabled;
        self
    }

    /// Select the index variant
    pub fn index_kind(mut self, kind: IndexKind) -> Self {
        self.config.index_kind = kind;
        self
    }

    /// Set the max key length in bytes
    pub fn key_max_size(mut self, size: usize) -> Self {
        self.config.key_max_size = size;
        self
    }

    /// Set the max value length in bytes
    pub fn value_max_size(mut self, size: usize) -> Self {
        self.config.value_max_size = size;
        self
    }

    /// Set the default search deadline
    pub fn search_timeout(mut self, timeout: Duration) -> Self {
        self.config.search_timeout = timeout;
        self
    }

    /// Set the shutdown grace period
    pub fn shutdown_grace(mut self, grace: Duration) -> Self {
        self.config.shutdown_grace = grace;
        self
    }

    /// Set the TCP listen address
    pub fn listen_addr(mut self, addr: impl Into<String>) -> Self {
        self.config.listen_addr = addr.into();
        self
    }

    /// Set the maximum number of concurrent connections
    pub fn max_connections(mut self, count: usize) -> Self {
        self.config.max_connections = count;
        self
    }

    /// Set the read timeout (in milliseconds)
    pub fn read_timeout_ms(mut self, ms: u64) -> Self {
        self.config.read_timeout_ms = ms;
        self
    }

    /// Set the write timeout (in milliseconds)
    pub fn write_timeout_ms(mut self, ms: u64) -> Self {
        self.config.write_timeout_ms = ms;
        self
    }

    pub fn build(self) -> Result<Config> {
        self.config.validate()?;
        Ok(self.config)
    }
}
