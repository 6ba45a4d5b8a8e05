//! Error types for ChainLog
//!
//! Provides a unified error type for all operations.

use std::fmt;

use thiserror::Error;

/// Result type alias using ChainError
pub type Result<T> = std::result::Result<T, ChainError>;

/// Framing field that a short read happened on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    /// 4-byte length prefix
    Header,
    /// JSON body
    Body,
    /// 32-byte trailing block hash
    Digest,
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Field::Header => f.write_str("header"),
            Field::Body => f.write_str("body"),
            Field::Digest => f.write_str("digest"),
        }
    }
}

/// Unified error type for ChainLog operations
#[derive(Debug, Error)]
pub enum ChainError {
    // -------------------------------------------------------------------------
    // I/O Errors
    // -------------------------------------------------------------------------
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // -------------------------------------------------------------------------
    // Framing Errors
    // -------------------------------------------------------------------------
    #[error("Short read on {field}: expected {expected} bytes, got {actual}")]
    ShortRead {
        field: Field,
        expected: usize,
        actual: usize,
    },

    #[error("Decode error: {0}")]
    Decode(String),

    // -------------------------------------------------------------------------
    // Lookup Errors
    // -------------------------------------------------------------------------
    #[error("Key not found")]
    KeyNotFound,

    #[error("Search timed out")]
    TimedOut,

    // -------------------------------------------------------------------------
    // Coordinator Errors
    // -------------------------------------------------------------------------
    #[error("Chain is shut down")]
    Closed,

    // -------------------------------------------------------------------------
    // Serialization Errors
    // -------------------------------------------------------------------------
    #[error("Serialization error: {0}")]
    Serialization(String),

    // -------------------------------------------------------------------------
    // Network Errors
    // -------------------------------------------------------------------------
    #[error("Protocol error: {0}")]
    Protocol(String),

    // -------------------------------------------------------------------------
    // Configuration Errors
    // -------------------------------------------------------------------------
    #[error("Configuration error: {0}")]
    Config(String),
}

impl ChainError {
    /// True when a read stopped cleanly on a record boundary
    pub fn is_end_of_log(&self) -> bool {
        matches!(
            self,
            ChainError::ShortRead {
                field: Field::Header,
                actual: 0,
                ..
            }
        )
    }
}
