//! # ChainLog
//!
//! An append-only, hash-chained transaction log with:
//! - Length-prefixed, digest-trailed block records on a single file
//! - Blocks cut by size or by a periodic timer, fsynced before they count
//! - Exact (inverted) or approximate (bloom filter) key index, or full scans
//! - Single-actor coordinator owning all mutable state
//! - TCP-based client protocol
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      TCP Server                              │
//! │                  (Multiple Clients)                          │
//! └─────────────────────┬───────────────────────────────────────┘
//!                       │ Chain handle
//! ┌─────────────────────▼───────────────────────────────────────┐
//! │                     Coordinator                              │
//! │          (one thread, events processed in order)             │
//! └──────────┬──────────────────────────────┬───────────────────┘
//!            │ flush                        │ search
//!            ▼                              ▼
//!   ┌─────────────────┐  update    ┌─────────────────┐
//!   │    LogWriter    │ ─────────▶ │      Index      │
//!   │ (append + sync) │            │ (exact / bloom) │
//!   └────────┬────────┘            └────────┬────────┘
//!            │                              │ read_at
//!            ▼                              ▼
//!   ┌─────────────────────────────────────────────────┐
//!   │ chain.log  [len][json block][block hash] ...    │
//!   └─────────────────────────────────────────────────┘
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod config;

pub mod chain;
pub mod store;
pub mod index;
pub mod search;
pub mod coordinator;
pub mod network;
pub mod protocol;

// =============================================================================
// Public API Re-exports
// =============================================================================

pub use error::{ChainError, Result};
pub use config::{Config, IndexKind};
pub use chain::{Block, Digest, Transaction};
pub use coordinator::{Chain, ChainStats};
pub use search::SearchOutcome;

// =============================================================================
// Version Info
// =============================================================================

/// Current version of ChainLog
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
