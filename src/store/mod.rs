//! Log Store Module
//!
//! Append-only file holding framed block records.
//!
//! ## Responsibilities
//! - Durable append (write + fsync before success)
//! - Offset-addressed reads through a shared, lock-guarded handle
//! - Tail-hash recovery from the last 32 bytes of the file
//! - Full linear scan when no index is kept
//! - Verification and torn-tail repair after a crash
//!
//! ## Handles
//! The coordinator owns the single `LogWriter`. Every read goes through a
//! `LogReader`, whose seek + read pairs run under one mutex since the
//! underlying file position is shared.

mod writer;
mod reader;
mod recovery;

pub use writer::LogWriter;
pub use reader::LogReader;
pub use recovery::{LogRecovery, RecoveryReport};
