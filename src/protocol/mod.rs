//! Protocol Module
//!
//! Wire protocol between `chainlog-cli` and `chainlog-server`.
//!
//! ## Protocol Format (V1 - Simple Binary)
//!
//! ### Request Format
//! ```text
//! ┌──────────┬──────────┬─────────────────────────────┐
//! │ Cmd (1)  │ Len (4)  │         Payload             │
//! └──────────┴──────────┴─────────────────────────────┘
//! ```
//!
//! ### Commands
//! - 0x01: SUBMIT - Payload: key_len (4) + key + value
//! - 0x02: SEARCH - Payload: timeout_ms (4) + key
//! - 0x03: PING   - Payload: empty
//!
//! ### Response Format
//! ```text
//! ┌──────────┬──────────┬─────────────────────────────┐
//! │Status(1) │ Len (4)  │         Payload             │
//! └──────────┴──────────┴─────────────────────────────┘
//! ```
//!
//! ### Status Codes
//! - 0x00: OK        (JSON array of transactions, or PONG)
//! - 0x01: ACCEPTED  (transaction id, base64)
//! - 0x02: NOT_FOUND
//! - 0x03: TIMED_OUT
//! - 0x04: ERROR     (message)

mod command;
mod response;
mod codec;

pub use command::{Command, CommandType};
pub use response::{Response, Status};
pub use codec::{
    decode_command, decode_response, encode_command, encode_response, read_command, read_response,
    write_command, write_response, HEADER_SIZE, MAX_PAYLOAD_SIZE,
};
