//! Protocol codec
//!
//! Encoding and decoding functions for the wire protocol.
//!
//! ## Wire Format
//!
//! ### Request (Command) Format
//! ```text
//! ┌──────────┬──────────┬─────────────────────────────┐
//! │ Cmd (1)  │ Len (4)  │         Payload             │
//! └──────────┴──────────┴─────────────────────────────┘
//! ```
//!
//! ### Payload by Command Type
//! - SUBMIT: key_len (4 bytes) + key + value
//! - SEARCH: timeout_ms (4 bytes) + key
//! - PING:   empty
//!
//! All integers are big-endian. Keys and values must be UTF-8.
//!
//! ### Response Format
//! ```text
//! ┌──────────┬──────────┬─────────────────────────────┐
//! │Status(1) │ Len (4)  │         Payload             │
//! └──────────┴──────────┴─────────────────────────────┘
//! ```

use std::io::{Read, Write};
use std::time::Duration;

use bytes::{BufMut, BytesMut};

use super::{Command, Response, Status};
use crate::error::{ChainError, Result};

/// Header size: 1 byte command/status + 4 bytes length
pub const HEADER_SIZE: usize = 5;

/// Maximum payload size (16 MB)
pub const MAX_PAYLOAD_SIZE: u32 = 16 * 1024 * 1024;

// =============================================================================
// Command Encoding/Decoding
// =============================================================================

/// Encode a command to bytes
///
/// Format: cmd_type (1) + payload_len (4) + payload
pub fn encode_command(command: &Command) -> Vec<u8> {
    let cmd_type = command.command_type() as u8;

    let mut payload = BytesMut::new();
    match command {
        Command::Submit { key, value } => {
            payload.reserve(4 + key.len() + value.len());
            payload.put_u32(key.len() as u32);
            payload.put_slice(key.as_bytes());
            payload.put_slice(value.as_bytes());
        }
        Command::Search { key, timeout } => {
            let timeout_ms = u32::try_from(timeout.as_millis()).unwrap_or(u32::MAX);
            payload.reserve(4 + key.len());
            payload.put_u32(timeout_ms);
            payload.put_slice(key.as_bytes());
        }
        Command::Ping => {}
    }

    frame(cmd_type, &payload)
}

/// Decode a command from bytes
pub fn decode_command(bytes: &[u8]) -> Result<Command> {
    let (cmd_type, payload) = split_frame(bytes, "command")?;

    match cmd_type {
        0x01 => decode_submit_command(payload),
        0x02 => decode_search_command(payload),
        0x03 => decode_ping_command(payload),
        _ => Err(ChainError::Protocol(format!(
            "Unknown command type: 0x{:02x}",
            cmd_type
        ))),
    }
}

/// Decode SUBMIT command payload
fn decode_submit_command(payload: &[u8]) -> Result<Command> {
    let key_len = read_u32(payload, "SUBMIT command: missing key length")? as usize;
    let rest = &payload[4..];

    if rest.len() < key_len {
        return Err(ChainError::Protocol(format!(
            "SUBMIT command: incomplete key (expected {}, got {})",
            key_len,
            rest.len()
        )));
    }

    let key = utf8(&rest[..key_len], "SUBMIT key")?;
    let value = utf8(&rest[key_len..], "SUBMIT value")?;

    Ok(Command::Submit { key, value })
}

/// Decode SEARCH command payload
fn decode_search_command(payload: &[u8]) -> Result<Command> {
    let timeout_ms = read_u32(payload, "SEARCH command: missing timeout")?;
    let key = utf8(&payload[4..], "SEARCH key")?;

    Ok(Command::Search {
        key,
        timeout: Duration::from_millis(u64::from(timeout_ms)),
    })
}

/// Decode PING command payload
fn decode_ping_command(payload: &[u8]) -> Result<Command> {
    if !payload.is_empty() {
        return Err(ChainError::Protocol(format!(
            "PING command: unexpected payload of {} bytes",
            payload.len()
        )));
    }
    Ok(Command::Ping)
}

// =============================================================================
// Response Encoding/Decoding
// =============================================================================

/// Encode a response to bytes
///
/// Format: status (1) + payload_len (4) + payload
pub fn encode_response(response: &Response) -> Vec<u8> {
    let payload = response.payload.as_deref().unwrap_or(&[]);
    frame(response.status as u8, payload)
}

/// Decode a response from bytes
pub fn decode_response(bytes: &[u8]) -> Result<Response> {
    let (status_byte, payload) = split_frame(bytes, "response")?;

    let status = Status::from_byte(status_byte).ok_or_else(|| {
        ChainError::Protocol(format!("Unknown response status: 0x{:02x}", status_byte))
    })?;

    let payload = if payload.is_empty() {
        None
    } else {
        Some(payload.to_vec())
    };

    Ok(Response { status, payload })
}

// =============================================================================
// Stream-based I/O helpers
// =============================================================================

/// Read a complete command from a stream
///
/// Blocks until a complete command is received or an error occurs
pub fn read_command<R: Read>(reader: &mut R) -> Result<Command> {
    let message = read_frame(reader, "command")?;
    decode_command(&message)
}

/// Write a command to a stream
pub fn write_command<W: Write>(writer: &mut W, command: &Command) -> Result<()> {
    let bytes = encode_command(command);
    writer.write_all(&bytes)?;
    writer.flush()?;
    Ok(())
}

/// Read a complete response from a stream
pub fn read_response<R: Read>(reader: &mut R) -> Result<Response> {
    let message = read_frame(reader, "response")?;
    decode_response(&message)
}

/// Write a response to a stream
pub fn write_response<W: Write>(writer: &mut W, response: &Response) -> Result<()> {
    let bytes = encode_response(response);
    writer.write_all(&bytes)?;
    writer.flush()?;
    Ok(())
}

// =============================================================================
// Framing helpers
// =============================================================================

fn frame(tag: u8, payload: &[u8]) -> Vec<u8> {
    let mut message = BytesMut::with_capacity(HEADER_SIZE + payload.len());
    message.put_u8(tag);
    message.put_u32(payload.len() as u32);
    message.put_slice(payload);
    message.to_vec()
}

fn check_payload_len(payload_len: usize, what: &str) -> Result<()> {
    if payload_len > MAX_PAYLOAD_SIZE as usize {
        return Err(ChainError::Protocol(format!(
            "{} payload too large: {} bytes (max {})",
            what, payload_len, MAX_PAYLOAD_SIZE
        )));
    }
    Ok(())
}

/// Split a full message into its tag and payload
fn split_frame<'a>(bytes: &'a [u8], what: &str) -> Result<(u8, &'a [u8])> {
    if bytes.len() < HEADER_SIZE {
        return Err(ChainError::Protocol(format!(
            "Incomplete {} header: expected {} bytes, got {}",
            what,
            HEADER_SIZE,
            bytes.len()
        )));
    }

    let payload_len = u32::from_be_bytes([bytes[1], bytes[2], bytes[3], bytes[4]]) as usize;
    check_payload_len(payload_len, what)?;

    let total_len = HEADER_SIZE + payload_len;
    if bytes.len() < total_len {
        return Err(ChainError::Protocol(format!(
            "Incomplete {} payload: expected {} bytes, got {}",
            what,
            total_len,
            bytes.len()
        )));
    }

    Ok((bytes[0], &bytes[HEADER_SIZE..total_len]))
}

/// Read header then payload, returning the whole message
fn read_frame<R: Read>(reader: &mut R, what: &str) -> Result<Vec<u8>> {
    let mut header = [0u8; HEADER_SIZE];
    reader.read_exact(&mut header)?;

    let payload_len = u32::from_be_bytes([header[1], header[2], header[3], header[4]]) as usize;
    check_payload_len(payload_len, what)?;

    let mut message = vec![0u8; HEADER_SIZE + payload_len];
    message[..HEADER_SIZE].copy_from_slice(&header);
    if payload_len > 0 {
        reader.read_exact(&mut message[HEADER_SIZE..])?;
    }

    Ok(message)
}

fn read_u32(payload: &[u8], missing: &str) -> Result<u32> {
    if payload.len() < 4 {
        return Err(ChainError::Protocol(missing.to_string()));
    }
    Ok(u32::from_be_bytes([payload[0], payload[1], payload[2], payload[3]]))
}

fn utf8(bytes: &[u8], what: &str) -> Result<String> {
    String::from_utf8(bytes.to_vec())
        .map_err(|_| ChainError::Protocol(format!("{} is not valid UTF-8", what)))
}
