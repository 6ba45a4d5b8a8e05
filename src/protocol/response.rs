//! Response definitions
//!
//! Represents responses to clients.

use crate::chain::Transaction;
use crate::error::{ChainError, Result};

/// Response status codes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Status {
    Ok = 0x00,
    Accepted = 0x01,
    NotFound = 0x02,
    TimedOut = 0x03,
    Error = 0x04,
}

impl Status {
    pub fn from_byte(byte: u8) -> Option<Self> {
        match byte {
            0x00 => Some(Status::Ok),
            0x01 => Some(Status::Accepted),
            0x02 => Some(Status::NotFound),
            0x03 => Some(Status::TimedOut),
            0x04 => Some(Status::Error),
            _ => None,
        }
    }
}

/// A response to send to client
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    /// Status code
    pub status: Status,

    /// Optional payload (transactions for SEARCH, id for SUBMIT, message for ERROR)
    pub payload: Option<Vec<u8>>,
}

impl Response {
    /// Create an OK response with optional payload
    pub fn ok(payload: Option<Vec<u8>>) -> Self {
        Self {
            status: Status::Ok,
            payload,
        }
    }

    /// OK carrying a JSON array of transactions
    pub fn transactions(transactions: &[Transaction]) -> Result<Self> {
        let payload = serde_json::to_vec(transactions)
            .map_err(|e| ChainError::Serialization(e.to_string()))?;
        Ok(Self::ok(Some(payload)))
    }

    /// Create an ACCEPTED response carrying the transaction id
    pub fn accepted(id: &str) -> Self {
        Self {
            status: Status::Accepted,
            payload: Some(id.as_bytes().to_vec()),
        }
    }

    /// Create a NOT_FOUND response
    pub fn not_found() -> Self {
        Self {
            status: Status::NotFound,
            payload: None,
        }
    }

    /// Create a TIMED_OUT response
    pub fn timed_out() -> Self {
        Self {
            status: Status::TimedOut,
            payload: None,
        }
    }

    /// Create an ERROR response
    pub fn error(message: &str) -> Self {
        Self {
            status: Status::Error,
            payload: Some(message.as_bytes().to_vec()),
        }
    }

    /// Parse the JSON array of an OK search response
    pub fn decode_transactions(&self) -> Result<Vec<Transaction>> {
        let payload = self.payload.as_deref().unwrap_or(b"[]");
        serde_json::from_slice(payload).map_err(|e| ChainError::Serialization(e.to_string()))
    }

    /// Payload as text, lossy
    pub fn payload_str(&self) -> String {
        self.payload
            .as_deref()
            .map(|p| String::from_utf8_lossy(p).into_owned())
            .unwrap_or_default()
    }
}
