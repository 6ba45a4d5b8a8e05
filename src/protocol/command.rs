//! Command definitions
//!
//! Represents requests from clients.

use std::time::Duration;

/// Command types
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum CommandType {
    Submit = 0x01,
    Search = 0x02,
    Ping = 0x03,
}

/// A parsed command
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Queue a transaction for the next block
    Submit { key: String, value: String },

    /// Look up every transaction with a key
    ///
    /// A zero timeout means "use the server default".
    Search { key: String, timeout: Duration },

    /// Ping (health check)
    Ping,
}

impl Command {
    /// Get the command type
    pub fn command_type(&self) -> CommandType {
        match self {
            Command::Submit { .. } => CommandType::Submit,
            Command::Search { .. } => CommandType::Search,
            Command::Ping => CommandType::Ping,
        }
    }
}
