//! Connection Handler
//!
//! Handles individual client connections.

use std::io::{BufReader, BufWriter, ErrorKind};
use std::net::TcpStream;
use std::time::Duration;

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;

use crate::config::Config;
use crate::coordinator::Chain;
use crate::error::{ChainError, Result};
use crate::protocol::{read_command, write_response, Command, Response};
use crate::search::SearchOutcome;

/// Request validation applied before anything reaches the chain
#[derive(Debug, Clone, Copy)]
pub struct Limits {
    pub key_max_size: usize,
    pub value_max_size: usize,
    pub search_timeout: Duration,
}

impl Limits {
    pub fn from_config(config: &Config) -> Self {
        Self {
            key_max_size: config.key_max_size,
            value_max_size: config.value_max_size,
            search_timeout: config.search_timeout,
        }
    }

    fn check_key(&self, key: &str) -> std::result::Result<(), String> {
        if key.is_empty() {
            return Err("key must not be empty".to_string());
        }
        if key.len() > self.key_max_size {
            return Err(format!(
                "key is {} bytes (max {})",
                key.len(),
                self.key_max_size
            ));
        }
        Ok(())
    }

    fn check_value(&self, value: &str) -> std::result::Result<(), String> {
        if value.len() > self.value_max_size {
            return Err(format!(
                "value is {} bytes (max {})",
                value.len(),
                self.value_max_size
            ));
        }
        Ok(())
    }
}

/// Handles a single client connection
pub struct Connection {
    /// TCP stream reader (buffered for efficiency)
    reader: BufReader<TcpStream>,

    /// TCP stream writer (buffered for efficiency)
    writer: BufWriter<TcpStream>,

    /// Handle to the running coordinator
    chain: Chain,

    limits: Limits,

    /// Peer address for logging
    peer_addr: String,
}

impl Connection {
    /// Create a new connection handler
    ///
    /// Sets up buffered I/O; call `set_timeouts` before `handle`
    pub fn new(stream: TcpStream, chain: Chain, limits: Limits) -> Result<Self> {
        let peer_addr = stream
            .peer_addr()
            .map(|a| a.to_string())
            .unwrap_or_else(|_| "unknown".to_string());

        // Disable Nagle's algorithm for low latency
        stream.set_nodelay(true)?;

        let read_stream = stream.try_clone()?;
        let write_stream = stream;

        Ok(Self {
            reader: BufReader::new(read_stream),
            writer: BufWriter::new(write_stream),
            chain,
            limits,
            peer_addr,
        })
    }

    /// Configure connection timeouts
    pub fn set_timeouts(&mut self, read_ms: u64, write_ms: u64) -> Result<()> {
        if read_ms > 0 {
            self.reader
                .get_ref()
                .set_read_timeout(Some(Duration::from_millis(read_ms)))?;
        }
        if write_ms > 0 {
            self.writer
                .get_ref()
                .set_write_timeout(Some(Duration::from_millis(write_ms)))?;
        }
        Ok(())
    }

    /// Handle the connection (blocking until closed)
    ///
    /// Reads commands in a loop and sends responses.
    /// Returns when the client disconnects or an error occurs.
    pub fn handle(&mut self) -> Result<()> {
        tracing::debug!("Connection established from {}", self.peer_addr);

        loop {
            let command = match read_command(&mut self.reader) {
                Ok(cmd) => cmd,
                Err(ChainError::Io(ref e)) if is_disconnect(e.kind()) => {
                    tracing::debug!("Client {} disconnected ({:?})", self.peer_addr, e.kind());
                    return Ok(());
                }
                Err(ChainError::Io(ref e))
                    if matches!(e.kind(), ErrorKind::WouldBlock | ErrorKind::TimedOut) =>
                {
                    tracing::debug!("Read timeout for client {}", self.peer_addr);
                    return Ok(());
                }
                Err(e) => {
                    tracing::warn!("Error reading from {}: {}", self.peer_addr, e);
                    let _ = self.send_response(Response::error(&e.to_string()));
                    return Err(e);
                }
            };

            tracing::trace!("Received command from {}: {:?}", self.peer_addr, command);

            let response = self.execute_command(command);

            if let Err(e) = self.send_response(response) {
                if let ChainError::Io(ref io_err) = e {
                    if is_disconnect(io_err.kind()) || io_err.kind() == ErrorKind::BrokenPipe {
                        tracing::debug!(
                            "Client {} disconnected before response could be sent: {}",
                            self.peer_addr,
                            e
                        );
                        return Ok(());
                    }
                }
                tracing::warn!("Error writing to {}: {}", self.peer_addr, e);
                return Err(e);
            }
        }
    }

    /// Execute a command and return a response
    fn execute_command(&self, command: Command) -> Response {
        match command {
            Command::Submit { key, value } => {
                if let Err(reason) = self
                    .limits
                    .check_key(&key)
                    .and_then(|_| self.limits.check_value(&value))
                {
                    return Response::error(&reason);
                }
                match self.chain.submit(key, value) {
                    Ok(id) => Response::accepted(&STANDARD.encode(id)),
                    Err(e) => Response::error(&e.to_string()),
                }
            }
            Command::Search { key, timeout } => {
                if let Err(reason) = self.limits.check_key(&key) {
                    return Response::error(&reason);
                }
                let timeout = if timeout.is_zero() {
                    self.limits.search_timeout
                } else {
                    timeout
                };
                match self.chain.search(key, timeout) {
                    Ok(SearchOutcome::Found(transactions)) => Response::transactions(&transactions)
                        .unwrap_or_else(|e| Response::error(&e.to_string())),
                    Ok(SearchOutcome::NotFound) => Response::not_found(),
                    Ok(SearchOutcome::TimedOut) => Response::timed_out(),
                    Err(e) => Response::error(&e.to_string()),
                }
            }
            Command::Ping => Response::ok(Some(b"PONG".to_vec())),
        }
    }

    /// Send a response to the client
    fn send_response(&mut self, response: Response) -> Result<()> {
        write_response(&mut self.writer, &response)
    }

    /// Get the peer address string
    pub fn peer_addr(&self) -> &str {
        &self.peer_addr
    }
}

fn is_disconnect(kind: ErrorKind) -> bool {
    matches!(
        kind,
        ErrorKind::UnexpectedEof | ErrorKind::ConnectionReset | ErrorKind::ConnectionAborted
    )
}
