//! TCP Server
//!
//! Accepts connections and hands each one to its own thread.

use std::io::ErrorKind;
use std::net::{SocketAddr, TcpListener, TcpStream};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use crate::config::Config;
use crate::coordinator::Chain;
use crate::error::Result;
use crate::protocol::{write_response, Response};

use super::connection::{Connection, Limits};

/// How long the acceptor sleeps when no connection is pending
const ACCEPT_POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Stops a running server from another thread
#[derive(Debug, Clone)]
pub struct ShutdownHandle {
    flag: Arc<AtomicBool>,
}

impl ShutdownHandle {
    pub fn shutdown(&self) {
        self.flag.store(true, Ordering::Release);
    }

    pub fn is_shutdown(&self) -> bool {
        self.flag.load(Ordering::Acquire)
    }
}

/// TCP server for ChainLog
pub struct Server {
    listener: TcpListener,
    chain: Chain,
    limits: Limits,
    max_connections: usize,
    read_timeout_ms: u64,
    write_timeout_ms: u64,
    active: Arc<AtomicUsize>,
    shutdown: ShutdownHandle,
}

/// Decrements the active count when a connection thread ends
struct ActiveGuard(Arc<AtomicUsize>);

impl Drop for ActiveGuard {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::AcqRel);
    }
}

impl Server {
    /// Bind the listen address from `config`
    pub fn bind(config: &Config, chain: Chain) -> Result<Self> {
        let listener = TcpListener::bind(&config.listen_addr)?;
        listener.set_nonblocking(true)?;

        tracing::info!("Listening on {}", listener.local_addr()?);

        Ok(Self {
            listener,
            chain,
            limits: Limits::from_config(config),
            max_connections: config.max_connections,
            read_timeout_ms: config.read_timeout_ms,
            write_timeout_ms: config.write_timeout_ms,
            active: Arc::new(AtomicUsize::new(0)),
            shutdown: ShutdownHandle {
                flag: Arc::new(AtomicBool::new(false)),
            },
        })
    }

    /// Address actually bound (useful with port 0)
    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    pub fn shutdown_handle(&self) -> ShutdownHandle {
        self.shutdown.clone()
    }

    /// Number of connections currently being served
    pub fn active_connections(&self) -> usize {
        self.active.load(Ordering::Acquire)
    }

    /// Accept connections until shutdown is signalled
    ///
    /// Open connections are not interrupted; they end on their own read
    /// timeout or when the client hangs up.
    pub fn run(&self) -> Result<()> {
        while !self.shutdown.is_shutdown() {
            match self.listener.accept() {
                Ok((stream, addr)) => self.dispatch(stream, addr),
                Err(e) if e.kind() == ErrorKind::WouldBlock => {
                    thread::sleep(ACCEPT_POLL_INTERVAL);
                }
                Err(e) if e.kind() == ErrorKind::Interrupted => {}
                Err(e) => {
                    tracing::error!("Accept failed: {}", e);
                    return Err(e.into());
                }
            }
        }

        tracing::info!(
            "Stopped accepting connections ({} still open)",
            self.active_connections()
        );
        Ok(())
    }

    fn dispatch(&self, stream: TcpStream, addr: SocketAddr) {
        if let Err(e) = stream.set_nonblocking(false) {
            tracing::warn!("Dropping connection from {}: {}", addr, e);
            return;
        }

        if self.active.fetch_add(1, Ordering::AcqRel) >= self.max_connections {
            self.active.fetch_sub(1, Ordering::AcqRel);
            tracing::warn!("Rejecting {}: connection limit {} reached", addr, self.max_connections);
            let mut stream = stream;
            let _ = write_response(&mut stream, &Response::error("too many connections"));
            return;
        }
        let guard = ActiveGuard(Arc::clone(&self.active));

        let chain = self.chain.clone();
        let limits = self.limits;
        let (read_ms, write_ms) = (self.read_timeout_ms, self.write_timeout_ms);

        let spawned = thread::Builder::new()
            .name(format!("chainlog-conn-{}", addr))
            .spawn(move || {
                let _guard = guard;
                let result = Connection::new(stream, chain, limits).and_then(|mut conn| {
                    conn.set_timeouts(read_ms, write_ms)?;
                    conn.handle()
                });
                if let Err(e) = result {
                    tracing::debug!("Connection {} ended with error: {}", addr, e);
                }
            });

        if let Err(e) = spawned {
            tracing::error!("Failed to spawn connection thread for {}: {}", addr, e);
        }
    }
}
