//! Network Module
//!
//! TCP server and client handling.
//!
//! ## Architecture
//! - Single acceptor thread, non-blocking so it can observe shutdown
//! - One thread per connection, bounded by `max_connections`
//! - Commands routed through a shared `Chain` handle

mod server;
mod connection;

pub use server::{Server, ShutdownHandle};
pub use connection::{Connection, Limits};
