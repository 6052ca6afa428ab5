//! Network Module
//!
//! TCP server and client handling.
//!
//! ## Architecture
//! - Single acceptor thread
//! - One OS thread per connection, blocking reads
//! - Commands routed through the shared Engine

mod server;
mod connection;

pub use server::{Server, ShutdownHandle};
pub use connection::{ClientHandle, Connection, Transport};
