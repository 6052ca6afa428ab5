//! Connection Handler
//!
//! Handles individual client connections: decode a request, run it, write
//! the reply, repeat until the peer goes away.

use std::io::{self, BufRead, BufReader, BufWriter, Write};
use std::net::{Shutdown, TcpStream};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;

use crate::engine::Engine;
use crate::error::Result;
use crate::protocol::{encode, Command, Decoder, WireValue};
use crate::pubsub::{ConnectionId, Subscriber};

// =============================================================================
// Transport
// =============================================================================

/// Write half of a client connection
pub trait Transport: Write + Send + 'static {
    /// Flush and release the underlying resource
    fn close(&mut self) -> io::Result<()> {
        self.flush()
    }

    /// Release the underlying resource without flushing
    fn abort(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl Transport for BufWriter<TcpStream> {
    fn close(&mut self) -> io::Result<()> {
        let flushed = self.flush();
        match self.abort() {
            Err(e) => Err(e),
            Ok(()) => flushed,
        }
    }

    fn abort(&mut self) -> io::Result<()> {
        // Shutting down wakes the reader half too.
        match self.get_ref().shutdown(Shutdown::Both) {
            Err(e) if e.kind() != io::ErrorKind::NotConnected => Err(e),
            _ => Ok(()),
        }
    }
}

// =============================================================================
// Client Handle
// =============================================================================

/// Shared, serialized write access to one client
///
/// The connection's own replies and messages published from other
/// connections both go through here, so frames never interleave. A failed
/// write may leave half a frame on the wire, so it closes the handle and
/// aborts the transport.
pub struct ClientHandle<T: Transport> {
    id: ConnectionId,
    peer_addr: String,
    writer: Mutex<ClientWriter<T>>,
}

struct ClientWriter<T> {
    transport: T,
    closed: bool,
}

impl<T: Transport> ClientHandle<T> {
    pub fn new(id: ConnectionId, peer_addr: impl Into<String>, transport: T) -> Self {
        Self {
            id,
            peer_addr: peer_addr.into(),
            writer: Mutex::new(ClientWriter {
                transport,
                closed: false,
            }),
        }
    }

    /// Encode and write one frame
    pub fn write_value(&self, value: &WireValue) -> io::Result<()> {
        self.send(&encode(value))
    }

    /// Close the transport. Later sends fail with `BrokenPipe`.
    pub fn close(&self) -> io::Result<()> {
        let mut writer = self.writer.lock();
        if writer.closed {
            return Ok(());
        }
        writer.closed = true;
        writer.transport.close()
    }

    pub fn is_closed(&self) -> bool {
        self.writer.lock().closed
    }

    /// Get the peer address string
    pub fn peer_addr(&self) -> &str {
        &self.peer_addr
    }
}

impl<T: Transport> Subscriber for ClientHandle<T> {
    fn id(&self) -> ConnectionId {
        self.id
    }

    fn send(&self, frame: &[u8]) -> io::Result<()> {
        let mut writer = self.writer.lock();
        if writer.closed {
            return Err(io::Error::new(
                io::ErrorKind::BrokenPipe,
                "connection closed",
            ));
        }
        let mut written = writer.transport.write_all(frame);
        if written.is_ok() {
            written = writer.transport.flush();
        }

        if written.is_err() {
            writer.closed = true;
            if let Err(e) = writer.transport.abort() {
                tracing::debug!("Error aborting connection {}: {}", self.peer_addr, e);
            }
        }
        written
    }
}

// =============================================================================
// Connection
// =============================================================================

/// Handles a single client connection
///
/// Teardown (unregister from pub/sub, then close the transport) runs on
/// every exit path, including drop.
pub struct Connection<R: BufRead, T: Transport> {
    /// Request decoder over the read half
    decoder: Decoder<R>,

    /// Write half, shared with the pub/sub registry
    client: Arc<ClientHandle<T>>,

    /// Shared server state
    engine: Arc<Engine>,

    torn_down: bool,
}

impl Connection<BufReader<TcpStream>, BufWriter<TcpStream>> {
    /// Wrap an accepted TCP stream
    pub fn from_tcp(stream: TcpStream, engine: Arc<Engine>) -> Result<Self> {
        let peer_addr = stream
            .peer_addr()
            .map(|a| a.to_string())
            .unwrap_or_else(|_| "unknown".to_string());

        let config = engine.config();
        if config.tcp_nodelay {
            stream.set_nodelay(true)?;
        }
        if config.write_timeout_ms > 0 {
            stream.set_write_timeout(Some(Duration::from_millis(config.write_timeout_ms)))?;
        }

        let read_stream = stream.try_clone()?;
        Ok(Self::new(
            BufReader::new(read_stream),
            BufWriter::new(stream),
            peer_addr,
            engine,
        ))
    }
}

impl<R: BufRead, T: Transport> Connection<R, T> {
    /// Create a connection over any reader/transport pair
    pub fn new(reader: R, transport: T, peer_addr: impl Into<String>, engine: Arc<Engine>) -> Self {
        let id = engine.next_connection_id();
        let decoder = Decoder::new(reader)
            .with_max_bulk_len(engine.config().max_bulk_len)
            .with_max_depth(engine.config().max_depth);
        Self {
            decoder,
            client: Arc::new(ClientHandle::new(id, peer_addr, transport)),
            engine,
            torn_down: false,
        }
    }

    pub fn id(&self) -> ConnectionId {
        self.client.id()
    }

    /// Get the peer address string
    pub fn peer_addr(&self) -> &str {
        self.client.peer_addr()
    }

    /// Get the write handle
    pub fn client(&self) -> &Arc<ClientHandle<T>> {
        &self.client
    }

    /// Handle the connection (blocking until closed)
    ///
    /// Returns `Ok` when the client disconnects, `Err` on a protocol error
    /// or an unexpected I/O failure. Either way the connection is torn down.
    pub fn handle(mut self) -> Result<()> {
        tracing::debug!(
            "Connection {} established from {}",
            self.id(),
            self.peer_addr()
        );

        let result = self.serve();
        self.teardown();

        match result {
            Err(e) if e.is_disconnect() => {
                tracing::debug!("Client {} went away: {}", self.peer_addr(), e);
                Ok(())
            }
            Err(e) => {
                tracing::warn!("Closing connection {}: {}", self.peer_addr(), e);
                Err(e)
            }
            Ok(()) => {
                tracing::debug!("Client {} disconnected", self.peer_addr());
                Ok(())
            }
        }
    }

    /// Request loop
    fn serve(&mut self) -> Result<()> {
        loop {
            let frame = match self.decoder.decode()? {
                Some(frame) => frame,
                None => return Ok(()),
            };

            tracing::trace!("Received frame from {}: {:?}", self.peer_addr(), frame);

            let command = match Command::from_frame(frame) {
                Some(Ok(command)) => command,
                Some(Err(e)) => {
                    self.client.write_value(&WireValue::from(e))?;
                    continue;
                }
                None => {
                    tracing::trace!("Ignoring non-command frame from {}", self.peer_addr());
                    continue;
                }
            };

            if let Some(reply) = self.engine.execute(command, &self.client)? {
                self.client.write_value(&reply)?;
            }
        }
    }

    /// Unregister from pub/sub, then release the transport
    fn teardown(&mut self) {
        if self.torn_down {
            return;
        }
        self.torn_down = true;

        self.engine.registry().remove_connection(self.client.id());
        if let Err(e) = self.client.close() {
            tracing::debug!("Error closing connection {}: {}", self.peer_addr(), e);
        }
    }
}

impl<R: BufRead, T: Transport> Drop for Connection<R, T> {
    fn drop(&mut self) {
        self.teardown();
    }
}
