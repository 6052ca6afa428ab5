//! Engine Module
//!
//! The server context shared by every connection.
//!
//! ## Responsibilities
//! - Own the key/value store and the pub/sub registry
//! - Hand out connection ids
//! - Execute parsed commands against the store or the registry
//!
//! Constructed once at startup and passed to each connection as
//! `Arc<Engine>`; nothing in the crate reaches it through a global.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use bytes::Bytes;

use crate::config::Config;
use crate::error::Result;
use crate::protocol::{encode, Command, WireValue};
use crate::pubsub::{ConnectionId, Registry, Subscriber};
use crate::store::{Clock, Store, SystemClock};

/// The shared server state
///
/// ## Concurrency Model
///
/// Two independent locks: one inside [`Store`], one inside [`Registry`].
/// Each command touches at most one of them, so no lock ordering is needed.
pub struct Engine {
    /// Engine configuration
    config: Config,

    /// Key/value table
    store: Store,

    /// Channel subscriptions
    registry: Registry,

    /// Next id to give a connection
    next_connection_id: AtomicU64,
}

impl Engine {
    /// Create an engine on the wall clock
    pub fn new(config: Config) -> Self {
        Self::with_clock(config, Arc::new(SystemClock))
    }

    /// Create an engine whose store uses `clock` for expiry
    pub fn with_clock(config: Config, clock: Arc<dyn Clock>) -> Self {
        Self {
            config,
            store: Store::with_clock(clock),
            registry: Registry::new(),
            next_connection_id: AtomicU64::new(1),
        }
    }

    /// Allocate an id for a new connection
    pub fn next_connection_id(&self) -> ConnectionId {
        self.next_connection_id.fetch_add(1, Ordering::Relaxed)
    }

    /// Execute a command on behalf of `client`
    ///
    /// Returns the reply to write back, or `None` if the command already
    /// wrote its replies itself (SUBSCRIBE / UNSUBSCRIBE send one frame per
    /// channel as soon as each is processed). An error here is an I/O
    /// failure on the client's own connection.
    pub fn execute<S: Subscriber + 'static>(
        &self,
        command: Command,
        client: &Arc<S>,
    ) -> Result<Option<WireValue>> {
        let reply = match command {
            Command::Ping { message: None } => WireValue::simple("PONG"),
            Command::Ping {
                message: Some(message),
            } => WireValue::bulk(message),
            Command::Echo { message } => WireValue::bulk(message),
            Command::Set { key, value, ttl_ms } => {
                self.store.set(key, value, ttl_ms);
                WireValue::ok()
            }
            Command::Get { key } => WireValue::BulkString(self.store.get(&key)),
            Command::Del { keys } => {
                let removed = keys.iter().filter(|key| self.store.delete(key)).count();
                WireValue::Integer(removed as i64)
            }
            Command::Publish { channel, message } => {
                WireValue::Integer(self.registry.publish(&channel, &message) as i64)
            }
            Command::Subscribe { channels } => {
                for channel in channels {
                    let count = self.registry.subscribe(channel.clone(), client);
                    client.send(&subscription_frame("subscribe", Some(channel), count))?;
                }
                return Ok(None);
            }
            Command::Unsubscribe { channels } => {
                self.unsubscribe(channels, &**client)?;
                return Ok(None);
            }
        };
        Ok(Some(reply))
    }

    fn unsubscribe<S: Subscriber>(&self, channels: Vec<Bytes>, client: &S) -> Result<()> {
        let id = client.id();
        let channels = if channels.is_empty() {
            self.registry.channels_of(id)
        } else {
            channels
        };

        if channels.is_empty() {
            client.send(&subscription_frame("unsubscribe", None, 0))?;
            return Ok(());
        }

        for channel in channels {
            let count = self.registry.unsubscribe(&channel, id);
            client.send(&subscription_frame("unsubscribe", Some(channel), count))?;
        }
        Ok(())
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    /// Get the key/value store
    pub fn store(&self) -> &Store {
        &self.store
    }

    /// Get the pub/sub registry
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Get the configuration
    pub fn config(&self) -> &Config {
        &self.config
    }
}

/// `["subscribe" | "unsubscribe", channel, count]`
fn subscription_frame(kind: &'static str, channel: Option<Bytes>, count: usize) -> Vec<u8> {
    encode(&WireValue::array(vec![
        WireValue::bulk(Bytes::from_static(kind.as_bytes())),
        WireValue::BulkString(channel),
        WireValue::Integer(count as i64),
    ]))
}
