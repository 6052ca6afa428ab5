//! Pub/Sub Module
//!
//! Channel registry with best-effort fan-out delivery.
//!
//! ## Delivery Model
//! - At-most-once, no retry, no buffering
//! - A subscriber whose send fails is pruned from the channel after the
//!   fan-out pass; the publisher never sees the failure
//! - Sends happen outside the registry lock (snapshot, send, prune)

mod registry;

pub use registry::Registry;

use std::io;

/// Identity of a client connection, unique for the life of an engine
pub type ConnectionId = u64;

/// Anything a published message can be pushed to
///
/// The registry only keeps a weak reference; the connection owns its
/// subscriber handle.
pub trait Subscriber: Send + Sync {
    /// Stable identity used for set membership
    fn id(&self) -> ConnectionId;

    /// Write one already-encoded frame. An error means the peer is gone.
    fn send(&self, frame: &[u8]) -> io::Result<()>;
}
