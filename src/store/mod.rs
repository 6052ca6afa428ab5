//! Store Module
//!
//! In-memory key/value table with lazy per-key expiry.
//!
//! ## Responsibilities
//! - Unconditional overwrite on SET, clearing or replacing the expiry
//! - Lazy expiry: an expired key is removed by the GET that notices it
//! - Linearizable set/get/delete under one store-wide lock
//!
//! ## Data Structure Choice
//! A single `HashMap<Bytes, StoreEntry>` behind one `parking_lot::Mutex`.
//! Value and expiry live in the same entry, so they are always written and
//! cleared together. There is no background sweeper; an expired key that is
//! never read again stays in memory.

mod clock;
mod table;

pub use clock::{Clock, ManualClock, SystemClock};
pub use table::Store;

use bytes::Bytes;

/// Entry stored in the table
#[derive(Debug, Clone, PartialEq)]
pub struct StoreEntry {
    /// The stored value
    pub value: Bytes,

    /// Absolute expiry, milliseconds since the Unix epoch
    pub expires_at: Option<u64>,
}

impl StoreEntry {
    /// True once `now` is strictly past the expiry
    pub fn is_expired(&self, now: u64) -> bool {
        matches!(self.expires_at, Some(at) if now > at)
    }
}
