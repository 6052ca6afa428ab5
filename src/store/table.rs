//! Store implementation
//!
//! HashMap-based table with a single Mutex for concurrency.

use std::collections::HashMap;
use std::sync::Arc;

use bytes::Bytes;
use parking_lot::Mutex;

use super::{Clock, StoreEntry, SystemClock};

/// Concurrent key/value table with lazy expiry
pub struct Store {
    entries: Mutex<HashMap<Bytes, StoreEntry>>,
    clock: Arc<dyn Clock>,
}

impl Store {
    /// Create an empty store on the wall clock
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock))
    }

    /// Create an empty store on the given clock
    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            clock,
        }
    }

    /// Store `value` under `key`
    ///
    /// With a TTL the key expires `ttl_ms` after now; without one any
    /// previous expiry is dropped along with the old value. A negative TTL
    /// puts the deadline in the past, so the next read removes the key.
    pub fn set(&self, key: Bytes, value: Bytes, ttl_ms: Option<i64>) {
        let expires_at = ttl_ms.map(|ttl| deadline(self.clock.now_millis(), ttl));
        self.entries
            .lock()
            .insert(key, StoreEntry { value, expires_at });
    }

    /// Get a live value, removing the key if it has expired
    pub fn get(&self, key: &[u8]) -> Option<Bytes> {
        let now = self.clock.now_millis();
        let mut entries = self.entries.lock();

        match entries.get(key) {
            None => return None,
            Some(entry) if !entry.is_expired(now) => return Some(entry.value.clone()),
            Some(_) => {}
        }

        // Expired: value and expiry go together
        entries.remove(key);
        None
    }

    /// Remove a key, reporting whether it existed
    pub fn delete(&self, key: &[u8]) -> bool {
        self.entries.lock().remove(key).is_some()
    }

    /// Number of stored keys, including expired ones nobody has read yet
    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }
}

impl Default for Store {
    fn default() -> Self {
        Self::new()
    }
}

/// `now + ttl`, clamped to the representable range
fn deadline(now: u64, ttl: i64) -> u64 {
    if ttl >= 0 {
        now.saturating_add(ttl.unsigned_abs())
    } else {
        now.saturating_sub(ttl.unsigned_abs())
    }
}
