//! Channel registry
//!
//! Maps channel names to the ordered set of connections subscribed to them.

use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Weak};

use bytes::Bytes;
use parking_lot::Mutex;

use super::{ConnectionId, Subscriber};
use crate::protocol::{encode, WireValue};

/// Subscribers of one channel, ordered by connection id (i.e. arrival order)
type SubscriberSet = BTreeMap<ConnectionId, Weak<dyn Subscriber>>;

/// Registry of channel subscriptions
///
/// All operations share one lock. A channel entry exists only while it has
/// at least one subscriber.
#[derive(Default)]
pub struct Registry {
    channels: Mutex<HashMap<Bytes, SubscriberSet>>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Subscribe `subscriber` to `channel`
    ///
    /// Subscribing twice to the same channel is a no-op. Returns the number
    /// of distinct channels the subscriber now holds across the registry.
    pub fn subscribe<S: Subscriber + 'static>(&self, channel: Bytes, subscriber: &Arc<S>) -> usize {
        let id = subscriber.id();
        let weak: Weak<S> = Arc::downgrade(subscriber);
        let handle: Weak<dyn Subscriber> = weak;

        let mut channels = self.channels.lock();
        channels.entry(channel).or_default().entry(id).or_insert(handle);
        subscription_count(&channels, id)
    }

    /// Unsubscribe `id` from `channel`, dropping the channel if it empties
    ///
    /// Returns the number of channels the connection still holds.
    pub fn unsubscribe(&self, channel: &[u8], id: ConnectionId) -> usize {
        let mut channels = self.channels.lock();
        if let Some(set) = channels.get_mut(channel) {
            set.remove(&id);
            if set.is_empty() {
                channels.remove(channel);
            }
        }
        subscription_count(&channels, id)
    }

    /// Deliver `message` to every current subscriber of `channel`
    ///
    /// Returns how many subscribers the message was written to. Failed
    /// subscribers are removed from the channel once the pass is done.
    pub fn publish(&self, channel: &[u8], message: &Bytes) -> usize {
        let snapshot: Vec<(ConnectionId, Weak<dyn Subscriber>)> = {
            let channels = self.channels.lock();
            match channels.get(channel) {
                Some(set) => set.iter().map(|(id, handle)| (*id, handle.clone())).collect(),
                None => return 0,
            }
        };

        let frame = encode(&WireValue::array(vec![
            WireValue::bulk(Bytes::from_static(b"message")),
            WireValue::bulk(Bytes::copy_from_slice(channel)),
            WireValue::bulk(message.clone()),
        ]));

        let mut delivered = 0;
        let mut failed = Vec::new();
        for (id, handle) in snapshot {
            let Some(subscriber) = handle.upgrade() else {
                failed.push(id);
                continue;
            };
            match subscriber.send(&frame) {
                Ok(()) => delivered += 1,
                Err(e) => {
                    tracing::debug!("Dropping subscriber {} from channel: {}", id, e);
                    failed.push(id);
                }
            }
        }

        if !failed.is_empty() {
            let mut channels = self.channels.lock();
            if let Some(set) = channels.get_mut(channel) {
                for id in &failed {
                    set.remove(id);
                }
                if set.is_empty() {
                    channels.remove(channel);
                }
            }
        }

        delivered
    }

    /// Remove a connection from every channel (connection teardown)
    ///
    /// Safe to call for connections that never subscribed.
    pub fn remove_connection(&self, id: ConnectionId) {
        let mut channels = self.channels.lock();
        channels.retain(|_, set| {
            set.remove(&id);
            !set.is_empty()
        });
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    /// Channels `id` is subscribed to
    pub fn channels_of(&self, id: ConnectionId) -> Vec<Bytes> {
        let channels = self.channels.lock();
        let mut held: Vec<Bytes> = channels
            .iter()
            .filter(|(_, set)| set.contains_key(&id))
            .map(|(name, _)| name.clone())
            .collect();
        held.sort();
        held
    }

    /// Number of distinct channels `id` is subscribed to
    pub fn subscription_count(&self, id: ConnectionId) -> usize {
        subscription_count(&self.channels.lock(), id)
    }

    /// Number of subscribers on one channel
    pub fn subscriber_count(&self, channel: &[u8]) -> usize {
        self.channels.lock().get(channel).map_or(0, |set| set.len())
    }

    /// Number of channels with at least one subscriber
    pub fn channel_count(&self) -> usize {
        self.channels.lock().len()
    }
}

fn subscription_count(channels: &HashMap<Bytes, SubscriberSet>, id: ConnectionId) -> usize {
    channels.values().filter(|set| set.contains_key(&id)).count()
}
