//! Tests for Store
//!
//! These tests verify:
//! - Basic get/set/delete operations
//! - TTL expiry (lazy, on read)
//! - Overwrite clears or replaces expiry
//! - Concurrent access

use std::sync::Arc;
use std::thread;

use bytes::Bytes;
use relaykv::store::{Clock, ManualClock, Store};

// =============================================================================
// Helper Functions
// =============================================================================

fn setup_store() -> (Arc<ManualClock>, Store) {
    let clock = Arc::new(ManualClock::new(1_000_000));
    let store = Store::with_clock(clock.clone());
    (clock, store)
}

fn b(s: &str) -> Bytes {
    Bytes::copy_from_slice(s.as_bytes())
}

// =============================================================================
// Basic Operations Tests
// =============================================================================

#[test]
fn test_store_set_get() {
    let (_clock, store) = setup_store();

    store.set(b("hello"), b("world"), None);

    assert_eq!(store.get(b"hello"), Some(b("world")));
}

#[test]
fn test_store_get_nonexistent_key() {
    let (_clock, store) = setup_store();

    assert_eq!(store.get(b"nonexistent"), None);
}

#[test]
fn test_store_overwrite() {
    let (_clock, store) = setup_store();

    store.set(b("key"), b("value1"), None);
    store.set(b("key"), b("value2"), None);

    assert_eq!(store.get(b"key"), Some(b("value2")));
    assert_eq!(store.len(), 1);
}

#[test]
fn test_store_delete_reports_existence() {
    let (_clock, store) = setup_store();

    store.set(b("key"), b("value"), None);

    assert!(store.delete(b"key"));
    assert!(!store.delete(b"key"));
    assert_eq!(store.get(b"key"), None);
    assert!(store.is_empty());
}

#[test]
fn test_store_binary_keys_and_values() {
    let (_clock, store) = setup_store();
    let key = Bytes::from(vec![0x00, 0xFF, 0x0D, 0x0A]);
    let value: Bytes = (0..=255u8).collect::<Vec<_>>().into();

    store.set(key.clone(), value.clone(), None);

    assert_eq!(store.get(&key), Some(value));
}

// =============================================================================
// Expiry Tests
// =============================================================================

#[test]
fn test_store_value_live_until_ttl_passes() {
    let (clock, store) = setup_store();

    store.set(b("foo"), b("bar"), Some(50));

    clock.advance(49);
    assert_eq!(store.get(b"foo"), Some(b("bar")));

    // Expired only once now is strictly past the deadline
    clock.advance(1);
    assert_eq!(store.get(b"foo"), Some(b("bar")));

    clock.advance(1);
    assert_eq!(store.get(b"foo"), None);
}

#[test]
fn test_store_expired_key_removed_on_read() {
    let (clock, store) = setup_store();

    store.set(b("foo"), b("bar"), Some(10));
    clock.advance(100);

    // Nothing sweeps it until someone looks
    assert_eq!(store.len(), 1);

    assert_eq!(store.get(b"foo"), None);
    assert_eq!(store.len(), 0);
    assert!(!store.delete(b"foo"));
}

#[test]
fn test_store_set_without_ttl_clears_expiry() {
    let (clock, store) = setup_store();

    store.set(b("foo"), b("bar"), Some(50));
    store.set(b("foo"), b("baz"), None);

    clock.advance(1_000_000);
    assert_eq!(store.get(b"foo"), Some(b("baz")));
}

#[test]
fn test_store_set_with_ttl_replaces_expiry() {
    let (clock, store) = setup_store();

    store.set(b("foo"), b("bar"), Some(50));
    clock.advance(40);
    store.set(b("foo"), b("baz"), Some(50));

    clock.advance(40);
    assert_eq!(store.get(b"foo"), Some(b("baz")));

    clock.advance(11);
    assert_eq!(store.get(b"foo"), None);
}

#[test]
fn test_store_delete_clears_expiry() {
    let (clock, store) = setup_store();

    store.set(b("foo"), b("bar"), Some(10));
    assert!(store.delete(b"foo"));
    store.set(b("foo"), b("again"), None);

    clock.advance(1_000);
    assert_eq!(store.get(b"foo"), Some(b("again")));
}

#[test]
fn test_store_expiry_after_expired_overwrite() {
    let (clock, store) = setup_store();

    store.set(b("foo"), b("old"), Some(10));
    clock.advance(20);

    // Overwrite before any read noticed the expiry
    store.set(b("foo"), b("new"), None);
    assert_eq!(store.get(b"foo"), Some(b("new")));
}

#[test]
fn test_store_zero_ttl_expires_after_current_millisecond() {
    let (clock, store) = setup_store();

    store.set(b("foo"), b("bar"), Some(0));
    assert_eq!(store.get(b"foo"), Some(b("bar")));

    clock.advance(1);
    assert_eq!(store.get(b"foo"), None);
}

#[test]
fn test_store_negative_ttl_is_already_expired() {
    let (_clock, store) = setup_store();

    store.set(b("foo"), b("bar"), Some(-10));
    assert_eq!(store.len(), 1);

    assert_eq!(store.get(b"foo"), None);
    assert!(store.is_empty());
}

#[test]
fn test_store_extreme_ttls_saturate() {
    let (clock, store) = setup_store();

    store.set(b("forever"), b("v"), Some(i64::MAX));
    store.set(b("past"), b("v"), Some(i64::MIN));

    clock.advance(1_000_000_000);
    assert_eq!(store.get(b"forever"), Some(b("v")));
    assert_eq!(store.get(b"past"), None);
}

#[test]
fn test_store_uses_wall_clock_by_default() {
    let store = Store::new();
    store.set(b("k"), b("v"), Some(60_000));

    assert_eq!(store.get(b"k"), Some(b("v")));
}

#[test]
fn test_manual_clock() {
    let clock = ManualClock::new(5);
    clock.advance(10);
    assert_eq!(clock.now_millis(), 15);
    clock.set(100);
    assert_eq!(clock.now_millis(), 100);
}

// =============================================================================
// Concurrency Tests
// =============================================================================

#[test]
fn test_store_concurrent_writers_and_readers() {
    let store = Arc::new(Store::new());
    let mut handles = Vec::new();

    for t in 0..8 {
        let store = Arc::clone(&store);
        handles.push(thread::spawn(move || {
            for i in 0..500 {
                let key = Bytes::from(format!("key-{}-{}", t, i));
                let value = Bytes::from(format!("value-{}", i));
                store.set(key.clone(), value.clone(), None);
                assert_eq!(store.get(&key), Some(value));
            }
        }));
    }

    for handle in handles {
        handle.join().unwrap();
    }

    assert_eq!(store.len(), 8 * 500);
}

#[test]
fn test_store_racing_set_and_get_see_whole_states() {
    let store = Arc::new(Store::new());
    store.set(b("shared"), b("a"), None);

    let writer = {
        let store = Arc::clone(&store);
        thread::spawn(move || {
            for i in 0..2_000 {
                if i % 2 == 0 {
                    store.set(b("shared"), b("b"), Some(60_000));
                } else {
                    store.set(b("shared"), b("a"), None);
                }
            }
        })
    };

    for _ in 0..2_000 {
        let value = store.get(b"shared");
        assert!(value == Some(b("a")) || value == Some(b("b")), "{:?}", value);
    }

    writer.join().unwrap();
}
