//! Tests for Storage
//!
//! These tests verify:
//! - Set/get/delete semantics and NotFound reporting
//! - Behaviour across shard configurations
//! - Thread safety under concurrent writers

use std::sync::Arc;
use std::thread;

use linekv::{KvError, Storage};

// =============================================================================
// Basic Operations
// =============================================================================

#[test]
fn test_set_then_get() {
    let storage = Storage::new();
    storage.set("greeting", "hello");

    assert_eq!(storage.get("greeting").unwrap(), "hello");
    assert_eq!(storage.len(), 1);
}

#[test]
fn test_set_overwrites() {
    let storage = Storage::new();
    storage.set("k", "v1");
    storage.set("k", "v2");

    assert_eq!(storage.get("k").unwrap(), "v2");
    assert_eq!(storage.len(), 1);
}

#[test]
fn test_get_missing_is_not_found() {
    let storage = Storage::new();

    match storage.get("absent") {
        Err(KvError::KeyNotFound(key)) => assert_eq!(key, "absent"),
        other => panic!("Expected KeyNotFound, got {:?}", other),
    }
}

#[test]
fn test_delete_returns_removed_value() {
    let storage = Storage::new();
    storage.set("k", "v");

    assert_eq!(storage.delete("k").unwrap(), "v");
    assert!(storage.is_empty());
    assert!(matches!(storage.get("k"), Err(KvError::KeyNotFound(_))));
}

#[test]
fn test_delete_missing_is_not_found() {
    let storage = Storage::new();
    storage.set("other", "v");

    assert!(matches!(storage.delete("k"), Err(KvError::KeyNotFound(_))));
    assert_eq!(storage.len(), 1);
}

#[test]
fn test_empty_key_and_value_are_ordinary() {
    let storage = Storage::new();
    storage.set("", "");

    assert_eq!(storage.get("").unwrap(), "");
    assert_eq!(storage.delete("").unwrap(), "");
}

#[test]
fn test_non_ascii_keys() {
    let storage = Storage::new();
    storage.set("ключ", "значение");
    storage.set("鍵", "値 with spaces");

    assert_eq!(storage.get("ключ").unwrap(), "значение");
    assert_eq!(storage.get("鍵").unwrap(), "値 with spaces");
}

// =============================================================================
// Shard Configuration
// =============================================================================

#[test]
fn test_single_shard_behaves_the_same() {
    let storage = Storage::with_shards(1);
    assert_eq!(storage.shard_count(), 1);

    for i in 0..100 {
        storage.set(format!("key{}", i), format!("value{}", i));
    }
    assert_eq!(storage.len(), 100);
    assert_eq!(storage.get("key42").unwrap(), "value42");
}

#[test]
fn test_zero_shards_is_clamped() {
    let storage = Storage::with_shards(0);
    assert_eq!(storage.shard_count(), 1);

    storage.set("k", "v");
    assert_eq!(storage.get("k").unwrap(), "v");
}

// =============================================================================
// Concurrency
// =============================================================================

#[test]
fn test_concurrent_writers_on_distinct_keys() {
    let storage = Arc::new(Storage::new());

    let handles: Vec<_> = (0..8)
        .map(|t| {
            let storage = Arc::clone(&storage);
            thread::spawn(move || {
                for i in 0..250 {
                    storage.set(format!("t{}-k{}", t, i), format!("{}", i));
                }
            })
        })
        .collect();

    for handle in handles {
        handle.join().unwrap();
    }

    assert_eq!(storage.len(), 8 * 250);
    assert_eq!(storage.get("t3-k100").unwrap(), "100");
}

#[test]
fn test_concurrent_writers_on_same_key_leave_one_value() {
    let storage = Arc::new(Storage::new());

    let handles: Vec<_> = ["v1", "v2"]
        .into_iter()
        .map(|value| {
            let storage = Arc::clone(&storage);
            thread::spawn(move || {
                for _ in 0..1000 {
                    storage.set("shared", value);
                }
            })
        })
        .collect();

    for handle in handles {
        handle.join().unwrap();
    }

    let value = storage.get("shared").unwrap();
    assert!(value == "v1" || value == "v2", "unexpected value {}", value);
    assert_eq!(storage.len(), 1);
}

#[test]
fn test_readers_never_see_torn_values() {
    let storage = Arc::new(Storage::new());
    storage.set("k", "aaaa");

    let writer = {
        let storage = Arc::clone(&storage);
        thread::spawn(move || {
            for i in 0..1000 {
                storage.set("k", if i % 2 == 0 { "bbbb" } else { "aaaa" });
            }
        })
    };

    for _ in 0..1000 {
        let value = storage.get("k").unwrap();
        assert!(value == "aaaa" || value == "bbbb");
    }

    writer.join().unwrap();
}
