//! Sharded map implementation
//!
//! HashMap shards, each behind a parking_lot RwLock.

use std::collections::hash_map::RandomState;
use std::collections::HashMap;
use std::hash::BuildHasher;

use parking_lot::RwLock;

use crate::error::{KvError, Result};

/// Shard count used by `Storage::new`
pub const DEFAULT_SHARD_COUNT: usize = 16;

/// Concurrent key-value storage
///
/// ## Concurrency:
/// - Each key hashes to exactly one shard, so all operations on a key are
///   serialized by that shard's lock (per-key linearizability)
/// - Reads take the shard's read lock; set/delete take its write lock
/// - No operation ever holds more than one shard lock
pub struct Storage {
    shards: Box<[RwLock<HashMap<String, String>>]>,
    hasher: RandomState,
}

impl Storage {
    /// Create an empty storage with the default shard count
    pub fn new() -> Self {
        Self::with_shards(DEFAULT_SHARD_COUNT)
    }

    /// Create an empty storage with `count` shards (at least one)
    pub fn with_shards(count: usize) -> Self {
        let shards = (0..count.max(1))
            .map(|_| RwLock::new(HashMap::new()))
            .collect::<Vec<_>>()
            .into_boxed_slice();

        Self {
            shards,
            hasher: RandomState::new(),
        }
    }

    /// Insert or overwrite a record
    pub fn set(&self, key: impl Into<String>, value: impl Into<String>) {
        let key = key.into();
        let mut shard = self.shard(&key).write();
        shard.insert(key, value.into());
    }

    /// Get the value stored under `key`
    pub fn get(&self, key: &str) -> Result<String> {
        let shard = self.shard(key).read();
        shard
            .get(key)
            .cloned()
            .ok_or_else(|| KvError::KeyNotFound(key.to_string()))
    }

    /// Remove `key`, returning the value it held
    pub fn delete(&self, key: &str) -> Result<String> {
        let mut shard = self.shard(key).write();
        shard
            .remove(key)
            .ok_or_else(|| KvError::KeyNotFound(key.to_string()))
    }

    /// Number of records across all shards
    ///
    /// Shards are counted one at a time, so under concurrent writes the
    /// result is approximate.
    pub fn len(&self) -> usize {
        self.shards.iter().map(|shard| shard.read().len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.shards.iter().all(|shard| shard.read().is_empty())
    }

    pub fn shard_count(&self) -> usize {
        self.shards.len()
    }

    fn shard(&self, key: &str) -> &RwLock<HashMap<String, String>> {
        let index = self.hasher.hash_one(key) as usize % self.shards.len();
        &self.shards[index]
    }
}

impl Default for Storage {
    fn default() -> Self {
        Self::new()
    }
}
