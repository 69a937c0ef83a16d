//! Storage Module
//!
//! In-memory key-value map shared by every connection.
//!
//! ## Responsibilities
//! - Insert/overwrite, lookup and remove string records
//! - Safe for any number of concurrent callers without external locking
//! - Per-key linearizability (each key lives behind exactly one lock)
//!
//! ## Layout
//! ```text
//! ┌──────────────────────────────────────────────┐
//! │ Storage                                      │
//! │ ┌──────────┬──────────┬─────┬──────────────┐ │
//! │ │ Shard 0  │ Shard 1  │ ... │  Shard N-1   │ │
//! │ │ RwLock   │ RwLock   │     │  RwLock      │ │
//! │ │ HashMap  │ HashMap  │     │  HashMap     │ │
//! │ └──────────┴──────────┴─────┴──────────────┘ │
//! └──────────────────────────────────────────────┘
//!           shard = hash(key) % N
//! ```
//!
//! Only the three atomic operations are exposed. There is no entry or
//! iteration API, so callers cannot compose a check-then-act race.

mod map;

pub use map::{Storage, DEFAULT_SHARD_COUNT};
