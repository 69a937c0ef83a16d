//! # linekv
//!
//! A networked key-value store with:
//! - A line-oriented text protocol (`SET k v`, `GET k`, `DEL k`)
//! - A length-prefixed binary protocol
//! - Optional single-credential authentication handshake
//! - Thread-per-connection reads feeding one serialized dispatcher
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      TCP Server                              │
//! │          (accept thread + one thread per client)             │
//! └─────────────────────┬───────────────────────────────────────┘
//!                       │ framed messages
//! ┌─────────────────────▼───────────────────────────────────────┐
//! │                 Bounded Event Queue                          │
//! └─────────────────────┬───────────────────────────────────────┘
//!                       │
//! ┌─────────────────────▼───────────────────────────────────────┐
//! │                     Dispatcher                               │
//! │        (decode → execute → respond, one at a time)           │
//! └─────────────────────┬───────────────────────────────────────┘
//!                       │
//!                       ▼
//!               ┌──────────────┐
//!               │   Storage    │
//!               │ (sharded map)│
//!               └──────────────┘
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod config;
pub mod error;

pub mod client;
pub mod network;
pub mod protocol;
pub mod storage;

// =============================================================================
// Public API Re-exports
// =============================================================================

pub use client::Client;
pub use config::{Config, Credentials, WireFormat};
pub use error::{KvError, Result};
pub use network::{Server, ServerState};
pub use storage::Storage;

// =============================================================================
// Version Info
// =============================================================================

/// Current version of linekv
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
