//! Network Module
//!
//! TCP server and connection handling.
//!
//! ## Architecture
//! ```text
//!   accept thread ──spawn──▶ connection thread (one per client)
//!                                  │  blocking reads, framing
//!                                  ▼
//!                   bounded queue (Message | Closed)
//!                                  │
//!                                  ▼
//!                  dispatch thread ──execute──▶ Storage
//!                                  │
//!                                  └──response──▶ originating connection
//! ```
//! - Per-connection request order is preserved end to end
//! - No ordering or fairness across connections beyond queue arrival

mod auth;
mod connection;
mod dispatcher;
mod registry;
mod server;

pub use auth::{authenticate, AUTH_OK};
pub use connection::{Connection, ConnectionId, Event, FrameReader, Message};
pub use registry::Registry;
pub use server::{Server, ServerState};
