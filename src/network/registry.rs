//! Connection registry
//!
//! Tracks every live connection so shutdown can close them all.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;

use super::connection::{Connection, ConnectionId};

/// Internally synchronized set of live connections
#[derive(Debug, Default)]
pub struct Registry {
    connections: Mutex<HashMap<ConnectionId, Arc<Connection>>>,
    next_id: AtomicU64,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocate a fresh connection id (ids start at 1)
    pub fn next_id(&self) -> ConnectionId {
        self.next_id.fetch_add(1, Ordering::Relaxed) + 1
    }

    pub fn insert(&self, connection: Arc<Connection>) {
        self.connections.lock().insert(connection.id(), connection);
    }

    pub fn remove(&self, id: ConnectionId) -> Option<Arc<Connection>> {
        self.connections.lock().remove(&id)
    }

    pub fn len(&self) -> usize {
        self.connections.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.connections.lock().is_empty()
    }

    /// Remove and close every tracked connection, returning how many
    pub fn close_all(&self) -> usize {
        let drained: Vec<Arc<Connection>> = {
            let mut connections = self.connections.lock();
            connections.drain().map(|(_, connection)| connection).collect()
        };

        for connection in &drained {
            connection.close();
        }
        drained.len()
    }
}
