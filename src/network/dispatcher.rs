//! Dispatcher
//!
//! The single consumer of the event queue. Every command in the process is
//! decoded and executed here, one at a time, in queue arrival order.

use std::sync::Arc;

use crossbeam::channel::{select, Receiver};

use crate::config::WireFormat;
use crate::error::KvError;
use crate::protocol::{codec, text, Response};
use crate::storage::Storage;

use super::connection::{Connection, Event, Message};
use super::registry::Registry;

pub(crate) struct Dispatcher {
    storage: Arc<Storage>,
    registry: Arc<Registry>,
    wire_format: WireFormat,
}

impl Dispatcher {
    pub(crate) fn new(storage: Arc<Storage>, registry: Arc<Registry>, wire_format: WireFormat) -> Self {
        Self {
            storage,
            registry,
            wire_format,
        }
    }

    /// Drain `events` until `stop` fires or disconnects
    ///
    /// An event already taken off the queue is always finished before the
    /// stop signal is looked at again.
    pub(crate) fn run(self, events: Receiver<Event>, stop: Receiver<()>) {
        tracing::debug!("Dispatcher started");

        loop {
            select! {
                recv(stop) -> _ => break,
                recv(events) -> event => match event {
                    Ok(event) => self.handle(event),
                    Err(_) => break,
                },
            }
        }

        tracing::debug!("Dispatcher stopped");
    }

    pub(crate) fn handle(&self, event: Event) {
        match event {
            Event::Message(Message { connection, frame }) => {
                self.handle_message(&connection, &frame)
            }
            Event::Closed { connection, error } => self.retire(&connection, error),
        }
    }

    fn handle_message(&self, connection: &Connection, frame: &[u8]) {
        if connection.is_closed() {
            tracing::trace!("Skipping frame from closed connection {}", connection.peer_addr());
            return;
        }

        let parsed = match self.wire_format {
            WireFormat::Text => text::parse_line(frame),
            WireFormat::Binary => codec::decode_command(frame),
        };

        let response = match parsed {
            Ok(command) => {
                tracing::trace!("Executing {:?} from {}", command, connection.peer_addr());
                command
                    .execute(&self.storage)
                    .unwrap_or_else(|e| Response::from(&e))
            }
            Err(e) if self.wire_format == WireFormat::Text => {
                tracing::debug!("Malformed request from {}: {}", connection.peer_addr(), e);
                Response::from(&KvError::Parse(e))
            }
            Err(e) => {
                tracing::warn!(
                    "Malformed binary frame from {}: {}; closing connection",
                    connection.peer_addr(),
                    e
                );
                connection.close();
                return;
            }
        };

        if let Err(e) = connection.send(&response) {
            if e.is_disconnect() {
                tracing::debug!(
                    "Client {} disconnected before response could be sent: {}",
                    connection.peer_addr(),
                    e
                );
            } else {
                tracing::warn!("Error writing to {}: {}", connection.peer_addr(), e);
            }
            connection.close();
        }
    }

    fn retire(&self, connection: &Connection, error: Option<KvError>) {
        self.registry.remove(connection.id());

        match error {
            None => tracing::debug!("Client {} disconnected", connection.peer_addr()),
            Some(e) if e.is_disconnect() => {
                tracing::debug!("Connection reset by client {}: {}", connection.peer_addr(), e)
            }
            Some(e) => tracing::warn!("Connection {} closed: {}", connection.peer_addr(), e),
        }
    }
}
