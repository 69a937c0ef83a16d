//! TCP Server
//!
//! Accepts connections, runs one reader thread per connection and a single
//! dispatch thread that executes every command.
//!
//! ## Lifecycle
//! ```text
//! Created ──bind──▶ Listening ──start──▶ Running ──stop──▶ Stopping ──▶ Stopped
//!    │                  │                                                   ▲
//!    └──────────────────┴───────────────────stop────────────────────────────┘
//! ```
//!
//! ## Shutdown order
//! 1. Accept loop sees the stop flag and drops the listener (joined)
//! 2. Every tracked connection is shut down, failing in-flight reads
//! 3. Dispatcher is told to stop and drops the queue (joined)
//! 4. Connection threads are joined

use std::fmt;
use std::io::ErrorKind;
use std::net::{SocketAddr, TcpListener, TcpStream};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, OnceLock};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam::channel::{self, select, Receiver, Sender};
use parking_lot::Mutex;

use crate::config::{Config, Credentials};
use crate::error::{KvError, Result};
use crate::storage::Storage;

use super::auth;
use super::connection::{Connection, Event, FrameReader};
use super::dispatcher::Dispatcher;
use super::registry::Registry;

/// Server lifecycle states
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServerState {
    Created,
    Listening,
    Running,
    Stopping,
    Stopped,
}

impl ServerState {
    pub fn as_str(self) -> &'static str {
        match self {
            ServerState::Created => "created",
            ServerState::Listening => "listening",
            ServerState::Running => "running",
            ServerState::Stopping => "stopping",
            ServerState::Stopped => "stopped",
        }
    }
}

impl fmt::Display for ServerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// TCP server for linekv
pub struct Server {
    config: Config,
    storage: Arc<Storage>,
    registry: Arc<Registry>,

    /// Observed by the accept loop
    stopping: Arc<AtomicBool>,

    /// Reader threads, joined on stop
    workers: Arc<Mutex<Vec<JoinHandle<()>>>>,

    state: Mutex<ServerState>,
    local_addr: OnceLock<SocketAddr>,

    /// Serializes lifecycle transitions
    inner: Mutex<Inner>,
}

#[derive(Default)]
struct Inner {
    listener: Option<TcpListener>,
    accept_thread: Option<JoinHandle<()>>,
    dispatch_thread: Option<JoinHandle<()>>,
    dispatch_stop: Option<Sender<()>>,
    failures: Option<Receiver<KvError>>,
}

impl Server {
    /// Create a new server with the given config and storage
    pub fn new(config: Config, storage: Arc<Storage>) -> Self {
        Self {
            config,
            storage,
            registry: Arc::new(Registry::new()),
            stopping: Arc::new(AtomicBool::new(false)),
            workers: Arc::new(Mutex::new(Vec::new())),
            state: Mutex::new(ServerState::Created),
            local_addr: OnceLock::new(),
            inner: Mutex::new(Inner::default()),
        }
    }

    pub fn state(&self) -> ServerState {
        *self.state.lock()
    }

    /// Bound address, once `bind` succeeded
    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.local_addr.get().copied()
    }

    /// Number of connections currently tracked
    pub fn connection_count(&self) -> usize {
        self.registry.len()
    }

    pub fn storage(&self) -> &Arc<Storage> {
        &self.storage
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Bind the configured listen address (Created → Listening)
    ///
    /// On failure the server stays in `Created` and never runs.
    pub fn bind(&self) -> Result<SocketAddr> {
        let mut inner = self.inner.lock();
        self.bind_locked(&mut inner)
    }

    fn bind_locked(&self, inner: &mut Inner) -> Result<SocketAddr> {
        self.expect_state("bind", ServerState::Created)?;
        self.config.validate()?;

        let listener = TcpListener::bind(&self.config.listen_addr).map_err(|e| {
            tracing::error!("Failed to bind {}: {}", self.config.listen_addr, e);
            KvError::Io(e)
        })?;
        // Polled so the accept loop can notice shutdown
        listener.set_nonblocking(true)?;
        let addr = listener.local_addr()?;

        inner.listener = Some(listener);
        let _ = self.local_addr.set(addr);
        self.set_state(ServerState::Listening);

        tracing::info!(
            "Listening on {} ({} protocol{})",
            addr,
            self.config.wire_format,
            if self.config.credentials.is_some() { ", auth required" } else { "" }
        );
        Ok(addr)
    }

    /// Spawn the accept and dispatch threads (Listening → Running)
    ///
    /// Binds first if the server is still `Created`.
    pub fn start(&self) -> Result<()> {
        let mut inner = self.inner.lock();

        if self.state() == ServerState::Created {
            self.bind_locked(&mut inner)?;
        }
        self.expect_state("start", ServerState::Listening)?;

        let listener = inner.listener.take().ok_or_else(|| {
            KvError::Server("listener missing in listening state".to_string())
        })?;

        let (events_tx, events_rx) = channel::bounded::<Event>(self.config.queue_capacity);
        let (stop_tx, stop_rx) = channel::bounded::<()>(0);
        let (failure_tx, failure_rx) = channel::bounded::<KvError>(1);

        let dispatcher = Dispatcher::new(
            Arc::clone(&self.storage),
            Arc::clone(&self.registry),
            self.config.wire_format,
        );
        let dispatch_thread = thread::Builder::new()
            .name("linekv-dispatch".to_string())
            .spawn(move || dispatcher.run(events_rx, stop_rx))?;

        let acceptor = Acceptor {
            listener,
            config: self.config.clone(),
            registry: Arc::clone(&self.registry),
            workers: Arc::clone(&self.workers),
            stopping: Arc::clone(&self.stopping),
            events: events_tx,
        };
        let spawned = thread::Builder::new()
            .name("linekv-accept".to_string())
            .spawn(move || {
                if let Err(e) = acceptor.run() {
                    tracing::error!("Accept loop failed: {}", e);
                    let _ = failure_tx.send(e);
                }
            });

        let accept_thread = match spawned {
            Ok(handle) => handle,
            Err(e) => {
                drop(stop_tx);
                let _ = dispatch_thread.join();
                self.set_state(ServerState::Stopped);
                return Err(e.into());
            }
        };

        inner.accept_thread = Some(accept_thread);
        inner.dispatch_thread = Some(dispatch_thread);
        inner.dispatch_stop = Some(stop_tx);
        inner.failures = Some(failure_rx);
        self.set_state(ServerState::Running);

        tracing::info!("Server running");
        Ok(())
    }

    /// Run until `shutdown` fires (or its sender is dropped), then stop
    ///
    /// Starts the server if needed. If the accept loop dies first the
    /// server is stopped and the accept error is returned.
    pub fn run_until(&self, shutdown: &Receiver<()>) -> Result<()> {
        if self.state() != ServerState::Running {
            self.start()?;
        }

        let failures = self
            .inner
            .lock()
            .failures
            .clone()
            .ok_or_else(|| KvError::Server("server is not running".to_string()))?;

        select! {
            recv(shutdown) -> _ => {
                tracing::info!("Shutdown requested");
                self.stop()
            }
            recv(failures) -> failure => match failure {
                Ok(e) => {
                    tracing::error!("Stopping after accept failure: {}", e);
                    self.stop()?;
                    Err(e)
                }
                // Accept loop ended normally: someone else called stop
                Err(_) => self.stop(),
            },
        }
    }

    /// Stop the server and release every resource
    ///
    /// Idempotent. From `Created` or `Listening` this only releases the
    /// socket; from `Running` it performs the full shutdown sequence.
    pub fn stop(&self) -> Result<()> {
        let mut inner = self.inner.lock();

        match self.state() {
            ServerState::Stopping | ServerState::Stopped => return Ok(()),
            ServerState::Created | ServerState::Listening => {
                inner.listener = None;
                self.set_state(ServerState::Stopped);
                return Ok(());
            }
            ServerState::Running => {}
        }

        self.set_state(ServerState::Stopping);
        tracing::info!("Server stopping");

        // Step 1: stop accepting; the listener is dropped when the loop exits
        self.stopping.store(true, Ordering::Release);
        if let Some(handle) = inner.accept_thread.take() {
            join_thread(handle, "accept");
        }
        if let Some(failure) = inner.failures.take().and_then(|rx| rx.try_recv().ok()) {
            tracing::warn!("Accept loop had failed before stop: {}", failure);
        }

        // Step 2: fail every in-flight read
        let closed = self.registry.close_all();
        tracing::debug!("Closed {} connection(s)", closed);

        // Step 3: close the queue; the dispatcher finishes its current event
        drop(inner.dispatch_stop.take());
        if let Some(handle) = inner.dispatch_thread.take() {
            join_thread(handle, "dispatch");
        }

        // Step 4: readers exit once their socket or the queue is gone
        let workers = std::mem::take(&mut *self.workers.lock());
        for handle in workers {
            join_thread(handle, "connection");
        }

        self.set_state(ServerState::Stopped);
        tracing::info!("Server stopped");
        Ok(())
    }

    fn set_state(&self, state: ServerState) {
        *self.state.lock() = state;
    }

    fn expect_state(&self, operation: &'static str, expected: ServerState) -> Result<()> {
        let state = self.state();
        if state != expected {
            return Err(KvError::InvalidState {
                operation,
                state: state.as_str(),
            });
        }
        Ok(())
    }
}

impl Drop for Server {
    fn drop(&mut self) {
        if let Err(e) = self.stop() {
            tracing::warn!("Error stopping server on drop: {}", e);
        }
    }
}

fn join_thread(handle: JoinHandle<()>, name: &str) {
    if handle.join().is_err() {
        tracing::error!("{} thread panicked", name);
    }
}

/// State moved into the accept thread
struct Acceptor {
    listener: TcpListener,
    config: Config,
    registry: Arc<Registry>,
    workers: Arc<Mutex<Vec<JoinHandle<()>>>>,
    stopping: Arc<AtomicBool>,
    events: Sender<Event>,
}

impl Acceptor {
    fn run(self) -> Result<()> {
        let poll_interval: Duration = self.config.accept_poll_interval();

        while !self.stopping.load(Ordering::Acquire) {
            match self.listener.accept() {
                Ok((stream, peer)) => self.admit(stream, peer),
                Err(e) if e.kind() == ErrorKind::WouldBlock => thread::sleep(poll_interval),
                Err(e)
                    if matches!(
                        e.kind(),
                        ErrorKind::Interrupted
                            | ErrorKind::ConnectionAborted
                            | ErrorKind::ConnectionReset
                    ) =>
                {
                    tracing::debug!("Transient accept error: {}", e);
                }
                Err(e) => return Err(e.into()),
            }
        }

        tracing::debug!("Accept loop stopped");
        Ok(())
    }

    fn admit(&self, stream: TcpStream, peer: SocketAddr) {
        if self.registry.len() >= self.config.max_connections {
            tracing::warn!(
                "Rejecting {}: connection limit of {} reached",
                peer,
                self.config.max_connections
            );
            return;
        }

        let id = self.registry.next_id();
        let (connection, reader) = match Connection::new(id, stream, peer, &self.config) {
            Ok(pair) => pair,
            Err(e) => {
                tracing::warn!("Failed to set up connection from {}: {}", peer, e);
                return;
            }
        };
        self.registry.insert(Arc::clone(&connection));

        let credentials = self.config.credentials.clone();
        let auth_timeout = self.config.auth_timeout();
        let events = self.events.clone();
        let thread_connection = Arc::clone(&connection);

        let spawned = thread::Builder::new()
            .name(format!("linekv-conn-{}", id))
            .spawn(move || {
                serve_connection(thread_connection, reader, credentials, auth_timeout, events)
            });

        match spawned {
            Ok(handle) => {
                let mut workers = self.workers.lock();
                workers.retain(|handle| !handle.is_finished());
                workers.push(handle);
            }
            Err(e) => {
                tracing::warn!("Failed to spawn thread for {}: {}", peer, e);
                self.registry.remove(id);
                connection.close();
            }
        }
    }
}

/// Body of a connection thread: optional handshake, then the receive loop
fn serve_connection(
    connection: Arc<Connection>,
    mut reader: FrameReader,
    credentials: Option<Credentials>,
    auth_timeout: Duration,
    events: Sender<Event>,
) {
    if let Some(credentials) = &credentials {
        if let Err(e) = auth::authenticate(&connection, &mut reader, credentials, auth_timeout) {
            connection.close();
            let _ = events.send(Event::Closed {
                connection,
                error: Some(e),
            });
            return;
        }
        tracing::debug!("Client {} authenticated", connection.peer_addr());
    }

    connection.receive(reader, events);
}
