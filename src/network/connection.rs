//! Connection Handler
//!
//! Handles individual client connections: frames incoming bytes into
//! messages for the dispatcher and writes responses back.

use std::io::{BufRead, BufReader, BufWriter, ErrorKind, Write};
use std::net::{Shutdown, SocketAddr, TcpStream};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use crossbeam::channel::Sender;
use parking_lot::Mutex;

use crate::config::{Config, WireFormat};
use crate::error::{KvError, Result};
use crate::protocol::{codec, text, Response};

/// Server-assigned connection identity
pub type ConnectionId = u64;

/// Queue item flowing from connection readers to the dispatcher
#[derive(Debug)]
pub enum Event {
    /// One complete request frame
    Message(Message),

    /// The connection's reader stopped; `error` is `None` on a clean EOF
    Closed {
        connection: Arc<Connection>,
        error: Option<KvError>,
    },
}

/// Raw request frame plus the connection it must be answered on
#[derive(Debug)]
pub struct Message {
    pub connection: Arc<Connection>,
    pub frame: Vec<u8>,
}

/// Server-side handle for one connected client
///
/// Shared between the connection's reader thread, the registry and every
/// queued message from it. Writes are serialized by `writer`; `close` uses a
/// separate handle so it never waits behind a stalled write.
#[derive(Debug)]
pub struct Connection {
    id: ConnectionId,

    /// Peer address for logging
    peer_addr: String,

    wire_format: WireFormat,

    /// TCP stream writer (buffered for efficiency)
    writer: Mutex<BufWriter<TcpStream>>,

    /// Handle used only to shut the socket down
    control: TcpStream,

    closed: AtomicBool,
}

impl Connection {
    /// Create a new connection handler
    ///
    /// Sets up buffered I/O and configures timeouts. Returns the shared
    /// handle and the reader half that drives `receive`.
    pub fn new(
        id: ConnectionId,
        stream: TcpStream,
        peer: SocketAddr,
        config: &Config,
    ) -> Result<(Arc<Self>, FrameReader)> {
        // Accepted from a non-blocking listener; some platforms inherit the flag
        stream.set_nonblocking(false)?;

        // Disable Nagle's algorithm for low latency
        stream.set_nodelay(true)?;
        stream.set_write_timeout(config.write_timeout())?;

        let read_stream = stream.try_clone()?;
        let control = stream.try_clone()?;

        let connection = Arc::new(Self {
            id,
            peer_addr: peer.to_string(),
            wire_format: config.wire_format,
            writer: Mutex::new(BufWriter::new(stream)),
            control,
            closed: AtomicBool::new(false),
        });

        let reader = FrameReader {
            inner: BufReader::new(read_stream),
            wire_format: config.wire_format,
            max_frame_size: config.max_frame_size,
        };

        Ok((connection, reader))
    }

    pub fn id(&self) -> ConnectionId {
        self.id
    }

    /// Get the peer address string
    pub fn peer_addr(&self) -> &str {
        &self.peer_addr
    }

    pub fn wire_format(&self) -> WireFormat {
        self.wire_format
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    /// Send one framed response in this connection's wire format
    pub fn send(&self, response: &Response) -> Result<()> {
        let bytes = match self.wire_format {
            WireFormat::Text => response.to_text_line().into_bytes(),
            WireFormat::Binary => codec::encode_response(response),
        };
        self.write_bytes(&bytes)
    }

    /// Send a raw text line (handshake replies use text in both formats)
    pub fn send_line(&self, line: &str) -> Result<()> {
        let mut bytes = Vec::with_capacity(line.len() + 1);
        bytes.extend_from_slice(line.as_bytes());
        bytes.push(b'\n');
        self.write_bytes(&bytes)
    }

    fn write_bytes(&self, bytes: &[u8]) -> Result<()> {
        let mut writer = self.writer.lock();
        writer.write_all(bytes)?;
        writer.flush()?;
        Ok(())
    }

    /// Shut the socket down in both directions
    ///
    /// A reader blocked on this socket wakes up with end of stream. Safe to
    /// call more than once.
    pub fn close(&self) {
        if self.closed.swap(true, Ordering::AcqRel) {
            return;
        }
        if let Err(e) = self.control.shutdown(Shutdown::Both) {
            // Already torn down by the peer
            tracing::trace!("Shutdown of {} failed: {}", self.peer_addr, e);
        }
    }

    /// Blocking receive loop
    ///
    /// Forwards every frame to the dispatcher until end of stream or an
    /// error, then closes the socket and reports `Event::Closed`.
    pub fn receive(self: Arc<Self>, mut reader: FrameReader, events: Sender<Event>) {
        tracing::debug!("Connection {} established from {}", self.id, self.peer_addr);

        let error = loop {
            match reader.next_frame() {
                Ok(Some(frame)) => {
                    tracing::trace!("Received {} byte frame from {}", frame.len(), self.peer_addr);
                    let message = Message {
                        connection: Arc::clone(&self),
                        frame,
                    };
                    if events.send(Event::Message(message)).is_err() {
                        // Dispatcher is gone; the server is stopping
                        tracing::debug!("Dropping frame from {}: queue closed", self.peer_addr);
                        self.close();
                        return;
                    }
                }
                Ok(None) => break None,
                Err(e) => break Some(e),
            }
        };

        // Text clients always get a line back; binary clients are cut off
        if let Some(e @ KvError::FrameTooLarge { .. }) = &error {
            if self.wire_format == WireFormat::Text && !self.is_closed() {
                let _ = self.send(&Response::from(e));
            }
        }

        self.close();
        let _ = events.send(Event::Closed {
            connection: self,
            error,
        });
    }
}

/// Read half of a connection, framing the byte stream
#[derive(Debug)]
pub struct FrameReader {
    inner: BufReader<TcpStream>,
    wire_format: WireFormat,
    max_frame_size: usize,
}

impl FrameReader {
    /// Next request frame, or `None` at end of stream
    pub fn next_frame(&mut self) -> Result<Option<Vec<u8>>> {
        match self.wire_format {
            WireFormat::Text => text::read_line(&mut self.inner, self.max_frame_size),
            WireFormat::Binary => codec::read_frame(&mut self.inner, self.max_frame_size),
        }
    }

    /// Next newline-terminated line, which must be complete by `deadline`
    ///
    /// The socket timeout is re-armed with the time left before every read,
    /// so a peer trickling bytes cannot stretch the wait. Fails with
    /// `TimedOut` once the deadline passes. Returns `None` at end of stream,
    /// discarding any partial line.
    pub fn read_line_before(&mut self, deadline: Instant) -> Result<Option<Vec<u8>>> {
        let mut line = Vec::new();

        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return Err(KvError::Io(ErrorKind::TimedOut.into()));
            }
            self.set_read_timeout(Some(remaining))?;

            let available = match self.inner.fill_buf() {
                Ok(available) => available,
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => return Err(e.into()),
            };
            if available.is_empty() {
                return Ok(None);
            }

            let (taken, complete) = match available.iter().position(|&b| b == b'\n') {
                Some(i) => (i + 1, true),
                None => (available.len(), false),
            };
            line.extend_from_slice(&available[..taken]);
            self.inner.consume(taken);

            let content_len = line.len() - usize::from(complete);
            if content_len > self.max_frame_size {
                return Err(KvError::FrameTooLarge {
                    len: content_len,
                    max: self.max_frame_size,
                });
            }

            if complete {
                line.pop();
                if line.last() == Some(&b'\r') {
                    line.pop();
                }
                return Ok(Some(line));
            }
        }
    }

    pub fn set_read_timeout(&self, timeout: Option<Duration>) -> Result<()> {
        self.inner.get_ref().set_read_timeout(timeout)?;
        Ok(())
    }
}
