//! Configuration for linekv
//!
//! Centralized configuration with sensible defaults.

use std::fmt;
use std::time::Duration;

use crate::error::{KvError, Result};

/// Main configuration for a linekv server instance
#[derive(Debug, Clone)]
pub struct Config {
    // -------------------------------------------------------------------------
    // Network Configuration
    // -------------------------------------------------------------------------
    /// TCP listen address
    pub listen_addr: String,

    /// Which wire protocol connections speak
    pub wire_format: WireFormat,

    /// Max concurrent client connections
    pub max_connections: usize,

    /// Largest accepted frame (line or length prefix), in bytes
    pub max_frame_size: usize,

    /// Connection write timeout (milliseconds, 0 disables)
    pub write_timeout_ms: u64,

    /// How often the non-blocking accept loop re-checks for shutdown (milliseconds)
    pub accept_poll_interval_ms: u64,

    // -------------------------------------------------------------------------
    // Dispatch Configuration
    // -------------------------------------------------------------------------
    /// Capacity of the queue between connection readers and the dispatcher.
    /// Readers block once it is full.
    pub queue_capacity: usize,

    // -------------------------------------------------------------------------
    // Authentication Configuration
    // -------------------------------------------------------------------------
    /// Static credentials; `None` disables the handshake
    pub credentials: Option<Credentials>,

    /// Deadline for the client to send `login:password` (milliseconds)
    pub auth_timeout_ms: u64,
}

/// Wire protocol variant
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WireFormat {
    /// Newline-delimited `VERB key [value]` lines
    #[default]
    Text,

    /// 3-byte tag followed by big-endian u32 length-prefixed fields
    Binary,
}

impl fmt::Display for WireFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WireFormat::Text => f.write_str("text"),
            WireFormat::Binary => f.write_str("binary"),
        }
    }
}

/// Login and password checked by the handshake
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub login: String,
    pub password: String,
}

impl Credentials {
    pub fn new(login: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            login: login.into(),
            password: password.into(),
        }
    }

    /// The exact line body a client must send
    pub fn handshake_line(&self) -> String {
        format!("{}:{}", self.login, self.password)
    }
}

// Keep passwords out of logs.
impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("login", &self.login)
            .field("password", &"<redacted>")
            .finish()
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            listen_addr: "127.0.0.1:6380".to_string(),
            wire_format: WireFormat::Text,
            max_connections: 1024,
            max_frame_size: 16 * 1024 * 1024, // 16 MB
            write_timeout_ms: 5000,
            accept_poll_interval_ms: 10,
            queue_capacity: 1024,
            credentials: None,
            auth_timeout_ms: 5000,
        }
    }
}

impl Config {
    /// Create a new config builder
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::default()
    }

    /// Reject settings the server cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.listen_addr.trim().is_empty() {
            return Err(KvError::Config("listen address is empty".to_string()));
        }
        if self.queue_capacity == 0 {
            return Err(KvError::Config("queue capacity must be at least 1".to_string()));
        }
        if self.max_connections == 0 {
            return Err(KvError::Config("max connections must be at least 1".to_string()));
        }
        if self.max_frame_size == 0 {
            return Err(KvError::Config("max frame size must be at least 1".to_string()));
        }
        if self.accept_poll_interval_ms == 0 {
            return Err(KvError::Config(
                "accept poll interval must be at least 1 ms".to_string(),
            ));
        }
        if let Some(credentials) = &self.credentials {
            if credentials.login.is_empty() || credentials.login.contains(':') {
                return Err(KvError::Config(
                    "login must be non-empty and must not contain ':'".to_string(),
                ));
            }
            if credentials.password.contains('\n') {
                return Err(KvError::Config("password must not contain a newline".to_string()));
            }
        }
        Ok(())
    }

    pub fn auth_timeout(&self) -> Duration {
        Duration::from_millis(self.auth_timeout_ms)
    }

    pub fn write_timeout(&self) -> Option<Duration> {
        (self.write_timeout_ms > 0).then(|| Duration::from_millis(self.write_timeout_ms))
    }

    pub fn accept_poll_interval(&self) -> Duration {
        Duration::from_millis(self.accept_poll_interval_ms)
    }
}

/// Builder for Config
#[derive(Default)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Set the TCP listen address
    pub fn listen_addr(mut self, addr: impl Into<String>) -> Self {
        self.config.listen_addr = addr.into();
        self
    }

    /// Set the wire protocol
    pub fn wire_format(mut self, format: WireFormat) -> Self {
        self.config.wire_format = format;
        self
    }

    /// Set the maximum number of concurrent connections
    pub fn max_connections(mut self, count: usize) -> Self {
        self.config.max_connections = count;
        self
    }

    /// Set the maximum frame size (in bytes)
    pub fn max_frame_size(mut self, size: usize) -> Self {
        self.config.max_frame_size = size;
        self
    }

    /// Set the write timeout (in milliseconds)
    pub fn write_timeout_ms(mut self, ms: u64) -> Self {
        self.config.write_timeout_ms = ms;
        self
    }

    /// Set the accept loop poll interval (in milliseconds)
    pub fn accept_poll_interval_ms(mut self, ms: u64) -> Self {
        self.config.accept_poll_interval_ms = ms;
        self
    }

    /// Set the dispatcher queue capacity
    pub fn queue_capacity(mut self, capacity: usize) -> Self {
        self.config.queue_capacity = capacity;
        self
    }

    /// Require clients to authenticate with these credentials
    pub fn credentials(mut self, login: impl Into<String>, password: impl Into<String>) -> Self {
        self.config.credentials = Some(Credentials::new(login, password));
        self
    }

    /// Set the authentication read deadline (in milliseconds)
    pub fn auth_timeout_ms(mut self, ms: u64) -> Self {
        self.config.auth_timeout_ms = ms;
        self
    }

    pub fn build(self) -> Config {
        self.config
    }
}
