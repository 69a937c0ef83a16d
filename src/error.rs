//! Error types for linekv
//!
//! Provides a unified error type for all operations.

use thiserror::Error;

use crate::protocol::ParseError;

/// Result type alias using KvError
pub type Result<T> = std::result::Result<T, KvError>;

/// Unified error type for linekv operations
#[derive(Debug, Error)]
pub enum KvError {
    // -------------------------------------------------------------------------
    // Transport Errors
    // -------------------------------------------------------------------------
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("frame too large: {len} bytes (max {max})")]
    FrameTooLarge { len: usize, max: usize },

    // -------------------------------------------------------------------------
    // Protocol Errors
    // -------------------------------------------------------------------------
    #[error("parse error: {0}")]
    Parse(#[from] ParseError),

    /// A response from the server could not be understood (client side)
    #[error("Protocol error: {0}")]
    Protocol(String),

    /// The server answered with an error line or status (client side)
    #[error("server error: {0}")]
    Remote(String),

    // -------------------------------------------------------------------------
    // Storage Errors
    // -------------------------------------------------------------------------
    #[error("no record with key '{0}'")]
    KeyNotFound(String),

    // -------------------------------------------------------------------------
    // Authentication Errors
    // -------------------------------------------------------------------------
    #[error("authentication failed: {0}")]
    Auth(String),

    // -------------------------------------------------------------------------
    // Configuration Errors
    // -------------------------------------------------------------------------
    #[error("Configuration error: {0}")]
    Config(String),

    // -------------------------------------------------------------------------
    // Server Lifecycle Errors
    // -------------------------------------------------------------------------
    #[error("cannot {operation} while server is {state}")]
    InvalidState {
        operation: &'static str,
        state: &'static str,
    },

    #[error("Server error: {0}")]
    Server(String),
}

impl KvError {
    /// True for errors a peer causes by hanging up (EOF, reset, broken pipe)
    pub fn is_disconnect(&self) -> bool {
        match self {
            KvError::Io(e) => matches!(
                e.kind(),
                std::io::ErrorKind::UnexpectedEof
                    | std::io::ErrorKind::ConnectionReset
                    | std::io::ErrorKind::ConnectionAborted
                    | std::io::ErrorKind::BrokenPipe
                    | std::io::ErrorKind::NotConnected
            ),
            _ => false,
        }
    }
}
