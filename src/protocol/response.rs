//! Response definitions
//!
//! Represents responses to clients.

use crate::error::KvError;

/// Prefix carried by every failed text response
pub const ERROR_PREFIX: &str = "ERROR: ";

/// Response status codes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Status {
    Ok = 0x00,
    NotFound = 0x01,
    Error = 0x02,
}

impl Status {
    pub fn from_byte(byte: u8) -> Option<Self> {
        match byte {
            0x00 => Some(Status::Ok),
            0x01 => Some(Status::NotFound),
            0x02 => Some(Status::Error),
            _ => None,
        }
    }
}

/// A response to send to client
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    /// Status code
    pub status: Status,

    /// Human-readable message (acknowledgement, value line, or error text)
    pub message: String,
}

impl Response {
    /// Create an OK response
    pub fn ok(message: impl Into<String>) -> Self {
        Self {
            status: Status::Ok,
            message: message.into(),
        }
    }

    /// Create a NOT_FOUND response
    pub fn not_found(message: impl Into<String>) -> Self {
        Self {
            status: Status::NotFound,
            message: message.into(),
        }
    }

    /// Create an ERROR response
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            status: Status::Error,
            message: message.into(),
        }
    }

    pub fn is_ok(&self) -> bool {
        self.status == Status::Ok
    }

    /// Render as one newline-terminated text line
    pub fn to_text_line(&self) -> String {
        match self.status {
            Status::Ok => format!("{}\n", self.message),
            Status::NotFound | Status::Error => format!("{}{}\n", ERROR_PREFIX, self.message),
        }
    }

    /// Interpret a text response line (client side)
    ///
    /// The text format does not distinguish NOT_FOUND from other errors, so
    /// every `ERROR:` line maps to `Status::Error`.
    pub fn from_text_line(line: &str) -> Self {
        let line = line.trim_end_matches(['\r', '\n']);
        match line.strip_prefix(ERROR_PREFIX) {
            Some(message) => Response::error(message),
            None => Response::ok(line),
        }
    }
}

impl From<&KvError> for Response {
    fn from(err: &KvError) -> Self {
        match err {
            KvError::KeyNotFound(_) => Response::not_found(err.to_string()),
            _ => Response::error(err.to_string()),
        }
    }
}
