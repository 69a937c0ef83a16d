//! Command definitions
//!
//! Represents commands from clients and how they run against storage.

use std::fmt;

use crate::error::Result;
use crate::storage::Storage;

use super::Response;

/// Command types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CommandType {
    Set,
    Get,
    Del,
}

impl CommandType {
    /// The 3-byte tag used by the binary format (and the text verb)
    pub fn tag(self) -> &'static [u8; 3] {
        match self {
            CommandType::Set => b"SET",
            CommandType::Get => b"GET",
            CommandType::Del => b"DEL",
        }
    }

    /// Exact tag match, as required by the binary format
    pub fn from_tag(tag: &[u8]) -> Option<Self> {
        match tag {
            b"SET" => Some(CommandType::Set),
            b"GET" => Some(CommandType::Get),
            b"DEL" => Some(CommandType::Del),
            _ => None,
        }
    }

    /// Case-insensitive verb match, as used by the text format
    pub fn from_verb(verb: &str) -> Option<Self> {
        [CommandType::Set, CommandType::Get, CommandType::Del]
            .into_iter()
            .find(|t| verb.as_bytes().eq_ignore_ascii_case(t.tag()))
    }

    /// Number of arguments following the verb
    pub fn arity(self) -> usize {
        match self {
            CommandType::Set => 2,
            CommandType::Get | CommandType::Del => 1,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            CommandType::Set => "SET",
            CommandType::Get => "GET",
            CommandType::Del => "DEL",
        }
    }
}

impl fmt::Display for CommandType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A parsed command
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Insert or overwrite a record
    Set { key: String, value: String },

    /// Get a value by key
    Get { key: String },

    /// Remove a record, returning its value
    Del { key: String },
}

impl Command {
    /// Get the command type
    pub fn command_type(&self) -> CommandType {
        match self {
            Command::Set { .. } => CommandType::Set,
            Command::Get { .. } => CommandType::Get,
            Command::Del { .. } => CommandType::Del,
        }
    }

    pub fn key(&self) -> &str {
        match self {
            Command::Set { key, .. } | Command::Get { key } | Command::Del { key } => key,
        }
    }

    /// Run the command against storage
    ///
    /// SET always succeeds. GET and DEL fail with `KeyNotFound` when the key
    /// is absent; the dispatcher turns that into an error response.
    pub fn execute(self, storage: &Storage) -> Result<Response> {
        match self {
            Command::Set { key, value } => {
                let message = format!("SET OK: {} = {}", key, value);
                storage.set(key, value);
                Ok(Response::ok(message))
            }
            Command::Get { key } => {
                let value = storage.get(&key)?;
                Ok(Response::ok(format!("VALUE: {}", value)))
            }
            Command::Del { key } => {
                let value = storage.delete(&key)?;
                Ok(Response::ok(format!("DEL OK: {} = {}", key, value)))
            }
        }
    }
}
