//! Protocol Module
//!
//! Defines the wire protocols for client-server communication and how
//! commands execute against storage.
//!
//! ## Text Protocol
//!
//! ```text
//! request:  <VERB> <key> [value]\n        VERB ∈ {SET, GET, DEL}, any case
//! response: SET OK: <key> = <value>\n
//!           VALUE: <value>\n
//!           DEL OK: <key> = <value>\n
//!           ERROR: <reason>\n
//! ```
//! A malformed line gets an `ERROR:` response; the connection stays open.
//!
//! ## Binary Protocol
//!
//! ```text
//! request:  [tag (3)][key_len (4)][key]([value_len (4)][value])?
//! response: [version (1)][status (1)][len (4)][message]
//! ```
//! A malformed frame closes the connection without a response: once a
//! length prefix is untrustworthy the stream cannot be re-synchronized.
//!
//! ### Status Codes
//! - 0x00: OK
//! - 0x01: NOT_FOUND
//! - 0x02: ERROR

mod command;
mod error;
mod response;

pub mod codec;
pub mod text;

pub use codec::{decode_command, decode_response, encode_command, encode_response};
pub use command::{Command, CommandType};
pub use error::ParseError;
pub use response::{Response, Status, ERROR_PREFIX};
