//! Parse errors
//!
//! Everything that can be wrong with a request frame, for either wire format.

use thiserror::Error;

use super::CommandType;

/// A request frame that could not be turned into a command
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("empty command")]
    Empty,

    #[error("unknown command '{0}'")]
    UnknownVerb(String),

    #[error("{verb} requires {expected} argument(s), got {got}")]
    WrongArity {
        verb: CommandType,
        expected: usize,
        got: usize,
    },

    #[error("unknown command tag {0:?}")]
    UnknownTag(String),

    #[error("truncated {field}: need {needed} bytes, {available} available")]
    Truncated {
        field: &'static str,
        needed: usize,
        available: usize,
    },

    #[error("{0} unexpected trailing bytes after frame")]
    TrailingBytes(usize),

    #[error("{0} is not valid UTF-8")]
    InvalidUtf8(&'static str),
}
