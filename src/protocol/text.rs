//! Text protocol
//!
//! One request per line: `<VERB> <key> [value]\n`, verb case-insensitive,
//! tokens separated by any Unicode whitespace. Values cannot contain whitespace.

use std::io::{BufRead, Read};

use crate::error::{KvError, Result};

use super::{Command, CommandType, ParseError};

/// Parse one line (without its terminator) into a command
pub fn parse_line(line: &[u8]) -> std::result::Result<Command, ParseError> {
    let line = std::str::from_utf8(line).map_err(|_| ParseError::InvalidUtf8("command line"))?;
    let mut tokens = line.split_whitespace();

    let verb = tokens.next().ok_or(ParseError::Empty)?;
    let command_type =
        CommandType::from_verb(verb).ok_or_else(|| ParseError::UnknownVerb(verb.to_string()))?;

    let args: Vec<&str> = tokens.collect();
    if args.len() != command_type.arity() {
        return Err(ParseError::WrongArity {
            verb: command_type,
            expected: command_type.arity(),
            got: args.len(),
        });
    }

    let key = args[0].to_string();
    Ok(match command_type {
        CommandType::Set => Command::Set {
            key,
            value: args[1].to_string(),
        },
        CommandType::Get => Command::Get { key },
        CommandType::Del => Command::Del { key },
    })
}

/// Render a command as a request line, including the trailing newline
///
/// Fails for keys or values the text format cannot carry (empty, or
/// containing whitespace).
pub fn format_command(command: &Command) -> Result<String> {
    check_token("key", command.key())?;
    match command {
        Command::Set { key, value } => {
            check_token("value", value)?;
            Ok(format!("SET {} {}\n", key, value))
        }
        Command::Get { key } => Ok(format!("GET {}\n", key)),
        Command::Del { key } => Ok(format!("DEL {}\n", key)),
    }
}

fn check_token(field: &str, token: &str) -> Result<()> {
    if token.is_empty() || token.chars().any(char::is_whitespace) {
        return Err(KvError::Protocol(format!(
            "{} {:?} cannot be sent over the text protocol",
            field, token
        )));
    }
    Ok(())
}

/// Read one newline-terminated frame
///
/// Returns `Ok(None)` at end of stream. An unterminated trailing frame at
/// end of stream is discarded. A trailing `\r` is stripped along with the
/// newline. Lines longer than `max_frame_size` fail with `FrameTooLarge`.
pub fn read_line<R: BufRead>(reader: &mut R, max_frame_size: usize) -> Result<Option<Vec<u8>>> {
    let limit = max_frame_size as u64 + 1;
    let mut line = Vec::new();

    let read = reader.by_ref().take(limit).read_until(b'\n', &mut line)?;
    if read == 0 {
        return Ok(None);
    }

    if line.last() != Some(&b'\n') {
        if line.len() as u64 >= limit {
            return Err(KvError::FrameTooLarge {
                len: line.len(),
                max: max_frame_size,
            });
        }
        tracing::trace!("Discarding {} bytes of unterminated frame", line.len());
        return Ok(None);
    }

    line.pop();
    if line.last() == Some(&b'\r') {
        line.pop();
    }
    Ok(Some(line))
}
