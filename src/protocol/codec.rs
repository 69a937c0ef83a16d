//! Binary protocol codec
//!
//! Encoding and decoding functions for the length-prefixed wire format.
//!
//! ## Wire Format
//!
//! ### Request (Command) Format
//! ```text
//! ┌──────────┬────────────┬─────────┬──────────────┬───────────┐
//! │ Tag (3)  │ KeyLen (4) │   Key   │ ValueLen (4) │   Value   │
//! └──────────┴────────────┴─────────┴──────────────┴───────────┘
//!                                    └──── SET only ──────────┘
//! ```
//! Tag is the ASCII literal `SET`, `GET` or `DEL`; lengths are big-endian
//! u32. A buffer holding anything past the end of the frame is rejected.
//!
//! ### Response Format (version 1)
//! ```text
//! ┌────────────┬───────────┬──────────┬─────────────────────────┐
//! │Version (1) │Status (1) │ Len (4)  │  Payload (UTF-8 message)│
//! └────────────┴───────────┴──────────┴─────────────────────────┘
//! ```

use std::io::{ErrorKind, Read, Write};

use bytes::{Buf, BufMut, BytesMut};

use crate::error::{KvError, Result};

use super::{Command, CommandType, ParseError, Response, Status};

/// Size of the command tag
pub const TAG_SIZE: usize = 3;

/// Size of every length prefix
pub const LEN_SIZE: usize = 4;

/// Response envelope version written by this codec
pub const RESPONSE_VERSION: u8 = 0x01;

/// Response header: version (1) + status (1) + payload length (4)
pub const RESPONSE_HEADER_SIZE: usize = 6;

// =============================================================================
// Command Encoding/Decoding
// =============================================================================

/// Encode a command to bytes
pub fn encode_command(command: &Command) -> Vec<u8> {
    let mut buf = BytesMut::with_capacity(frame_len(command));
    buf.put_slice(command.command_type().tag());

    match command {
        Command::Set { key, value } => {
            put_field(&mut buf, key.as_bytes());
            put_field(&mut buf, value.as_bytes());
        }
        Command::Get { key } | Command::Del { key } => {
            put_field(&mut buf, key.as_bytes());
        }
    }

    buf.to_vec()
}

fn frame_len(command: &Command) -> usize {
    let fields = match command {
        Command::Set { key, value } => 2 * LEN_SIZE + key.len() + value.len(),
        Command::Get { key } | Command::Del { key } => LEN_SIZE + key.len(),
    };
    TAG_SIZE + fields
}

fn put_field(buf: &mut BytesMut, field: &[u8]) {
    buf.put_u32(field.len() as u32);
    buf.put_slice(field);
}

/// Decode exactly one command from `bytes`
pub fn decode_command(bytes: &[u8]) -> std::result::Result<Command, ParseError> {
    let mut buf = bytes;

    if buf.len() < TAG_SIZE {
        return Err(ParseError::Truncated {
            field: "tag",
            needed: TAG_SIZE,
            available: buf.len(),
        });
    }
    let command_type = CommandType::from_tag(&buf[..TAG_SIZE])
        .ok_or_else(|| ParseError::UnknownTag(String::from_utf8_lossy(&buf[..TAG_SIZE]).into_owned()))?;
    buf.advance(TAG_SIZE);

    let key = take_field(&mut buf, "key")?;
    let command = match command_type {
        CommandType::Set => {
            let value = take_field(&mut buf, "value")?;
            Command::Set { key, value }
        }
        CommandType::Get => Command::Get { key },
        CommandType::Del => Command::Del { key },
    };

    if buf.has_remaining() {
        return Err(ParseError::TrailingBytes(buf.remaining()));
    }

    Ok(command)
}

fn take_field(buf: &mut &[u8], field: &'static str) -> std::result::Result<String, ParseError> {
    if buf.remaining() < LEN_SIZE {
        return Err(ParseError::Truncated {
            field: "length prefix",
            needed: LEN_SIZE,
            available: buf.remaining(),
        });
    }
    let len = buf.get_u32() as usize;

    if buf.remaining() < len {
        return Err(ParseError::Truncated {
            field,
            needed: len,
            available: buf.remaining(),
        });
    }
    let raw = buf[..len].to_vec();
    buf.advance(len);

    String::from_utf8(raw).map_err(|_| ParseError::InvalidUtf8(field))
}

// =============================================================================
// Response Encoding/Decoding
// =============================================================================

/// Encode a response to bytes
pub fn encode_response(response: &Response) -> Vec<u8> {
    let payload = response.message.as_bytes();

    let mut buf = BytesMut::with_capacity(RESPONSE_HEADER_SIZE + payload.len());
    buf.put_u8(RESPONSE_VERSION);
    buf.put_u8(response.status as u8);
    buf.put_u32(payload.len() as u32);
    buf.put_slice(payload);

    buf.to_vec()
}

/// Decode a response from bytes
pub fn decode_response(bytes: &[u8]) -> Result<Response> {
    if bytes.len() < RESPONSE_HEADER_SIZE {
        return Err(KvError::Protocol(format!(
            "Incomplete response header: expected {} bytes, got {}",
            RESPONSE_HEADER_SIZE,
            bytes.len()
        )));
    }

    let mut buf = bytes;
    let (status, payload_len) = parse_response_header(&buf[..RESPONSE_HEADER_SIZE])?;
    buf.advance(RESPONSE_HEADER_SIZE);

    if buf.remaining() != payload_len {
        return Err(KvError::Protocol(format!(
            "Response payload length mismatch: header says {}, got {}",
            payload_len,
            buf.remaining()
        )));
    }

    let message = String::from_utf8(buf.to_vec())
        .map_err(|_| KvError::Protocol("Response payload is not valid UTF-8".to_string()))?;

    Ok(Response { status, message })
}

fn parse_response_header(mut header: &[u8]) -> Result<(Status, usize)> {
    let version = header.get_u8();
    if version != RESPONSE_VERSION {
        return Err(KvError::Protocol(format!(
            "Unsupported response version: 0x{:02x}",
            version
        )));
    }

    let status_byte = header.get_u8();
    let status = Status::from_byte(status_byte).ok_or_else(|| {
        KvError::Protocol(format!("Unknown response status: 0x{:02x}", status_byte))
    })?;

    Ok((status, header.get_u32() as usize))
}

// =============================================================================
// Stream-based I/O helpers
// =============================================================================

/// Read one complete command frame from a stream
///
/// Returns the raw frame bytes (suitable for `decode_command`), or
/// `Ok(None)` if the stream ends cleanly on a frame boundary. An unknown tag
/// or a frame whose total size would exceed `max_frame_size` means the
/// stream can no longer be framed and is reported as an error.
///
/// Field bytes are buffered as they arrive, so a length prefix alone never
/// reserves the memory it claims.
pub fn read_frame<R: Read>(reader: &mut R, max_frame_size: usize) -> Result<Option<Vec<u8>>> {
    let mut tag = [0u8; TAG_SIZE];
    if !read_exact_or_eof(reader, &mut tag)? {
        return Ok(None);
    }

    let command_type = CommandType::from_tag(&tag).ok_or_else(|| {
        KvError::Parse(ParseError::UnknownTag(String::from_utf8_lossy(&tag).into_owned()))
    })?;

    let mut frame = Vec::with_capacity(64);
    frame.extend_from_slice(&tag);
    read_field(reader, &mut frame, max_frame_size)?;
    if command_type == CommandType::Set {
        read_field(reader, &mut frame, max_frame_size)?;
    }

    Ok(Some(frame))
}

fn read_field<R: Read>(reader: &mut R, frame: &mut Vec<u8>, max_frame_size: usize) -> Result<()> {
    let mut len_bytes = [0u8; LEN_SIZE];
    reader.read_exact(&mut len_bytes)?;

    let len = u32::from_be_bytes(len_bytes) as usize;
    let frame_len = frame.len().saturating_add(LEN_SIZE).saturating_add(len);
    if frame_len > max_frame_size {
        return Err(KvError::FrameTooLarge {
            len: frame_len,
            max: max_frame_size,
        });
    }

    frame.extend_from_slice(&len_bytes);
    let read = reader.by_ref().take(len as u64).read_to_end(frame)?;
    if read < len {
        return Err(KvError::Io(ErrorKind::UnexpectedEof.into()));
    }
    Ok(())
}

/// Like `read_exact`, but a clean end of stream before the first byte
/// returns `Ok(false)` instead of an error
fn read_exact_or_eof<R: Read>(reader: &mut R, buf: &mut [u8]) -> Result<bool> {
    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..]) {
            Ok(0) if filled == 0 => return Ok(false),
            Ok(0) => return Err(KvError::Io(ErrorKind::UnexpectedEof.into())),
            Ok(n) => filled += n,
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => return Err(e.into()),
        }
    }
    Ok(true)
}

/// Write a command to a stream
pub fn write_command<W: Write>(writer: &mut W, command: &Command) -> Result<()> {
    let bytes = encode_command(command);
    writer.write_all(&bytes)?;
    writer.flush()?;
    Ok(())
}

/// Read a complete response from a stream
pub fn read_response<R: Read>(reader: &mut R) -> Result<Response> {
    let mut header = [0u8; RESPONSE_HEADER_SIZE];
    reader.read_exact(&mut header)?;

    let (status, payload_len) = parse_response_header(&header)?;

    let mut payload = vec![0u8; payload_len];
    reader.read_exact(&mut payload)?;

    let message = String::from_utf8(payload)
        .map_err(|_| KvError::Protocol("Response payload is not valid UTF-8".to_string()))?;

    Ok(Response { status, message })
}

/// Write a response to a stream
pub fn write_response<W: Write>(writer: &mut W, response: &Response) -> Result<()> {
    let bytes = encode_response(response);
    writer.write_all(&bytes)?;
    writer.flush()?;
    Ok(())
}
