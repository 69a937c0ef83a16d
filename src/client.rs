//! Client library
//!
//! Blocking client speaking either wire format, with the optional
//! authentication handshake.

use std::io::{BufRead, BufReader, BufWriter, Write};
use std::net::{TcpStream, ToSocketAddrs};
use std::time::Duration;

use crate::config::{Credentials, WireFormat};
use crate::error::{KvError, Result};
use crate::network::AUTH_OK;
use crate::protocol::{codec, text, Command, Response, Status};

/// A connection to a linekv server
pub struct Client {
    reader: BufReader<TcpStream>,
    writer: BufWriter<TcpStream>,
    wire_format: WireFormat,
}

impl Client {
    /// Connect without authenticating
    pub fn connect(addr: impl ToSocketAddrs, wire_format: WireFormat) -> Result<Self> {
        let stream = TcpStream::connect(addr)?;
        stream.set_nodelay(true)?;
        let read_stream = stream.try_clone()?;

        Ok(Self {
            reader: BufReader::new(read_stream),
            writer: BufWriter::new(stream),
            wire_format,
        })
    }

    /// Connect and run the `login:password` handshake
    pub fn connect_with_credentials(
        addr: impl ToSocketAddrs,
        wire_format: WireFormat,
        credentials: &Credentials,
    ) -> Result<Self> {
        let mut client = Self::connect(addr, wire_format)?;
        client.authenticate(credentials)?;
        Ok(client)
    }

    /// Send credentials and wait for `OK`
    pub fn authenticate(&mut self, credentials: &Credentials) -> Result<()> {
        self.writer
            .write_all(format!("{}\n", credentials.handshake_line()).as_bytes())?;
        self.writer.flush()?;

        let reply = self.read_text_line()?;
        if reply == AUTH_OK {
            Ok(())
        } else {
            Err(KvError::Auth(reply))
        }
    }

    pub fn set_read_timeout(&self, timeout: Option<Duration>) -> Result<()> {
        self.reader.get_ref().set_read_timeout(timeout)?;
        Ok(())
    }

    /// Store `value` under `key`, returning the server's acknowledgement
    pub fn set(&mut self, key: &str, value: &str) -> Result<String> {
        let response = self.request(&Command::Set {
            key: key.to_string(),
            value: value.to_string(),
        })?;
        into_message(key, response)
    }

    /// Fetch the value stored under `key`
    pub fn get(&mut self, key: &str) -> Result<String> {
        let response = self.request(&Command::Get {
            key: key.to_string(),
        })?;
        let message = into_message(key, response)?;
        strip(&message, "VALUE: ")
    }

    /// Delete `key`, returning the value it held
    pub fn del(&mut self, key: &str) -> Result<String> {
        let response = self.request(&Command::Del {
            key: key.to_string(),
        })?;
        let message = into_message(key, response)?;
        strip(&message, &format!("DEL OK: {} = ", key))
    }

    /// Send one command and wait for its response
    pub fn request(&mut self, command: &Command) -> Result<Response> {
        match self.wire_format {
            WireFormat::Text => {
                let line = text::format_command(command)?;
                self.writer.write_all(line.as_bytes())?;
                self.writer.flush()?;
                let reply = self.read_text_line()?;
                Ok(Response::from_text_line(&reply))
            }
            WireFormat::Binary => {
                codec::write_command(&mut self.writer, command)?;
                codec::read_response(&mut self.reader)
            }
        }
    }

    /// Send raw bytes as-is (for exercising malformed input)
    pub fn send_raw(&mut self, bytes: &[u8]) -> Result<()> {
        self.writer.write_all(bytes)?;
        self.writer.flush()?;
        Ok(())
    }

    /// Read one text line, without its terminator
    pub fn read_text_line(&mut self) -> Result<String> {
        let mut line = String::new();
        if self.reader.read_line(&mut line)? == 0 {
            return Err(KvError::Io(std::io::ErrorKind::UnexpectedEof.into()));
        }
        Ok(line.trim_end_matches(['\r', '\n']).to_string())
    }

    /// Read one binary response envelope
    pub fn read_binary_response(&mut self) -> Result<Response> {
        codec::read_response(&mut self.reader)
    }
}

fn into_message(key: &str, response: Response) -> Result<String> {
    match response.status {
        Status::Ok => Ok(response.message),
        Status::NotFound => Err(KvError::KeyNotFound(key.to_string())),
        Status::Error => Err(KvError::Remote(response.message)),
    }
}

fn strip(message: &str, prefix: &str) -> Result<String> {
    message
        .strip_prefix(prefix)
        .map(str::to_string)
        .ok_or_else(|| KvError::Protocol(format!("unexpected response: {}", message)))
}
