//! Shared helpers for the integration tests

use std::io::{BufRead, BufReader, Write};
use std::net::{SocketAddr, TcpStream};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use linekv::{Config, Server, Storage, WireFormat};

/// Config bound to an ephemeral loopback port
pub fn test_config(wire_format: WireFormat) -> Config {
    Config::builder()
        .listen_addr("127.0.0.1:0")
        .wire_format(wire_format)
        .auth_timeout_ms(300)
        .build()
}

/// Start a server and return it with its bound address
pub fn start_server(config: Config) -> (Server, SocketAddr) {
    let server = Server::new(config, Arc::new(Storage::new()));
    server.start().unwrap();
    let addr = server.local_addr().unwrap();
    (server, addr)
}

/// Poll `condition` until it holds or two seconds pass
pub fn wait_until(mut condition: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + Duration::from_secs(2);
    while Instant::now() < deadline {
        if condition() {
            return true;
        }
        thread::sleep(Duration::from_millis(5));
    }
    condition()
}

/// Raw line-oriented socket for poking at the text protocol directly
pub struct LineSocket {
    reader: BufReader<TcpStream>,
    writer: TcpStream,
}

impl LineSocket {
    pub fn connect(addr: SocketAddr) -> Self {
        let stream = TcpStream::connect(addr).unwrap();
        stream
            .set_read_timeout(Some(Duration::from_secs(5)))
            .unwrap();
        let reader = BufReader::new(stream.try_clone().unwrap());
        Self {
            reader,
            writer: stream,
        }
    }

    /// Write raw bytes; a failed write shows up as `None` from `recv`
    pub fn send(&mut self, bytes: &[u8]) {
        let _ = self.writer.write_all(bytes);
    }

    /// Next line without its terminator, or `None` once the server closed
    pub fn recv(&mut self) -> Option<String> {
        let mut line = String::new();
        match self.reader.read_line(&mut line) {
            Ok(0) | Err(_) => None,
            Ok(_) => Some(line.trim_end_matches(['\r', '\n']).to_string()),
        }
    }

    /// Send one line and return the reply
    pub fn request(&mut self, line: &str) -> Option<String> {
        self.send(format!("{}\n", line).as_bytes());
        self.recv()
    }
}
