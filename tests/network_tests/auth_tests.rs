//! Authentication handshake tests

use std::io::{BufRead, BufReader, Write};
use std::net::TcpStream;
use std::thread;
use std::time::{Duration, Instant};

use linekv::{Client, Config, Credentials, KvError, WireFormat};

use crate::common::{start_server, wait_until, LineSocket};

fn auth_config(wire_format: WireFormat) -> Config {
    Config::builder()
        .listen_addr("127.0.0.1:0")
        .wire_format(wire_format)
        .credentials("admin", "s3cret")
        .auth_timeout_ms(300)
        .build()
}

#[test]
fn test_valid_credentials_then_commands() {
    let (_server, addr) = start_server(auth_config(WireFormat::Text));
    let mut socket = LineSocket::connect(addr);

    assert_eq!(socket.request("admin:s3cret").as_deref(), Some("OK"));
    assert_eq!(socket.request("SET k v").as_deref(), Some("SET OK: k = v"));
    assert_eq!(socket.request("GET k").as_deref(), Some("VALUE: v"));
}

#[test]
fn test_invalid_credentials_close_connection() {
    let (server, addr) = start_server(auth_config(WireFormat::Text));
    let mut socket = LineSocket::connect(addr);

    assert_eq!(
        socket.request("admin:wrong").as_deref(),
        Some("ERROR: invalid login or password")
    );
    assert_eq!(socket.recv(), None);
    assert!(wait_until(|| server.connection_count() == 0));
}

#[test]
fn test_command_instead_of_credentials_is_rejected() {
    let (server, addr) = start_server(auth_config(WireFormat::Text));
    let mut socket = LineSocket::connect(addr);

    assert_eq!(
        socket.request("SET k v").as_deref(),
        Some("ERROR: invalid login or password")
    );
    assert_eq!(socket.recv(), None);
    assert!(server.storage().is_empty());
}

#[test]
fn test_silent_client_times_out() {
    let (server, addr) = start_server(auth_config(WireFormat::Text));
    let mut socket = LineSocket::connect(addr);

    assert_eq!(
        socket.recv().as_deref(),
        Some("ERROR: failed to read credentials, please send login:password")
    );
    assert_eq!(socket.recv(), None);
    assert!(wait_until(|| server.connection_count() == 0));
}

#[test]
fn test_trickled_credentials_still_time_out() {
    let (server, addr) = start_server(auth_config(WireFormat::Text));
    let stream = TcpStream::connect(addr).unwrap();
    stream
        .set_read_timeout(Some(Duration::from_secs(5)))
        .unwrap();

    // One byte every 100ms keeps each read well inside the 300ms timeout
    let mut writer = stream.try_clone().unwrap();
    let trickle = thread::spawn(move || {
        for _ in 0..30 {
            if writer.write_all(b"a").is_err() {
                break;
            }
            thread::sleep(Duration::from_millis(100));
        }
    });

    let started = Instant::now();
    let mut reader = BufReader::new(stream);
    let mut line = String::new();
    reader.read_line(&mut line).unwrap();

    assert_eq!(
        line.trim_end(),
        "ERROR: failed to read credentials, please send login:password"
    );
    assert!(
        started.elapsed() < Duration::from_secs(2),
        "handshake lasted {:?}",
        started.elapsed()
    );
    assert!(wait_until(|| server.connection_count() == 0));
    trickle.join().unwrap();
}

#[test]
fn test_credentials_split_across_writes() {
    let (_server, addr) = start_server(auth_config(WireFormat::Text));
    let mut socket = LineSocket::connect(addr);

    socket.send(b"adm");
    thread::sleep(Duration::from_millis(50));
    socket.send(b"in:s3");
    thread::sleep(Duration::from_millis(50));
    assert_eq!(socket.request("cret").as_deref(), Some("OK"));
    assert_eq!(socket.request("SET k v").as_deref(), Some("SET OK: k = v"));
}

#[test]
fn test_binary_server_uses_text_handshake() {
    let (_server, addr) = start_server(auth_config(WireFormat::Binary));
    let credentials = Credentials::new("admin", "s3cret");

    let mut client =
        Client::connect_with_credentials(addr, WireFormat::Binary, &credentials).unwrap();
    assert_eq!(client.set("k", "v").unwrap(), "SET OK: k = v");
    assert_eq!(client.get("k").unwrap(), "v");
}

#[test]
fn test_client_reports_rejected_credentials() {
    let (_server, addr) = start_server(auth_config(WireFormat::Binary));
    let credentials = Credentials::new("admin", "nope");

    match Client::connect_with_credentials(addr, WireFormat::Binary, &credentials) {
        Err(KvError::Auth(reply)) => assert_eq!(reply, "ERROR: invalid login or password"),
        Err(e) => panic!("Expected Auth error, got {}", e),
        Ok(_) => panic!("Expected Auth error, got a client"),
    }
}
