//! Authentication handshake
//!
//! When credentials are configured, the first line a client sends must be
//! `login:password`. The server answers `OK` and starts the receive loop, or
//! answers with an `ERROR:` line and the connection is closed.

use std::time::{Duration, Instant};

use crate::config::Credentials;
use crate::error::{KvError, Result};
use crate::protocol::ERROR_PREFIX;

use super::connection::{Connection, FrameReader};

/// Reply sent after a successful handshake
pub const AUTH_OK: &str = "OK";

/// Run the handshake on a freshly accepted connection
///
/// The whole credential line must arrive within `timeout` of the call,
/// however it is split across packets. On success the read timeout is
/// cleared again so the receive loop can block indefinitely.
pub fn authenticate(
    connection: &Connection,
    reader: &mut FrameReader,
    credentials: &Credentials,
    timeout: Duration,
) -> Result<()> {
    let deadline = Instant::now() + timeout;

    let line = match reader.read_line_before(deadline) {
        Ok(Some(line)) => line,
        Ok(None) => {
            return Err(KvError::Auth(
                "connection closed before credentials were sent".to_string(),
            ))
        }
        Err(e) => {
            let _ = connection.send_line(&format!(
                "{}failed to read credentials, please send login:password",
                ERROR_PREFIX
            ));
            return Err(KvError::Auth(format!("failed to read credentials: {}", e)));
        }
    };

    let received = String::from_utf8_lossy(&line);
    if received.trim() != credentials.handshake_line() {
        let _ = connection.send_line(&format!("{}invalid login or password", ERROR_PREFIX));
        return Err(KvError::Auth("invalid login or password".to_string()));
    }

    connection.send_line(AUTH_OK)?;
    reader.set_read_timeout(None)?;
    Ok(())
}
