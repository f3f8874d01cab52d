use core::fmt::Write;

use base64ct::{Base64, Encoding};
use heapless::{String, Vec};
use sha1::{Digest, Sha1};

use super::handshake::KEY_LEN;
use crate::network::error::Error;

/// Length of a `Sec-WebSocket-Accept` value (20-byte digest, base64).
pub const ACCEPT_LEN: usize = 28;

/// Fixed suffix hashed together with the client key (RFC 6455 section 1.3).
pub const WEBSOCKET_GUID: &[u8] = b"258EAFA5-E914-47DA-95CA-C5AB0DC85B11";

const MAX_HEAD_LEN: usize = 256;

/// Computes the `Sec-WebSocket-Accept` value for a client key.
pub fn accept_key(key: &[u8; KEY_LEN]) -> Result<[u8; ACCEPT_LEN], Error> {
    let mut sha1 = Sha1::new();
    sha1.update(key);
    sha1.update(WEBSOCKET_GUID);
    let digest = sha1.finalize();

    let mut accept = [0u8; ACCEPT_LEN];
    Base64::encode(&digest, &mut accept).map_err(|_| Error::BufferFull)?;
    Ok(accept)
}

/// Builds the `101 Switching Protocols` response head.
pub fn switching_protocols(
    accept: &[u8; ACCEPT_LEN],
    protocol: Option<&str>,
) -> Result<Vec<u8, MAX_HEAD_LEN>, Error> {
    let mut head: Vec<u8, MAX_HEAD_LEN> = Vec::new();
    head.extend_from_slice(b"HTTP/1.1 101 Switching Protocols\r\n")
        .map_err(|_| Error::BufferFull)?;
    head.extend_from_slice(b"Upgrade: websocket\r\n")
        .map_err(|_| Error::BufferFull)?;
    head.extend_from_slice(b"Connection: Upgrade\r\n")
        .map_err(|_| Error::BufferFull)?;
    head.extend_from_slice(b"Sec-WebSocket-Accept: ")
        .map_err(|_| Error::BufferFull)?;
    head.extend_from_slice(accept).map_err(|_| Error::BufferFull)?;
    head.extend_from_slice(b"\r\n").map_err(|_| Error::BufferFull)?;
    if let Some(protocol) = protocol {
        head.extend_from_slice(b"Sec-WebSocket-Protocol: ")
            .map_err(|_| Error::BufferFull)?;
        head.extend_from_slice(protocol.as_bytes())
            .map_err(|_| Error::BufferFull)?;
        head.extend_from_slice(b"\r\n").map_err(|_| Error::BufferFull)?;
    }
    head.extend_from_slice(b"\r\n").map_err(|_| Error::BufferFull)?;
    Ok(head)
}

/// Builds the `200 OK` response head for a static page of `len` bytes.
pub fn page_head(len: usize) -> Result<String<MAX_HEAD_LEN>, Error> {
    let mut head: String<MAX_HEAD_LEN> = String::new();
    write!(
        head,
        "HTTP/1.1 200 OK\r\nContent-Type: text/html\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
        len
    )
    .map_err(|_| Error::BufferFull)?;
    Ok(head)
}
