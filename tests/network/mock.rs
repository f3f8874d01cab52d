//! Mock transport and client-side helpers shared by the network tests

use std::sync::{Arc, Mutex};

use picows::network::application::websocket::frame::{FrameHeader, Opcode, apply_mask};
use picows::network::error::Error;
use picows::network::{Connection, Transport};

pub const PAGE: &str = "<html><body><h1>picows</h1></body></html>";

/// Upgrade request from RFC 6455 section 1.2.
pub const REQUEST: &[u8] = b"GET /chat HTTP/1.1\r\n\
Host: server.example.com\r\n\
Upgrade: websocket\r\n\
Connection: Upgrade\r\n\
Sec-WebSocket-Key: dGhlIHNhbXBsZSBub25jZQ==\r\n\
Sec-WebSocket-Version: 13\r\n\
\r\n";

/// Accept value matching the key in [`REQUEST`].
pub const ACCEPT: &str = "s3pPLMBiTxaQ9kYGzzhZRbK+xOo=";

pub const MASK: [u8; 4] = [0x37, 0xfa, 0x21, 0x3d];

/// Everything the transport saw, shared with the test body.
#[derive(Debug, Default)]
pub struct Wire {
    pub sent: Vec<u8>,
    /// `more` flag of each send, in order.
    pub more: Vec<bool>,
    pub unacked: usize,
    pub recved: usize,
    pub recved_calls: usize,
    pub closed: usize,
}

pub type Shared = Arc<Mutex<Wire>>;

/// Transport recording every call into a shared [`Wire`].
#[derive(Debug)]
pub struct MockTransport {
    wire: Shared,
    capacity: usize,
}

impl MockTransport {
    /// Creates a transport whose send window holds `capacity` unacknowledged bytes.
    pub fn new(capacity: usize) -> (Self, Shared) {
        let wire = Arc::new(Mutex::new(Wire::default()));
        let transport = Self {
            wire: wire.clone(),
            capacity,
        };
        (transport, wire)
    }
}

impl Transport for MockTransport {
    type Error = Error;

    fn send(&mut self, buf: &[u8], more: bool) -> Result<(), Self::Error> {
        let mut wire = self.wire.lock().unwrap();
        if wire.closed > 0 {
            return Err(Error::NotOpen);
        }
        assert!(buf.len() <= self.capacity - wire.unacked, "send beyond capacity");
        wire.sent.extend_from_slice(buf);
        wire.more.push(more);
        wire.unacked += buf.len();
        Ok(())
    }

    fn send_capacity(&self) -> usize {
        self.capacity
            .saturating_sub(self.wire.lock().unwrap().unacked)
    }

    fn recved(&mut self, len: usize) {
        let mut wire = self.wire.lock().unwrap();
        wire.recved += len;
        wire.recved_calls += 1;
    }

    fn close(self) -> Result<(), Self::Error> {
        self.wire.lock().unwrap().closed += 1;
        Ok(())
    }
}

/// Acknowledges everything sent until the task stops sending; returns the
/// number of bytes acknowledged.
pub fn ack_all<const N: usize, const I: usize>(
    conn: &Connection<'_, MockTransport, N, I>,
    wire: &Shared,
) -> usize {
    let mut total = 0;
    loop {
        let n = std::mem::take(&mut wire.lock().unwrap().unacked);
        if n == 0 {
            return total;
        }
        conn.on_sent(n);
        total += n;
    }
}

/// Delivers `bytes` in segments of at most `chunk` bytes, each of which must
/// be accepted whole.
pub fn feed<const N: usize, const I: usize>(
    conn: &Connection<'_, MockTransport, N, I>,
    bytes: &[u8],
    chunk: usize,
) {
    for segment in bytes.chunks(chunk) {
        assert_eq!(conn.on_recv(segment), segment.len());
    }
}

/// Delivers `input` while acknowledging everything sent, until all of it has
/// been accepted.
pub fn pump<const N: usize, const I: usize>(
    conn: &Connection<'_, MockTransport, N, I>,
    wire: &Shared,
    mut input: &[u8],
    chunk: usize,
) {
    let mut stalls = 0;
    while !input.is_empty() {
        let n = conn.on_recv(&input[..input.len().min(chunk)]);
        input = &input[n..];
        let acked = ack_all(conn, wire);
        if n == 0 && acked == 0 {
            stalls += 1;
            assert!(stalls < 3, "connection stopped making progress");
        } else {
            stalls = 0;
        }
    }
    ack_all(conn, wire);
}

/// A complete client frame with a masked payload.
pub fn client_frame(opcode: Opcode, fin: bool, payload: &[u8], mask: [u8; 4]) -> Vec<u8> {
    let header = FrameHeader {
        fin,
        opcode,
        mask: Some(mask),
        payload_len: payload.len() as u64,
    };
    let mut frame = vec![0u8; header.encoded_len()];
    header.encode(&mut frame).unwrap();
    let mut body = payload.to_vec();
    apply_mask(&mut body, mask);
    frame.extend_from_slice(&body);
    frame
}

/// Splits sent bytes into the HTTP response head and whatever follows it.
pub fn split_head(sent: &[u8]) -> (String, &[u8]) {
    let end = sent
        .windows(4)
        .position(|w| w == b"\r\n\r\n")
        .expect("no complete response head")
        + 4;
    (String::from_utf8(sent[..end].to_vec()).unwrap(), &sent[end..])
}

/// Decodes a run of unmasked server frames.
pub fn server_frames(mut bytes: &[u8]) -> Vec<(FrameHeader, Vec<u8>)> {
    let mut frames = Vec::new();
    while !bytes.is_empty() {
        let (header, at) = FrameHeader::decode(bytes).expect("truncated frame header");
        assert_eq!(header.mask, None, "server frames are never masked");
        let end = at + header.payload_len as usize;
        frames.push((header, bytes[at..end].to_vec()));
        bytes = &bytes[end..];
    }
    frames
}
