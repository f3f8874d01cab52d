//! WebSocket protocol (RFC 6455), server side.
//!
//! After a successful upgrade the session hands a [`WebSocket`] to a
//! [`Service`]. Reads stream the payload of incoming data frames; writes are
//! packed into complete outbound frames directly inside the connection's send
//! ring, so nothing is copied between the caller and the transport.
//!
//! # Example
//!
//! A service that answers every message with its length:
//!
//! ```rust,no_run
//! use core::fmt::Write as _;
//! use picows::network::Transport;
//! use picows::network::application::websocket::{Service, WebSocket};
//! use picows::network::error::Error;
//!
//! struct Lengths;
//!
//! impl Service for Lengths {
//!     async fn serve<T: Transport + Send, const N: usize, const I: usize>(
//!         &mut self,
//!         ws: &mut WebSocket<'_, '_, T, N, I>,
//!     ) -> Result<(), Error> {
//!         let mut buf = [0u8; 64];
//!         let mut total = 0;
//!         loop {
//!             total += ws.read(&mut buf).await?;
//!             if ws.is_message_end() {
//!                 let mut line: heapless::String<24> = heapless::String::new();
//!                 write!(line, "{}", total).map_err(|_| Error::BufferFull)?;
//!                 ws.write(line.as_bytes()).await?;
//!                 ws.push().await?;
//!                 total = 0;
//!             }
//!         }
//!     }
//! }
//! ```

use core::future::Future;

use crate::network::Transport;
use crate::network::config::Config;
use crate::network::error::Error;
use crate::network::io::Io;

pub mod frame;
pub mod reader;
pub mod ring;
pub mod writer;

pub use frame::{FrameHeader, Framing, Opcode};
pub use reader::FrameReader;
pub use writer::FrameWriter;

/// An upgraded connection as seen by a [`Service`].
pub struct WebSocket<'io, 'a, T, const N: usize, const I: usize> {
    io: &'io Io<'a, T, N, I>,
    reader: FrameReader,
    writer: FrameWriter,
}

impl<T, const N: usize, const I: usize> core::fmt::Debug for WebSocket<'_, '_, T, N, I> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("WebSocket")
            .field("reader", &self.reader)
            .field("writer", &self.writer)
            .finish_non_exhaustive()
    }
}

impl<'io, 'a, T: Transport, const N: usize, const I: usize> WebSocket<'io, 'a, T, N, I> {
    pub fn new(io: &'io Io<'a, T, N, I>, config: &Config<'_>) -> Self {
        Self {
            io,
            reader: FrameReader::new(),
            writer: FrameWriter::new(config.framing()),
        }
    }

    /// Reads payload bytes of the current message into `buf`.
    pub async fn read(&mut self, buf: &mut [u8]) -> Result<usize, Error> {
        self.reader.read(self.io, buf).await
    }

    /// Queues `bytes` for sending.
    pub async fn write(&mut self, bytes: &[u8]) -> Result<(), Error> {
        self.writer.write(self.io, bytes).await
    }

    /// Sends what is queued without waiting for it to be acknowledged.
    pub async fn push(&mut self) -> Result<(), Error> {
        self.writer.push(self.io).await
    }

    /// Sends what is queued and waits until the peer acknowledged all of it.
    pub async fn flush(&mut self) -> Result<(), Error> {
        self.writer.flush(self.io).await
    }

    pub fn reader(&self) -> &FrameReader {
        &self.reader
    }

    /// `true` once the last byte of a complete message has been read.
    pub fn is_message_end(&self) -> bool {
        self.reader.remaining() == 0 && self.reader.is_final()
    }
}

/// Application logic run on an upgraded connection.
///
/// Returning ends the session; the connection is closed either way.
pub trait Service {
    fn serve<T: Transport + Send, const N: usize, const I: usize>(
        &mut self,
        ws: &mut WebSocket<'_, '_, T, N, I>,
    ) -> impl Future<Output = Result<(), Error>> + Send;
}

/// Writes every received message back to the sender.
#[derive(Debug, Default, Clone, Copy)]
pub struct Echo;

impl Service for Echo {
    async fn serve<T: Transport + Send, const N: usize, const I: usize>(
        &mut self,
        ws: &mut WebSocket<'_, '_, T, N, I>,
    ) -> Result<(), Error> {
        let mut buf = [0u8; 128];
        loop {
            let n = ws.read(&mut buf).await?;
            ws.write(&buf[..n]).await?;
            if ws.is_message_end() {
                ws.push().await?;
            }
        }
    }
}
