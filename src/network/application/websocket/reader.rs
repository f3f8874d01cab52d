use super::frame::{Opcode, apply_mask, extended_len_bytes};
use crate::network::Transport;
use crate::network::error::Error;
use crate::network::io::Io;

/// Streams the payload of incoming data frames.
///
/// Headers are parsed as they arrive; payload bytes are unmasked in place in
/// the caller's buffer, so a frame of any length passes through without being
/// buffered. Continuation frames carry on the opcode of the message they
/// belong to. Ping and pong frames are drained and dropped, a close frame ends
/// the stream with [`Error::ConnectionClosed`].
#[derive(Debug, Default, Clone)]
pub struct FrameReader {
    remaining: u64,
    mask: [u8; 4],
    /// Opcode of a fragmented message still waiting for its final frame.
    message: Option<Opcode>,
    opcode: Option<Opcode>,
    fin: bool,
}

impl FrameReader {
    pub const fn new() -> Self {
        Self {
            remaining: 0,
            mask: [0; 4],
            message: None,
            opcode: None,
            fin: false,
        }
    }

    pub fn reset(&mut self) {
        *self = Self::new();
    }

    /// Payload bytes of the current frame not yet delivered.
    pub fn remaining(&self) -> u64 {
        self.remaining
    }

    /// Opcode of the message being read.
    pub fn opcode(&self) -> Option<Opcode> {
        self.opcode
    }

    /// Whether the current frame is the last of its message.
    pub fn is_final(&self) -> bool {
        self.fin
    }

    /// Fills `buf` from the current data frame, reading the next frame header
    /// first if the current one is exhausted.
    ///
    /// Returns fewer bytes than `buf` holds only when the frame ends first. An
    /// empty data frame reads as `Ok(0)` so its end of message is still seen.
    pub async fn read<T: Transport, const N: usize, const I: usize>(
        &mut self,
        io: &Io<'_, T, N, I>,
        buf: &mut [u8],
    ) -> Result<usize, Error> {
        if buf.is_empty() {
            return Ok(0);
        }
        if self.remaining == 0 {
            while !self.next_frame(io).await? {}
            if self.remaining == 0 {
                return Ok(0);
            }
        }

        let want = (buf.len() as u64).min(self.remaining) as usize;
        let mut filled = 0;
        while filled < want {
            let n = io.read_some(&mut buf[filled..want]).await?;
            apply_mask(&mut buf[filled..filled + n], self.mask);
            self.mask.rotate_left(n % 4);
            filled += n;
        }
        self.remaining -= want as u64;
        Ok(want)
    }

    /// Reads one frame header. Returns `false` when the frame was drained
    /// without becoming the current data frame.
    async fn next_frame<T: Transport, const N: usize, const I: usize>(
        &mut self,
        io: &Io<'_, T, N, I>,
    ) -> Result<bool, Error> {
        let mut base = [0u8; 2];
        io.read_exact(&mut base).await?;
        let fin = base[0] & 0x80 != 0;
        let opcode = Opcode::from_bits(base[0]);

        let mut ext = [0u8; 8];
        let ext_len = extended_len_bytes(base[1]);
        io.read_exact(&mut ext[..ext_len]).await?;
        let len = match ext_len {
            2 => u16::from_be_bytes([ext[0], ext[1]]) as u64,
            8 => u64::from_be_bytes(ext),
            _ => (base[1] & 0x7F) as u64,
        };

        let mut mask = [0u8; 4];
        if base[1] & 0x80 != 0 {
            io.read_exact(&mut mask).await?;
        }

        let effective = match opcode {
            Opcode::Text | Opcode::Binary => opcode,
            Opcode::Continuation => match self.message {
                Some(message) => message,
                None => {
                    log::warn!("continuation of {} bytes without a message", len);
                    io.skip(len).await?;
                    return Ok(false);
                }
            },
            Opcode::Close => {
                log::debug!("close frame received");
                io.skip(len).await?;
                return Err(Error::ConnectionClosed);
            }
            other => {
                log::debug!("dropping {:?} frame of {} bytes", other, len);
                io.skip(len).await?;
                return Ok(false);
            }
        };

        self.message = if fin { None } else { Some(effective) };
        self.opcode = Some(effective);
        self.fin = fin;
        self.remaining = len;
        self.mask = mask;
        Ok(true)
    }
}
