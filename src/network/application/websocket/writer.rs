use super::frame::Framing;
use super::ring::Append;
use crate::network::Transport;
use crate::network::error::Error;
use crate::network::io::Io;

/// Writes bytes into the connection's send ring with one framing.
///
/// Data accumulates in the current frame until it reaches the configured send
/// threshold or maximum payload, then leaves as one complete frame. Writes
/// larger than the maximum payload become several complete frames.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameWriter {
    framing: Framing,
}

impl FrameWriter {
    pub const fn new(framing: Framing) -> Self {
        Self { framing }
    }

    pub const fn framing(&self) -> Framing {
        self.framing
    }

    /// Queues all of `bytes`, waiting for ring space or send capacity as needed.
    pub async fn write<T: Transport, const N: usize, const I: usize>(
        &self,
        io: &Io<'_, T, N, I>,
        mut bytes: &[u8],
    ) -> Result<(), Error> {
        while !bytes.is_empty() {
            match io.link().with(|s| s.append(self.framing, bytes))? {
                Append::Took(n) => bytes = &bytes[n..],
                Append::Blocked(reason) => io.suspend(reason).await?,
            }
        }
        Ok(())
    }

    /// Hands the open frame to the transport without waiting for acknowledgements.
    pub async fn push<T: Transport, const N: usize, const I: usize>(
        &self,
        io: &Io<'_, T, N, I>,
    ) -> Result<(), Error> {
        while let Some(reason) = io.link().with(|s| s.push())? {
            io.suspend(reason).await?;
        }
        Ok(())
    }

    /// Sends the open frame and waits until everything queued is acknowledged.
    pub async fn flush<T: Transport, const N: usize, const I: usize>(
        &self,
        io: &Io<'_, T, N, I>,
    ) -> Result<(), Error> {
        while let Some(reason) = io.link().with(|s| s.flush())? {
            io.suspend(reason).await?;
        }
        Ok(())
    }
}
