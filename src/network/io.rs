//! Blocking-style I/O for the connection task.
//!
//! Each primitive checks the [`Link`] first and only suspends the task when
//! it cannot make progress, naming the [`YieldReason`] it waits for. The
//! network callbacks wake it through the connection's
//! [`IoLock`](crate::system::io_lock::IoLock).

use super::Transport;
use super::error::Error;
use super::link::Link;
use crate::system::io_lock::{Wake, YieldReason};
use crate::system::sub_task::Yielder;

/// The task's view of its connection.
pub struct Io<'a, T, const N: usize, const I: usize> {
    link: &'a Link<T, N, I>,
    yielder: Yielder<'a, YieldReason, Wake>,
}

impl<T, const N: usize, const I: usize> core::fmt::Debug for Io<'_, T, N, I> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Io").finish_non_exhaustive()
    }
}

impl<'a, T: Transport, const N: usize, const I: usize> Io<'a, T, N, I> {
    pub fn new(link: &'a Link<T, N, I>, yielder: Yielder<'a, YieldReason, Wake>) -> Self {
        Self { link, yielder }
    }

    pub fn link(&self) -> &'a Link<T, N, I> {
        self.link
    }

    /// Suspends until woken for `reason`. A plain wakeup is `Ok(())`; a
    /// connection-fatal error is returned as `Err`.
    ///
    /// Wakeups can be spurious: callers re-check their condition.
    pub async fn wait(&self, reason: YieldReason) -> Result<(), Error> {
        self.link.with(|s| s.arm());
        self.suspend(reason).await
    }

    pub(crate) async fn suspend(&self, reason: YieldReason) -> Result<(), Error> {
        log::trace!("task waits for {:?}", reason);
        self.yielder.suspend(reason).await
    }

    /// Offers the largest contiguous run of inbound bytes to `f` and consumes
    /// as many as `f` reports. Waits while nothing is queued.
    pub async fn peek_with<F>(&self, mut f: F) -> Result<usize, Error>
    where
        F: FnMut(&[u8]) -> usize,
    {
        loop {
            let used = self.link.with(|s| -> Result<Option<usize>, Error> {
                let chunk = s.inbound_chunk()?;
                if chunk.is_empty() {
                    return Ok(None);
                }
                let used = f(chunk).min(chunk.len());
                s.consume(used);
                Ok(Some(used))
            })?;
            match used {
                Some(used) => return Ok(used),
                None => self.suspend(YieldReason::Recv).await?,
            }
        }
    }

    /// Copies whatever is available into `buf`, waiting for at least one byte.
    pub async fn read_some(&self, buf: &mut [u8]) -> Result<usize, Error> {
        if buf.is_empty() {
            return Ok(0);
        }
        self.peek_with(|chunk| {
            let n = chunk.len().min(buf.len());
            buf[..n].copy_from_slice(&chunk[..n]);
            n
        })
        .await
    }

    /// Fills `buf` completely.
    pub async fn read_exact(&self, buf: &mut [u8]) -> Result<(), Error> {
        let mut filled = 0;
        while filled < buf.len() {
            filled += self.read_some(&mut buf[filled..]).await?;
        }
        Ok(())
    }

    /// Discards the next `n` inbound bytes.
    pub async fn skip(&self, mut n: u64) -> Result<(), Error> {
        while n > 0 {
            let used = self
                .peek_with(|chunk| (chunk.len() as u64).min(n) as usize)
                .await?;
            n -= used as u64;
        }
        Ok(())
    }
}
