//! Connection state shared by the network callbacks and the connection task.
//!
//! Every access goes through [`Link::with`], which holds a critical section for
//! the duration of a closure. Nothing borrowed from a [`Link`] survives a
//! suspension of the task.

use core::cell::RefCell;

use critical_section::Mutex;
use heapless::Deque;

use super::Transport;
use super::application::websocket::ring::{Append, FrameRing};
use super::application::websocket::frame::{Framing, MAX_HEADER_LEN};
use super::config::Config;
use super::error::Error;
use crate::system::io_lock::{ResumeCheck, YieldReason};

/// Everything a connection owns, guarded by the [`Link`].
pub struct LinkState<T, const N: usize, const I: usize> {
    transport: Option<T>,
    inbound: Deque<u8, I>,
    ring: FrameRing<N>,
    /// Inbound bytes consumed but not yet reported to the transport.
    credit: usize,
    error: Option<Error>,
    acks: u32,
    armed_acks: u32,
    idle_polls: u16,
    idle_limit: Option<u16>,
}

impl<T: Transport, const N: usize, const I: usize> LinkState<T, N, I> {
    pub fn ring(&self) -> &FrameRing<N> {
        &self.ring
    }

    pub fn inbound_len(&self) -> usize {
        self.inbound.len()
    }

    /// Largest contiguous run of queued inbound bytes, or the sticky error once
    /// the queue is empty.
    pub(crate) fn inbound_chunk(&self) -> Result<&[u8], Error> {
        let (chunk, _) = self.inbound.as_slices();
        match (chunk.is_empty(), self.error) {
            (true, Some(error)) => Err(error),
            _ => Ok(chunk),
        }
    }

    pub(crate) fn consume(&mut self, n: usize) {
        for _ in 0..n {
            if self.inbound.pop_front().is_none() {
                break;
            }
            self.credit += 1;
        }
    }

    /// Records the acknowledgement count a `SendBuf` or `Ack` wait starts from.
    pub(crate) fn arm(&mut self) {
        self.armed_acks = self.acks;
    }

    pub(crate) fn append(&mut self, framing: Framing, bytes: &[u8]) -> Result<Append, Error> {
        self.check()?;
        let transport = self.transport.as_mut().ok_or(Error::NotOpen)?;
        let step = self.ring.append(framing, bytes, transport)?;
        if let Append::Blocked(_) = step {
            self.arm();
        }
        Ok(step)
    }

    /// Seals and sends what is queued; `Some` carries the reason to wait for.
    pub(crate) fn push(&mut self) -> Result<Option<YieldReason>, Error> {
        self.check()?;
        let transport = self.transport.as_mut().ok_or(Error::NotOpen)?;
        let wait = self.ring.finish(transport)?;
        if wait.is_some() {
            self.arm();
        }
        Ok(wait)
    }

    /// Like [`push`](Self::push), but also waits for every frame to be acknowledged.
    pub(crate) fn flush(&mut self) -> Result<Option<YieldReason>, Error> {
        if let Some(reason) = self.push()? {
            return Ok(Some(reason));
        }
        if self.ring.is_drained() {
            self.ring.rewind();
            return Ok(None);
        }
        Ok(Some(YieldReason::Flush))
    }

    fn check(&self) -> Result<(), Error> {
        match self.error {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }

    fn ready(&self, reason: YieldReason) -> bool {
        if self.error.is_some() {
            return reason != YieldReason::End;
        }
        match reason {
            YieldReason::Recv => !self.inbound.is_empty(),
            YieldReason::Flush => self.ring.is_drained(),
            YieldReason::SendBuf | YieldReason::Ack => self.acks != self.armed_acks,
            YieldReason::End => false,
        }
    }
}

/// Shared handle to one connection's state.
pub struct Link<T, const N: usize, const I: usize> {
    state: Mutex<RefCell<LinkState<T, N, I>>>,
}

impl<T, const N: usize, const I: usize> core::fmt::Debug for Link<T, N, I> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Link").finish_non_exhaustive()
    }
}

impl<T: Transport, const N: usize, const I: usize> Link<T, N, I> {
    pub fn new(transport: T, config: &Config<'_>) -> Result<Self, Error> {
        config.validate()?;
        if N < 2 * (MAX_HEADER_LEN + 1) || I == 0 {
            return Err(Error::InvalidConfig);
        }
        Ok(Self {
            state: Mutex::new(RefCell::new(LinkState {
                transport: Some(transport),
                inbound: Deque::new(),
                ring: FrameRing::new(config.max_payload, config.send_threshold),
                credit: 0,
                error: None,
                acks: 0,
                armed_acks: 0,
                idle_polls: 0,
                idle_limit: config.idle_timeout_polls,
            })),
        })
    }

    /// Runs `f` with exclusive access to the state.
    pub fn with<R>(&self, f: impl FnOnce(&mut LinkState<T, N, I>) -> R) -> R {
        critical_section::with(|cs| f(&mut self.state.borrow_ref_mut(cs)))
    }

    /// Runs `f` on the transport, if it has not been released yet.
    pub fn with_transport<R>(&self, f: impl FnOnce(&mut T) -> R) -> Option<R> {
        self.with(|s| s.transport.as_mut().map(f))
    }

    /// Queues received bytes; returns how many fit.
    ///
    /// Bytes that do not fit stay with the transport and must be offered again.
    pub fn on_recv(&self, bytes: &[u8]) -> usize {
        self.with(|s| {
            s.idle_polls = 0;
            let mut taken = 0;
            for &byte in bytes {
                if s.inbound.push_back(byte).is_err() {
                    break;
                }
                taken += 1;
            }
            log::trace!("queued {} of {} received bytes", taken, bytes.len());
            taken
        })
    }

    /// The peer closed its side.
    pub fn on_closed(&self) {
        self.with(|s| {
            s.error.get_or_insert(Error::ConnectionClosed);
        });
    }

    /// The transport acknowledged `len` sent bytes.
    pub fn on_sent(&self, len: usize) {
        self.with(|s| {
            s.idle_polls = 0;
            s.acks = s.acks.wrapping_add(1);
            let excess = s.ring.on_ack(len);
            if excess > 0 {
                log::warn!("{} acknowledged bytes matched no frame", excess);
            }
        });
    }

    /// The transport failed; the stack has already released the handle.
    pub fn on_error(&self, error: Error) {
        self.with(|s| {
            s.error.get_or_insert(error);
            s.transport = None;
        });
    }

    /// Periodic tick; returns the timeout error once the connection has been
    /// idle for the configured number of polls.
    pub fn on_poll(&self) -> Option<Error> {
        self.with(|s| {
            let limit = s.idle_limit?;
            s.idle_polls = s.idle_polls.saturating_add(1);
            if s.idle_polls < limit {
                return None;
            }
            log::debug!("connection idle for {} polls", s.idle_polls);
            Some(*s.error.get_or_insert(Error::Timeout))
        })
    }

    /// Reports consumed inbound bytes to the transport in one batch.
    pub fn settle(&self) {
        self.with(|s| {
            if s.credit == 0 {
                return;
            }
            if let Some(transport) = s.transport.as_mut() {
                transport.recved(s.credit);
            }
            s.credit = 0;
        });
    }

    /// Closes and releases the transport; later calls do nothing.
    pub fn close(&self) -> Result<(), Error> {
        self.settle();
        let transport = self.with(|s| {
            s.error.get_or_insert(Error::NotOpen);
            s.transport.take()
        });
        match transport {
            Some(transport) => transport.close().map_err(|_| Error::WriteError),
            None => Ok(()),
        }
    }

    /// Re-arms the link for a new connection on `transport`.
    pub fn reset(&self, transport: T) {
        self.with(|s| {
            s.transport = Some(transport);
            s.inbound.clear();
            s.ring.clear();
            s.credit = 0;
            s.error = None;
            s.acks = 0;
            s.armed_acks = 0;
            s.idle_polls = 0;
        });
    }

    pub fn error(&self) -> Option<Error> {
        self.with(|s| s.error)
    }

    pub fn is_open(&self) -> bool {
        self.with(|s| s.transport.is_some())
    }
}

impl<T: Transport, const N: usize, const I: usize> ResumeCheck for Link<T, N, I> {
    fn should_resume(&self, reason: YieldReason, error: Option<Error>) -> bool {
        if reason == YieldReason::End {
            return false;
        }
        error.is_some() || self.with(|s| s.ready(reason))
    }
}
