//! Zero-copy outbound frame ring.
//!
//! Frames are assembled in place: each region starts with a [`MAX_HEADER_LEN`]
//! byte reserve, payload is appended behind it, and when the frame is sealed
//! the real header is written right-aligned into the reserve so header and
//! payload leave as one contiguous slice. The transport keeps referencing the
//! slice until it acknowledges it, so a region is only reclaimed once the
//! acknowledgements have covered it. A [`Marker`] per region records how much
//! of it is still unacknowledged.
//!
//! ```text
//!            tail                          head
//!  ... free  | scratch | hdr | payload ... |  free ...
//! ```
//!
//! `head == tail` only when the ring is empty; the writer never lets `head`
//! catch up with `tail` from behind.

use heapless::Deque;

use super::frame::{FrameHeader, Framing, MAX_HEADER_LEN};
use crate::network::Transport;
use crate::network::error::Error;
use crate::system::io_lock::YieldReason;

/// Marker slots per ring.
pub const MARKER_SLOTS: usize = 64;

/// Smallest region worth opening: the header reserve and one payload byte.
const MIN_REGION: usize = MAX_HEADER_LEN + 1;

/// Bookkeeping for one region of the ring.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Marker {
    /// The rest of the ring after this point is unused; the next region starts at 0.
    pub wrap: bool,
    /// Reserve bytes in front of the header that never went out.
    pub scratch_len: u8,
    /// Bytes handed to the transport that are not acknowledged yet.
    pub len: u32,
}

impl Marker {
    const WRAP: Marker = Marker {
        wrap: true,
        scratch_len: 0,
        len: 0,
    };
}

#[derive(Debug, Clone, Copy)]
struct Open {
    start: usize,
    payload_start: usize,
    framing: Framing,
}

#[derive(Debug, Clone, Copy)]
struct Unsent {
    from: usize,
    to: usize,
    more: bool,
}

/// Result of offering bytes to the ring.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Append {
    /// This many bytes were copied in.
    Took(usize),
    /// Nothing was copied; retry once the reason is satisfied.
    Blocked(YieldReason),
}

pub struct FrameRing<const N: usize> {
    buf: [u8; N],
    head: usize,
    tail: usize,
    markers: Deque<Marker, MARKER_SLOTS>,
    open: Option<Open>,
    unsent: Option<Unsent>,
    in_flight: usize,
    max_payload: usize,
    send_threshold: usize,
}

impl<const N: usize> core::fmt::Debug for FrameRing<N> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("FrameRing")
            .field("head", &self.head)
            .field("tail", &self.tail)
            .field("markers", &self.markers.len())
            .field("in_flight", &self.in_flight)
            .finish_non_exhaustive()
    }
}

impl<const N: usize> FrameRing<N> {
    pub fn new(max_payload: u16, send_threshold: u16) -> Self {
        Self {
            buf: [0; N],
            head: 0,
            tail: 0,
            markers: Deque::new(),
            open: None,
            unsent: None,
            in_flight: 0,
            max_payload: max_payload as usize,
            send_threshold: send_threshold as usize,
        }
    }

    /// Forgets every region and starts over empty.
    pub fn clear(&mut self) {
        self.head = 0;
        self.tail = 0;
        self.markers.clear();
        self.open = None;
        self.unsent = None;
        self.in_flight = 0;
    }

    pub fn head(&self) -> usize {
        self.head
    }

    pub fn tail(&self) -> usize {
        self.tail
    }

    /// Regions still awaiting acknowledgement (wrap markers included).
    pub fn markers(&self) -> usize {
        self.markers.len()
    }

    /// Bytes handed to the transport and not yet acknowledged.
    pub fn in_flight(&self) -> usize {
        self.in_flight
    }

    /// Nothing open, nothing waiting to be sent, nothing unacknowledged.
    pub fn is_drained(&self) -> bool {
        self.open.is_none() && self.unsent.is_none() && self.markers.is_empty()
    }

    /// Copies as much of `bytes` as fits into the current frame, opening one
    /// if needed and sealing it once it is full enough.
    pub fn append<X: Transport>(
        &mut self,
        framing: Framing,
        bytes: &[u8],
        transport: &mut X,
    ) -> Result<Append, Error> {
        if bytes.is_empty() {
            return Ok(Append::Took(0));
        }
        if !self.send_unsent(transport)? {
            return Ok(Append::Blocked(YieldReason::SendBuf));
        }
        if self.open.is_some_and(|open| open.framing != framing) {
            self.seal(false);
            if !self.send_unsent(transport)? {
                return Ok(Append::Blocked(YieldReason::SendBuf));
            }
        }
        if self.open.is_none() && !self.try_open(framing) {
            return Ok(Append::Blocked(YieldReason::Ack));
        }
        let Some(open) = self.open else {
            return Ok(Append::Blocked(YieldReason::Ack));
        };

        let filled = self.head - open.payload_start;
        let take = bytes
            .len()
            .min(self.contiguous_room())
            .min(self.max_payload - filled);
        self.buf[self.head..self.head + take].copy_from_slice(&bytes[..take]);
        self.head += take;

        let filled = filled + take;
        if filled >= self.send_threshold
            || filled >= self.max_payload
            || self.contiguous_room() < MIN_REGION
        {
            self.seal(take < bytes.len());
            self.send_unsent(transport)?;
        }
        Ok(Append::Took(take))
    }

    /// Seals the open frame and hands everything sealed to the transport.
    ///
    /// Returns the reason to wait for if the transport cannot take it yet.
    pub fn finish<X: Transport>(
        &mut self,
        transport: &mut X,
    ) -> Result<Option<YieldReason>, Error> {
        if !self.send_unsent(transport)? {
            return Ok(Some(YieldReason::SendBuf));
        }
        self.seal(false);
        if !self.send_unsent(transport)? {
            return Ok(Some(YieldReason::SendBuf));
        }
        Ok(None)
    }

    /// Moves both cursors back to the start once everything is acknowledged.
    pub fn rewind(&mut self) {
        if self.is_drained() {
            self.head = 0;
            self.tail = 0;
        }
    }

    /// Accounts for `len` acknowledged bytes, reclaiming covered regions.
    ///
    /// Returns the part of `len` that matched nothing in flight.
    pub fn on_ack(&mut self, len: usize) -> usize {
        let credited = len.min(self.in_flight);
        if credited < len {
            log::warn!("ack of {} bytes exceeds the {} in flight", len, self.in_flight);
        }
        self.in_flight -= credited;

        let mut left = credited;
        self.skip_wraps();
        while left > 0 {
            let Some(front) = self.markers.front_mut() else {
                break;
            };
            self.tail += front.scratch_len as usize;
            front.scratch_len = 0;
            let n = left.min(front.len as usize);
            front.len -= n as u32;
            self.tail += n;
            left -= n;
            if front.len == 0 {
                self.markers.pop_front();
                self.skip_wraps();
            }
        }
        log::trace!("ack {}: tail {} head {}", credited, self.tail, self.head);
        len - credited + left
    }

    fn contiguous_room(&self) -> usize {
        if self.head >= self.tail {
            N - self.head
        } else {
            self.tail - self.head - 1
        }
    }

    fn is_empty(&self) -> bool {
        self.is_drained() && self.head == self.tail
    }

    fn try_open(&mut self, framing: Framing) -> bool {
        // A region may need a wrap marker in front of its own.
        if self.markers.len() + 2 > MARKER_SLOTS {
            return false;
        }
        if self.is_drained() {
            self.head = 0;
            self.tail = 0;
        }
        if self.head >= self.tail {
            if N - self.head < MIN_REGION {
                if self.tail <= MIN_REGION {
                    return false;
                }
                if self.markers.push_back(Marker::WRAP).is_err() {
                    return false;
                }
                self.head = 0;
            }
        } else if self.tail - self.head - 1 < MIN_REGION {
            return false;
        }

        self.open = Some(Open {
            start: self.head,
            payload_start: self.head + MAX_HEADER_LEN,
            framing,
        });
        self.head += MAX_HEADER_LEN;
        true
    }

    fn seal(&mut self, more: bool) {
        let Some(open) = self.open.take() else {
            return;
        };
        let payload_len = self.head - open.payload_start;
        if payload_len == 0 {
            self.head = open.start;
            self.skip_wraps();
            return;
        }

        let header_len = match open.framing {
            Framing::Raw => 0,
            Framing::WebSocket(opcode) => {
                let header = FrameHeader::server(opcode, payload_len);
                let encoded = open
                    .payload_start
                    .checked_sub(header.encoded_len())
                    .filter(|&at| at >= open.start)
                    .and_then(|at| header.encode(&mut self.buf[at..open.payload_start]));
                debug_assert!(encoded.is_some(), "frame header does not fit its reserve");
                let Some(header_len) = encoded else {
                    log::error!("dropping {} byte frame: header does not fit", payload_len);
                    self.head = open.start;
                    self.skip_wraps();
                    return;
                };
                header_len
            }
        };
        let from = open.payload_start - header_len;
        let marker = Marker {
            wrap: false,
            scratch_len: (from - open.start) as u8,
            len: (self.head - from) as u32,
        };
        if self.markers.push_back(marker).is_err() {
            log::error!("marker slots exhausted while sealing a frame");
        }
        self.unsent = Some(Unsent {
            from,
            to: self.head,
            more,
        });
    }

    fn send_unsent<X: Transport>(&mut self, transport: &mut X) -> Result<bool, Error> {
        let Some(unsent) = self.unsent else {
            return Ok(true);
        };
        let len = unsent.to - unsent.from;
        if transport.send_capacity() < len {
            return Ok(false);
        }
        transport
            .send(&self.buf[unsent.from..unsent.to], unsent.more)
            .map_err(|_| Error::WriteError)?;
        self.unsent = None;
        self.in_flight += len;
        log::trace!("sent {} bytes at {}", len, unsent.from);
        Ok(true)
    }

    fn skip_wraps(&mut self) {
        while self.markers.front().is_some_and(|m| m.wrap) {
            self.markers.pop_front();
            self.tail = 0;
        }
        if self.is_empty() {
            self.head = 0;
            self.tail = 0;
        }
    }
}
