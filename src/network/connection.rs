//! Callback entry points and the per-connection task.
//!
//! The network stack reports events on an accepted connection through the
//! `on_*` methods of a [`Connection`]. Each one updates the shared [`Link`],
//! offers the task a wakeup for every [`YieldReason`] in priority order and
//! finally returns consumed receive credit to the transport. The task itself is
//! the [`session`] future: it answers the HTTP request, and on a WebSocket
//! upgrade runs a [`Service`] until the connection ends.
//!
//! # Example
//!
//! ```rust,no_run
//! use core::pin::pin;
//! use picows::network::application::websocket::Echo;
//! use picows::network::{Config, Connection, Io, Link, Transport, session};
//! use picows::system::io_lock::TaskChannel;
//! use picows::system::sub_task::SubTask;
//!
//! # struct Pcb;
//! # impl Transport for Pcb {
//! #     type Error = ();
//! #     fn send(&mut self, _buf: &[u8], _more: bool) -> Result<(), ()> { Ok(()) }
//! #     fn send_capacity(&self) -> usize { 1024 }
//! #     fn recved(&mut self, _len: usize) {}
//! #     fn close(self) -> Result<(), ()> { Ok(()) }
//! # }
//! const PAGE: &str = "<html><body>hello</body></html>";
//!
//! let config = Config::default();
//! let link: Link<Pcb, 2048, 512> = Link::new(Pcb, &config).unwrap();
//! let channel = TaskChannel::new();
//! let mut echo = Echo;
//! let task = pin!(session(Io::new(&link, channel.yielder()), &config, PAGE, &mut echo));
//!
//! let connection = Connection::new(&link);
//! connection.start(SubTask::new(&channel), task).unwrap();
//!
//! // From the stack's receive callback:
//! connection.on_recv(b"GET / HTTP/1.1\r\n\r\n");
//! ```

use super::Transport;
use super::application::http::{HandshakeParser, accept_key, page_head, switching_protocols};
use super::application::websocket::{FrameWriter, Framing, Service, WebSocket};
use super::config::Config;
use super::error::Error;
use super::io::Io;
use super::link::Link;
use crate::system::io_lock::{IoLock, Phase, ResumeCheck, Task, YieldReason};
use crate::system::sub_task::{TaskBody, TaskError};

/// One accepted connection: its shared state plus the lock owning its task.
pub struct Connection<'a, T, const N: usize, const I: usize> {
    link: &'a Link<T, N, I>,
    lock: IoLock<'a, Link<T, N, I>>,
}

impl<T, const N: usize, const I: usize> core::fmt::Debug for Connection<'_, T, N, I> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Connection")
            .field("lock", &self.lock)
            .finish_non_exhaustive()
    }
}

impl<'a, T: Transport, const N: usize, const I: usize> Connection<'a, T, N, I> {
    pub fn new(link: &'a Link<T, N, I>) -> Self {
        Self {
            link,
            lock: IoLock::new(link),
        }
    }

    pub fn link(&self) -> &'a Link<T, N, I> {
        self.link
    }

    /// Starts the connection task and runs it to its first wait.
    pub fn start(&self, task: Task<'a>, body: TaskBody<'a>) -> Result<(), TaskError> {
        let started = self.lock.task_run(task, body);
        self.link.settle();
        started
    }

    /// Segment received; returns how many bytes were accepted.
    pub fn on_recv(&self, bytes: &[u8]) -> usize {
        let taken = self.link.on_recv(bytes);
        self.wake(None);
        taken
    }

    /// The peer closed the connection.
    pub fn on_closed(&self) {
        self.link.on_closed();
        self.wake(Some(Error::ConnectionClosed));
    }

    /// `len` sent bytes were acknowledged.
    pub fn on_sent(&self, len: usize) {
        self.link.on_sent(len);
        self.wake(None);
    }

    /// Periodic tick from the stack.
    pub fn on_poll(&self) {
        let timeout = self.link.on_poll();
        self.wake(timeout);
    }

    /// The connection failed and the stack already released the transport.
    pub fn on_error(&self, error: Error) {
        self.link.on_error(error);
        self.wake(Some(error));
    }

    pub fn waiting(&self) -> YieldReason {
        self.lock.waiting()
    }

    pub fn phase(&self) -> Phase {
        self.lock.phase()
    }

    /// `true` once the task has run to completion.
    pub fn is_finished(&self) -> bool {
        self.lock.is_finished()
    }

    fn wake(&self, mut error: Option<Error>) {
        for reason in YieldReason::PRIORITY {
            let error = error.take();
            if error.is_none() && !self.link.should_resume(reason, None) {
                continue;
            }
            if let Err(e) = self.lock.notify(reason, error) {
                log::error!("connection task failed: {:?}", e);
            }
        }
        self.link.settle();
    }
}

/// The connection task: answers one HTTP request, upgrading to WebSocket
/// when asked, then closes the transport.
pub async fn session<T, S, const N: usize, const I: usize>(
    io: Io<'_, T, N, I>,
    config: &Config<'_>,
    page: &str,
    service: &mut S,
) where
    T: Transport + Send,
    S: Service,
{
    match serve(&io, config, page, service).await {
        Ok(()) => log::debug!("session complete"),
        Err(Error::ConnectionClosed) => log::debug!("peer closed the session"),
        Err(e) => log::warn!("session ended: {:?}", e),
    }
    if let Err(e) = io.link().close() {
        log::warn!("closing transport failed: {:?}", e);
    }
}

async fn serve<T, S, const N: usize, const I: usize>(
    io: &Io<'_, T, N, I>,
    config: &Config<'_>,
    page: &str,
    service: &mut S,
) -> Result<(), Error>
where
    T: Transport + Send,
    S: Service,
{
    let request = HandshakeParser::new().parse(io).await?;
    let raw = FrameWriter::new(Framing::Raw);

    let Some(key) = request.websocket_key() else {
        let head = page_head(page.len())?;
        raw.write(io, head.as_bytes()).await?;
        raw.write(io, page.as_bytes()).await?;
        return raw.flush(io).await;
    };

    let accept = accept_key(key)?;
    let head = switching_protocols(&accept, config.protocol)?;
    raw.write(io, &head).await?;
    raw.push(io).await?;
    log::debug!("upgraded to websocket");

    let mut ws = WebSocket::new(io, config);
    service.serve(&mut ws).await?;
    ws.flush().await
}
