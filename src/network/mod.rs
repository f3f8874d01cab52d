//! A network abstraction layer for embedded systems
//!
//! This module sits between a callback-driven TCP stack and blocking-style
//! connection code. The stack owns the socket and calls into a [`Connection`]
//! whenever something happens; the connection's task reads and writes through
//! an [`Io`] handle and suspends whenever it has to wait.
//!
//! # Layers
//!
//! - **[`Transport`]**: what the library needs from the stack's socket handle
//! - **[`Link`]**: connection state shared between callbacks and the task
//! - **[`Io`]**: the task's blocking-style view of a [`Link`]
//! - **[`Connection`]**: callback entry points plus the lock owning the task
//! - **[`application`]**: the HTTP upgrade handshake and the WebSocket protocol
//!

#![allow(missing_docs)]
#![allow(async_fn_in_trait)]
#![deny(unsafe_code)]

/// Common error types for network operations
pub mod error;

/// Runtime configuration of a server connection
pub mod config;

/// Shared per-connection state
pub mod link;

/// Task-side I/O primitives
pub mod io;

/// Callback entry points and the connection task
pub mod connection;

/// Application-layer protocols
pub mod application;

pub use config::Config;
pub use connection::{Connection, session};
pub use io::Io;
pub use link::Link;

/// Re-exports of common traits
pub mod prelude {
    pub use super::Transport;
    pub use super::application::websocket::Service;
    pub use crate::system::io_lock::ResumeCheck;
}

/// An accepted connection handle owned by the network stack.
///
/// Implementations wrap the stack's socket handle. None of the methods may
/// block: they are called from inside the stack's own callbacks.
pub trait Transport {
    /// Associated error type
    type Error: core::fmt::Debug;

    /// Hands `buf` to the stack for transmission. The bytes must stay valid
    /// until acknowledged; `more` hints that further data follows at once.
    fn send(&mut self, buf: &[u8], more: bool) -> Result<(), Self::Error>;

    /// Number of bytes [`send`](Transport::send) currently accepts.
    fn send_capacity(&self) -> usize;

    /// Reports `len` received bytes as consumed, reopening the receive window.
    fn recved(&mut self, len: usize);

    /// Closes the connection and releases the handle.
    fn close(self) -> Result<(), Self::Error>;
}
