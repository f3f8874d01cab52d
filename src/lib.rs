//! # picows - WebSocket server core for embedded TCP stacks
//!
//! A small Rust library that lets a callback-driven TCP/IP stack (lwIP in raw
//! mode, for example) serve WebSocket connections with blocking-style
//! per-connection code, without threads, without a heap and without an async
//! runtime. This library is designed for embedded systems and supports
//! `no_std` environments.
//!
//! ## Features
//!
//! ### Execution Model
//! - Cooperative sub-tasks that suspend with a reason and are resumed by callbacks
//! - Serialized, re-entrancy free resumption through an I/O lock
//!
//! ### Network Protocols
//! - **HTTP**: Streaming upgrade handshake with a static page fallback
//! - **WebSocket**: RFC 6455 framing with a zero-copy, ack-tracked send ring
//!
//! ## Usage
//!
//! Add this to your `Cargo.toml`:
//!
//! ```toml
//! [dependencies]
//! picows = "0.1.0"
//! ```
//!
//! ### Wiring a connection
//!
//! ```rust,no_run
//! use core::pin::pin;
//! use picows::network::application::websocket::Echo;
//! use picows::network::{Config, Connection, Io, Link, session};
//! use picows::system::io_lock::TaskChannel;
//! use picows::system::sub_task::SubTask;
//! # use picows::network::Transport;
//! # struct Pcb;
//! # impl Transport for Pcb {
//! #     type Error = ();
//! #     fn send(&mut self, _buf: &[u8], _more: bool) -> Result<(), ()> { Ok(()) }
//! #     fn send_capacity(&self) -> usize { 1024 }
//! #     fn recved(&mut self, _len: usize) {}
//! #     fn close(self) -> Result<(), ()> { Ok(()) }
//! # }
//!
//! let config = Config::default();
//! let link: Link<Pcb, 4096, 1024> = Link::new(Pcb, &config).unwrap();
//! let channel = TaskChannel::new();
//! let mut echo = Echo;
//! let task = pin!(session(Io::new(&link, channel.yielder()), &config, "<h1>hi</h1>", &mut echo));
//!
//! let connection = Connection::new(&link);
//! connection.start(SubTask::new(&channel), task).unwrap();
//!
//! // Forward the stack's callbacks:
//! // recv  -> connection.on_recv(segment) / connection.on_closed()
//! // sent  -> connection.on_sent(len)
//! // poll  -> connection.on_poll()
//! // error -> connection.on_error(Error::ConnectionReset)
//! ```
//!
//! ## Platform Support
//!
//! This library is designed to work on:
//! - Embedded microcontrollers (ARM Cortex-M, RISC-V, etc.)
//! - Linux-based devices for testing
//! - Any platform with a `critical-section` implementation
//!
//! ## Optional Features
//!
//! - `std`: Enable standard library support (default: disabled)
//! - `defmt`: Enable defmt formatting of error types for embedded debugging

#![cfg_attr(not(any(test, feature = "std")), no_std)]
#![deny(missing_docs)]
#![warn(missing_debug_implementations)]

/// Network abstraction layer: transport boundary, shared connection state and protocols.
///
/// This module contains the callback entry points a TCP stack drives, the
/// task-side I/O handle, and the HTTP and WebSocket protocol implementations.
pub mod network;

/// System utilities for embedded devices.
///
/// Contains the cooperative task primitive and the I/O lock that serializes
/// its resumption.
pub mod system;
