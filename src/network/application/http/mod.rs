//! HTTP/1.1 upgrade handling for embedded WebSocket servers.
//!
//! This module provides just enough HTTP to accept a WebSocket connection: a
//! streaming request-head parser that keeps no copy of the request, and the
//! two responses a server sends (the `101` upgrade and a static page for
//! plain requests).
//!
//! # Features
//!
//! - Request heads parsed as they arrive, split anywhere across segments
//! - Only `Upgrade` and `Sec-WebSocket-Key` are retained
//! - Case-insensitive header names and upgrade token
//! - Fixed-size buffers for predictable memory usage
//!
//! # Usage
//!
//! ```rust
//! use picows::network::application::http::{Selection, StreamSelector, accept_key};
//!
//! let accept = accept_key(b"dGhlIHNhbXBsZSBub25jZQ==").unwrap();
//! assert_eq!(&accept, b"s3pPLMBiTxaQ9kYGzzhZRbK+xOo=");
//!
//! const FIELDS: &[&[u8]] = &[b"Sec-WebSocket-Key:", b"Upgrade:"];
//! let mut selector = StreamSelector::new(FIELDS).fold_case();
//! assert_eq!(selector.feed(b"upgr"), (Selection::Pending, 4));
//! assert_eq!(selector.feed(b"ade: websocket"), (Selection::Match(1), 4));
//! ```

pub mod handshake;
pub mod response;
pub mod selector;

pub use handshake::{HandshakeParser, KEY_LEN, Request};
pub use response::{ACCEPT_LEN, accept_key, page_head, switching_protocols};
pub use selector::{Selection, StreamSelector};
