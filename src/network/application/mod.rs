//! # Application Layer Network Protocols
//!
//! This module contains the application layer (OSI Layer 7) protocols a
//! WebSocket server speaks on an accepted connection. Each protocol works on
//! the task-side [`Io`](crate::network::Io) handle and never blocks the
//! network stack.
//!
//! ## Available Protocols
//!
//! - **[`http`]**: HTTP/1.1 request-head parsing and the upgrade / static page responses
//! - **[`websocket`]**: RFC 6455 framing, the zero-copy send ring and the service interface
//!
//! ## Design Principles
//!
//! All protocol implementations in this module follow these principles:
//!
//! - **Streaming**: Input is consumed as it arrives, split at any byte
//! - **No-std Compatible**: Designed for embedded systems without heap allocation
//! - **Resource Conscious**: Use fixed-size buffers and minimal memory
//! - **Error Handling**: Failures surface as [`Error`](crate::network::error::Error) values

/// HTTP upgrade handshake.
///
/// Parses the request head of an incoming connection and builds the
/// responses a WebSocket server sends.
pub mod http;

/// WebSocket protocol implementation.
///
/// Frame layout, the inbound frame reader, the outbound frame ring and the
/// [`Service`](websocket::Service) interface applications implement.
pub mod websocket;
