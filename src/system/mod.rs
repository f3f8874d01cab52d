//! System utilities for embedded devices.
//!
//! This module provides the execution primitives a callback-driven network
//! stack needs to run blocking-style connection code without threads or an
//! async runtime.
//!
//! # Available Utilities
//!
//! - **[`sub_task`]**: Cooperative tasks that suspend with a code and are resumed with an argument
//! - **[`io_lock`]**: Serialized, re-entrancy free resumption of a connection task
//!
//! # Design Principles
//!
//! - **Embedded-First**: No heap, no executor, no per-task stack
//! - **Interrupt-Safe**: Shared state sits behind `critical-section` mutexes
//! - **Portable**: The host provides the critical-section implementation
//!
//! # Usage
//!
//! ```rust,no_run
//! use core::pin::pin;
//! use picows::system::io_lock::{IoLock, ResumeCheck, TaskChannel, YieldReason};
//! use picows::system::sub_task::SubTask;
//! # use picows::network::error::Error;
//!
//! struct AlwaysReady;
//!
//! impl ResumeCheck for AlwaysReady {
//!     fn should_resume(&self, reason: YieldReason, _error: Option<Error>) -> bool {
//!         reason != YieldReason::End
//!     }
//! }
//!
//! let ready = AlwaysReady;
//! let channel = TaskChannel::new();
//! let yielder = channel.yielder();
//! let body = pin!(async move {
//!     let _ = yielder.suspend(YieldReason::Recv).await;
//! });
//!
//! let lock = IoLock::new(&ready);
//! lock.task_run(SubTask::new(&channel), body).unwrap();
//! assert!(lock.is_finished());
//! ```

#![deny(unsafe_code)]

/// Cooperative sub-tasks.
///
/// Provides the suspend/resume primitive every connection task is built on.
pub mod sub_task;

/// Serialized task resumption for network callbacks.
pub mod io_lock;
