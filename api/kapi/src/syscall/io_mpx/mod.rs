//! I/O multiplexing syscalls.
//!
//! This module implements synchronous I/O multiplexing:
//! - ppoll: wait for readiness on a set of descriptors, optionally with a
//!   temporary signal mask
//!
//! Waits are built from [`kpoll`] nodes registered on the polled objects'
//! channels, all sharing one waiter.

mod poll;

pub use self::poll::*;
