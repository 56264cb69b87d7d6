// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 KylinSoft Co., Ltd. <https://www.kylinos.cn/>
// See LICENSES for license details.

//! Readiness notification for blocking I/O multiplexing.
//!
//! Objects that can become ready (pipes, sockets, terminals) own a
//! [`PollChannel`]. A thread interested in readiness creates one
//! [`PollNode`] per object, all sharing one [`PollWaiter`], and registers
//! each node on the object's channel. [`PollChannel::signal`] records the
//! matching events on every registered node and wakes its waiter once.
#![cfg_attr(not(test), no_std)]

#[macro_use]
extern crate log;
extern crate alloc;

mod channel;
mod node;
mod tests;

use bitflags::bitflags;
use linux_raw_sys::general::{
    POLLERR, POLLHUP, POLLIN, POLLNVAL, POLLOUT, POLLPRI, POLLRDBAND, POLLRDHUP, POLLRDNORM,
    POLLWRBAND, POLLWRNORM,
};

pub use channel::PollChannel;
pub use node::{PollNode, PollWaiter};

bitflags! {
    /// I/O readiness events, bit-compatible with `struct pollfd`.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct IoEvents: u32 {
        /// Data other than high-priority data may be read without blocking.
        const IN     = POLLIN;
        /// High-priority data may be read without blocking.
        const PRI    = POLLPRI;
        /// Normal data may be written without blocking.
        const OUT    = POLLOUT;
        /// An error has occurred.
        const ERR    = POLLERR;
        /// The peer hung up or the object went away.
        const HUP    = POLLHUP;
        /// The descriptor is invalid.
        const NVAL   = POLLNVAL;
        const RDNORM = POLLRDNORM;
        const RDBAND = POLLRDBAND;
        const WRNORM = POLLWRNORM;
        const WRBAND = POLLWRBAND;
        const RDHUP  = POLLRDHUP;

        /// Events that are always reported, whether requested or not.
        const ALWAYS_POLL = Self::ERR.bits() | Self::HUP.bits();
    }
}

impl IoEvents {
    /// Converts the `short` mask carried by `struct pollfd`.
    pub fn from_pollfd(events: i16) -> Self {
        Self::from_bits_truncate(events as u16 as u32)
    }

    /// Converts back to the `short` mask carried by `struct pollfd`.
    pub fn to_pollfd(self) -> i16 {
        self.bits() as u16 as i16
    }
}
