// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 KylinSoft Co., Ltd. <https://www.kylinos.cn/>
// See LICENSES for license details.

use alloc::{sync::Arc, vec::Vec};

use kerrno::{KError, KResult};
use kfs::Descriptor;
use kpoll::{IoEvents, PollNode, PollWaiter};
use ksignal::SignalSet;
use kvfs::{IoContext, TimeSpec};
use linux_raw_sys::general::RLIMIT_NOFILE;

use crate::ThreadContext;

/// One entry of a `ppoll` set, laid out as `struct pollfd`.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PollFd {
    pub fd: i32,
    pub events: i16,
    pub revents: i16,
}

impl PollFd {
    pub const fn new(fd: i32, events: i16) -> Self {
        Self {
            fd,
            events,
            revents: 0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PollTimeout {
    Forever,
    Immediate,
}

impl PollTimeout {
    /// Only "no timeout" and a zero timeout are supported; there is no timer
    /// to end a bounded wait.
    fn parse(timeout: Option<&TimeSpec>) -> KResult<Self> {
        let Some(ts) = timeout else {
            return Ok(Self::Forever);
        };
        if !ts.is_valid() {
            return Err(KError::InvalidInput);
        }
        if ts.tv_sec < 0 {
            Ok(Self::Forever)
        } else if *ts == TimeSpec::ZERO {
            Ok(Self::Immediate)
        } else {
            Err(KError::NoSys)
        }
    }
}

/// A descriptor being polled and the node registered with it.
///
/// The descriptor must outlive the registration: if it is the last
/// reference, dropping it tears down the poll channel, which waits for the
/// node to be canceled.
struct Polled {
    _desc: Arc<Descriptor>,
    node: Arc<PollNode>,
}

/// Registers interest in `entry` with the descriptor it names.
///
/// Returns the registration and whether the descriptor was already ready.
/// On error the node is canceled before the descriptor is released.
fn register(
    ctx: &ThreadContext,
    io: &IoContext,
    entry: &PollFd,
    waiter: &Arc<PollWaiter>,
) -> KResult<(Polled, bool)> {
    let desc = ctx.descriptor(entry.fd)?;
    let node = PollNode::new(IoEvents::from_pollfd(entry.events), waiter.clone());
    let ready = match desc.poll(io, &node) {
        Ok(()) => true,
        Err(KError::WouldBlock) => false,
        Err(err) => {
            node.cancel();
            return Err(err);
        }
    };
    Ok((Polled { _desc: desc, node }, ready))
}

/// Waits until one of `fds` is ready.
///
/// A negative descriptor is reported as `POLLNVAL`. With `sigmask` the
/// blocked signal set is replaced for the duration of the wait. Returns the
/// number of entries with a non-zero `revents`; `fds` is only written back
/// on success.
pub fn sys_ppoll(
    ctx: &ThreadContext,
    fds: &mut [PollFd],
    timeout: Option<&TimeSpec>,
    sigmask: Option<&SignalSet>,
) -> KResult<isize> {
    debug!(
        "sys_ppoll <= nfds: {}, timeout: {timeout:?}, sigmask: {sigmask:?}",
        fds.len()
    );
    let timeout = PollTimeout::parse(timeout)?;
    if fds.len() as u64 > ctx.process().rlimit(RLIMIT_NOFILE)?.cur {
        return Err(KError::InvalidInput);
    }

    let mut entries = Vec::new();
    entries
        .try_reserve_exact(fds.len())
        .map_err(|_| KError::NoMemory)?;
    entries.extend_from_slice(fds);
    let mut polled: Vec<Option<Polled>> = Vec::new();
    polled
        .try_reserve_exact(fds.len())
        .map_err(|_| KError::NoMemory)?;

    let io = ctx.io_context();
    let waiter = PollWaiter::new();
    let mut self_woken = false;
    let mut result = Ok(());
    for entry in entries.iter_mut() {
        entry.revents = 0;
        if entry.fd < 0 {
            entry.revents = IoEvents::NVAL.to_pollfd();
            polled.push(None);
            continue;
        }
        match register(ctx, &io, entry, &waiter) {
            Ok((entry_polled, ready)) => {
                self_woken |= ready;
                polled.push(Some(entry_polled));
            }
            Err(err) => {
                result = Err(err);
                break;
            }
        }
    }

    if result.is_ok() && !self_woken && timeout == PollTimeout::Forever {
        let signals = ctx.signals();
        result = signals.with_replaced_blocked(sigmask.copied(), || waiter.wait(signals));
    }

    let mut ready = 0;
    for (entry, slot) in entries.iter_mut().zip(&polled) {
        if let Some(Polled { node, .. }) = slot {
            node.cancel();
            entry.revents = node.revents().to_pollfd();
        }
        if entry.revents != 0 {
            ready += 1;
        }
    }
    // Every node is canceled; descriptors closed meanwhile may go now.
    drop(polled);
    result?;

    fds.copy_from_slice(&entries);
    trace!("sys_ppoll => {ready}");
    Ok(ready)
}
