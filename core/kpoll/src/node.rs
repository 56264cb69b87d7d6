// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 KylinSoft Co., Ltd. <https://www.kylinos.cn/>
// See LICENSES for license details.

use alloc::{sync::Arc, vec::Vec};
use core::sync::atomic::{AtomicU32, AtomicUsize, Ordering};

use kerrno::KResult;
use ksignal::ThreadSignals;
use ksync::{Mutex, WaitQueue};

use crate::{IoEvents, channel::ChannelShared};

/// The wake primitive shared by every node of one logical wait.
///
/// `woken` latches the first wakeup, so a waiter is woken once per
/// idle→ready transition no matter how many channels contribute to it.
pub struct PollWaiter {
    wake_mutex: Mutex<bool>,
    wake_cond: Arc<WaitQueue>,
    wakeups: AtomicUsize,
}

impl PollWaiter {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            wake_mutex: Mutex::new(false),
            wake_cond: Arc::new(WaitQueue::new()),
            wakeups: AtomicUsize::new(0),
        })
    }

    pub fn is_woken(&self) -> bool {
        *self.wake_mutex.lock()
    }

    /// Number of times the waiter went from idle to woken.
    pub fn wakeups(&self) -> usize {
        self.wakeups.load(Ordering::Acquire)
    }

    pub(crate) fn wake(&self) {
        let mut woken = self.wake_mutex.lock();
        if !*woken {
            *woken = true;
            self.wakeups.fetch_add(1, Ordering::AcqRel);
            self.wake_cond.notify_all();
        }
    }

    /// Clears the latch so the waiter can be woken again.
    pub fn reset(&self) {
        *self.wake_mutex.lock() = false;
    }

    /// Sleeps until the waiter is woken or a signal interrupts the sleep.
    pub fn wait(&self, signals: &ThreadSignals) -> KResult<()> {
        signals.sleep_until(&self.wake_cond, || *self.wake_mutex.lock())
    }

    /// Sleeps until the waiter is woken, ignoring signals.
    pub fn wait_uninterruptible(&self) {
        self.wake_cond.wait_until(|| *self.wake_mutex.lock());
    }
}

/// The part of a node that signals are delivered to.
///
/// A master node and all of its slaves share one target.
pub(crate) struct PollTarget {
    events: IoEvents,
    revents: AtomicU32,
    waiter: Arc<PollWaiter>,
}

impl PollTarget {
    /// Records the subset of `events` the target asked for and wakes the
    /// waiter if the target just became ready.
    pub(crate) fn deliver(&self, events: IoEvents) {
        let matched = events & self.events;
        if matched.is_empty() {
            return;
        }
        let old = self.revents.fetch_or(matched.bits(), Ordering::AcqRel);
        if old == 0 {
            self.waiter.wake();
        }
    }
}

pub(crate) struct Registration {
    pub(crate) channel: Arc<ChannelShared>,
    pub(crate) key: usize,
}

/// One waiter's registration of interest on one [`PollChannel`].
///
/// [`PollChannel`]: crate::PollChannel
pub struct PollNode {
    pub(crate) target: Arc<PollTarget>,
    pub(crate) registration: Mutex<Option<Registration>>,
    slaves: Mutex<Vec<Arc<PollNode>>>,
}

impl PollNode {
    /// Creates a node asking for `events`; errors and hangups are always
    /// included.
    pub fn new(events: IoEvents, waiter: Arc<PollWaiter>) -> Arc<Self> {
        let target = Arc::new(PollTarget {
            events: events | IoEvents::ALWAYS_POLL,
            revents: AtomicU32::new(0),
            waiter,
        });
        Self::with_target(target)
    }

    fn with_target(target: Arc<PollTarget>) -> Arc<Self> {
        Arc::new(Self {
            target,
            registration: Mutex::new(None),
            slaves: Mutex::new(Vec::new()),
        })
    }

    /// The requested event mask.
    pub fn events(&self) -> IoEvents {
        self.target.events
    }

    /// The events observed so far.
    pub fn revents(&self) -> IoEvents {
        IoEvents::from_bits_retain(self.target.revents.load(Ordering::Acquire))
    }

    pub fn waiter(&self) -> &Arc<PollWaiter> {
        &self.target.waiter
    }

    /// Records readiness found synchronously by the polled object, without
    /// waking the waiter.
    pub fn report_ready(&self, events: IoEvents) {
        let matched = events & self.target.events;
        self.target
            .revents
            .fetch_or(matched.bits(), Ordering::AcqRel);
    }

    pub fn is_registered(&self) -> bool {
        self.registration.lock().is_some()
    }

    /// Creates a node that extends this node's wait to another channel.
    ///
    /// The slave delivers into this node's mask and revents, and is canceled
    /// together with it. Returns `None` if memory for it cannot be reserved.
    pub fn create_slave(&self) -> Option<Arc<PollNode>> {
        let mut slaves = self.slaves.lock();
        slaves.try_reserve(1).ok()?;
        let slave = Self::with_target(self.target.clone());
        slaves.push(slave.clone());
        Some(slave)
    }

    /// Unregisters this node and all of its slaves. Idempotent.
    pub fn cancel(&self) {
        let registration = self.registration.lock().take();
        if let Some(Registration { channel, key }) = registration {
            channel.remove(key);
        }
        let slaves = core::mem::take(&mut *self.slaves.lock());
        for slave in slaves {
            slave.cancel();
        }
    }
}

impl Drop for PollNode {
    fn drop(&mut self) {
        self.cancel();
    }
}
