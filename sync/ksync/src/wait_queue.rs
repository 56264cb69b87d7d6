// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 KylinSoft Co., Ltd. <https://www.kylinos.cn/>
// See LICENSES for license details.

use event_listener::{Event, Listener};

/// A queue of sleeping threads waiting for some condition to become true.
///
/// Waiters never miss a notification: a listener is registered before the
/// condition is checked for the last time, so a notification that lands
/// between the check and the sleep wakes the listener immediately.
pub struct WaitQueue {
    event: Event,
}

impl WaitQueue {
    /// Creates an empty wait queue.
    pub const fn new() -> Self {
        Self {
            event: Event::new(),
        }
    }

    /// Wakes one sleeping thread.
    pub fn notify_one(&self) -> usize {
        self.event.notify(1)
    }

    /// Wakes every sleeping thread.
    pub fn notify_all(&self) -> usize {
        self.event.notify(usize::MAX)
    }

    /// Blocks until `condition` returns `true`.
    pub fn wait_until<F>(&self, mut condition: F)
    where
        F: FnMut() -> bool,
    {
        self.wait_until_or(&mut condition, || false);
    }

    /// Blocks until `condition` returns `true` or `abort` returns `true`.
    ///
    /// Returns `true` if the condition was met and `false` if the wait was
    /// aborted. The condition is checked before `abort`, so a wait whose
    /// condition is already satisfied always succeeds.
    pub fn wait_until_or<F, A>(&self, mut condition: F, mut abort: A) -> bool
    where
        F: FnMut() -> bool,
        A: FnMut() -> bool,
    {
        loop {
            if condition() {
                return true;
            }
            if abort() {
                return false;
            }
            let listener = self.event.listen();
            if condition() {
                return true;
            }
            if abort() {
                return false;
            }
            listener.wait();
        }
    }
}

impl Default for WaitQueue {
    fn default() -> Self {
        Self::new()
    }
}
