// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 KylinSoft Co., Ltd. <https://www.kylinos.cn/>
// See LICENSES for license details.

use alloc::sync::Arc;

use kerrno::{KError, KResult};
use ksync::{Mutex, WaitQueue};

use crate::{SignalSet, Signo};

/// Per-thread signal state.
///
/// A thread sleeps interruptibly through [`ThreadSignals::sleep_until`]; while
/// it sleeps, the queue it sleeps on is recorded here so that
/// [`ThreadSignals::send`] can wake it.
#[derive(Default)]
pub struct ThreadSignals {
    pending: Mutex<SignalSet>,
    blocked: Mutex<SignalSet>,
    sleeping: Mutex<Option<Arc<WaitQueue>>>,
}

impl ThreadSignals {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Marks `signo` pending and wakes the thread if it is not blocked.
    ///
    /// Returns `false` if the signal was already pending.
    pub fn send(&self, signo: Signo) -> bool {
        let added = self.pending.lock().add(signo);
        if self.is_deliverable(signo) {
            if let Some(wq) = self.sleeping.lock().as_ref() {
                wq.notify_all();
            }
        }
        added
    }

    fn is_deliverable(&self, signo: Signo) -> bool {
        !signo.is_maskable() || !self.blocked.lock().has(signo)
    }

    /// Returns whether an unblocked signal is pending.
    pub fn has_pending(&self) -> bool {
        let pending = *self.pending.lock();
        !(pending & !self.blocked()).is_empty()
    }

    pub fn pending(&self) -> SignalSet {
        *self.pending.lock()
    }

    /// Removes and returns the lowest pending unblocked signal.
    pub fn dequeue(&self) -> Option<Signo> {
        let allowed = !self.blocked();
        self.pending.lock().dequeue(&allowed)
    }

    pub fn blocked(&self) -> SignalSet {
        *self.blocked.lock()
    }

    /// Replaces the blocked mask and returns the old one.
    ///
    /// `SIGKILL` and `SIGSTOP` are silently kept unblocked.
    pub fn set_blocked(&self, set: SignalSet) -> SignalSet {
        let set = set & !SignalSet::UNMASKABLE;
        core::mem::replace(&mut *self.blocked.lock(), set)
    }

    /// Runs `f` with the blocked mask temporarily replaced by `mask`.
    pub fn with_replaced_blocked<R>(&self, mask: Option<SignalSet>, f: impl FnOnce() -> R) -> R {
        let Some(mask) = mask else {
            return f();
        };
        let old = self.set_blocked(mask);
        let ret = f();
        self.set_blocked(old);
        ret
    }

    /// Sleeps on `wq` until `condition` holds.
    ///
    /// Fails with [`KError::Interrupted`] if an unblocked signal is or becomes
    /// pending before the condition holds.
    pub fn sleep_until<F>(&self, wq: &Arc<WaitQueue>, condition: F) -> KResult<()>
    where
        F: FnMut() -> bool,
    {
        let previous = self.sleeping.lock().replace(wq.clone());
        let woken = wq.wait_until_or(condition, || self.has_pending());
        *self.sleeping.lock() = previous;
        if woken {
            Ok(())
        } else {
            trace!("interruptible sleep aborted by a pending signal");
            Err(KError::Interrupted)
        }
    }
}
