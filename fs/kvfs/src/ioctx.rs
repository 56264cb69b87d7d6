// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 KylinSoft Co., Ltd. <https://www.kylinos.cn/>
// See LICENSES for license details.

use alloc::sync::Arc;

use kerrno::KError;
use ksignal::ThreadSignals;
use ksync::WaitQueue;

use crate::{OpenFlags, VfsResult};

/// Copies `src` into `dst`, returning `false` if the copy faults.
pub type CopyRoutine = fn(dst: &mut [u8], src: &[u8]) -> bool;

fn kernel_copy(dst: &mut [u8], src: &[u8]) -> bool {
    if dst.len() != src.len() {
        return false;
    }
    dst.copy_from_slice(src);
    true
}

/// Describes the caller of an inode operation.
///
/// Backends move data through [`IoContext::copy_to_dest`] and
/// [`IoContext::copy_from_src`] so that a caller can interpose on transfers
/// to and from its buffers, and block through [`IoContext::sleep_until`] so
/// that signals interrupt the caller.
#[derive(Clone)]
pub struct IoContext {
    pub uid: u32,
    pub gid: u32,
    /// Status flags of the descriptor the call came through.
    pub dflags: OpenFlags,
    signals: Option<Arc<ThreadSignals>>,
    copy_to: CopyRoutine,
    copy_from: CopyRoutine,
}

impl IoContext {
    /// A context for calls made by the kernel itself: root credentials and
    /// uninterruptible sleeps.
    pub fn kernel() -> Self {
        Self {
            uid: 0,
            gid: 0,
            dflags: OpenFlags::empty(),
            signals: None,
            copy_to: kernel_copy,
            copy_from: kernel_copy,
        }
    }

    pub fn new(uid: u32, gid: u32, signals: Arc<ThreadSignals>) -> Self {
        Self {
            uid,
            gid,
            signals: Some(signals),
            ..Self::kernel()
        }
    }

    /// Returns a copy of this context carrying `dflags`.
    pub fn with_dflags(&self, dflags: OpenFlags) -> Self {
        Self {
            dflags,
            ..self.clone()
        }
    }

    pub fn with_copy_routines(mut self, copy_to: CopyRoutine, copy_from: CopyRoutine) -> Self {
        self.copy_to = copy_to;
        self.copy_from = copy_from;
        self
    }

    pub fn signals(&self) -> Option<&Arc<ThreadSignals>> {
        self.signals.as_ref()
    }

    pub fn is_nonblocking(&self) -> bool {
        self.dflags.contains(OpenFlags::NONBLOCK)
    }

    /// Copies data out of the object into the caller's buffer.
    pub fn copy_to_dest(&self, dst: &mut [u8], src: &[u8]) -> VfsResult<()> {
        if (self.copy_to)(dst, src) {
            Ok(())
        } else {
            Err(KError::BadAddress)
        }
    }

    /// Copies data from the caller's buffer into the object.
    pub fn copy_from_src(&self, dst: &mut [u8], src: &[u8]) -> VfsResult<()> {
        if (self.copy_from)(dst, src) {
            Ok(())
        } else {
            Err(KError::BadAddress)
        }
    }

    /// Blocks on `wq` until `condition` holds.
    ///
    /// Fails with [`KError::Interrupted`] if the caller has a signal pending.
    /// Kernel contexts sleep uninterruptibly.
    pub fn sleep_until<F>(&self, wq: &Arc<WaitQueue>, condition: F) -> VfsResult<()>
    where
        F: FnMut() -> bool,
    {
        match &self.signals {
            Some(signals) => signals.sleep_until(wq, condition),
            None => {
                wq.wait_until(condition);
                Ok(())
            }
        }
    }
}
