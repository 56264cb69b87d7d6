// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 KylinSoft Co., Ltd. <https://www.kylinos.cn/>
// See LICENSES for license details.

use alloc::sync::Arc;
use core::{cell::Cell, fmt};

use kerrno::{KError, KResult};
use kfs::{Descriptor, PathResolver, WorkingContext};
use kprocess::{Pid, Process};
use ksignal::ThreadSignals;
use kvfs::{IoContext, Vnode};

use crate::{AT_FDCWD, KernelConfig};

/// The calling thread, as seen by a system call.
///
/// Holds the current process, the thread's signal state and the error of
/// the last failed call made through [`ThreadContext::complete`]. The
/// thread is registered with its process for as long as the context lives.
pub struct ThreadContext {
    config: Arc<KernelConfig>,
    process: Arc<Process>,
    tid: Pid,
    signals: Arc<ThreadSignals>,
    errno: Cell<i32>,
}

impl ThreadContext {
    /// The main thread of `process`; its thread ID is the pid.
    pub fn main(config: Arc<KernelConfig>, process: Arc<Process>) -> Self {
        let tid = process.pid();
        Self::with_tid(config, process, tid)
    }

    /// A new thread in the same process as `self`.
    pub fn spawn(&self) -> Self {
        let tid = self.process.table().alloc_tid();
        Self::with_tid(self.config.clone(), self.process.clone(), tid)
    }

    fn with_tid(config: Arc<KernelConfig>, process: Arc<Process>, tid: Pid) -> Self {
        let signals = ThreadSignals::new();
        process.add_thread(tid, signals.clone());
        trace!("thread {tid} of process {} attached", process.pid());
        Self {
            config,
            process,
            tid,
            signals,
            errno: Cell::new(0),
        }
    }

    pub fn config(&self) -> &Arc<KernelConfig> {
        &self.config
    }

    pub fn process(&self) -> &Arc<Process> {
        &self.process
    }

    pub fn tid(&self) -> Pid {
        self.tid
    }

    pub fn signals(&self) -> &Arc<ThreadSignals> {
        &self.signals
    }

    /// Context for filesystem operations made on behalf of this thread.
    pub fn io_context(&self) -> IoContext {
        self.process.io_context(self.signals.clone())
    }

    /// Path resolver honoring the configured symbolic link budget.
    pub fn resolver(&self) -> PathResolver {
        PathResolver::with_symloop_max(self.config.symloop_max)
    }

    /// The descriptor at `fd` in the process's table.
    pub fn descriptor(&self, fd: i32) -> KResult<Arc<Descriptor>> {
        self.process.fd_table().get(fd)
    }

    pub fn working_context(&self) -> KResult<WorkingContext> {
        self.process.working_context()
    }

    /// The directory a `*at` call resolves relative paths against.
    pub fn dir_vnode(&self, dirfd: i32) -> KResult<Arc<Vnode>> {
        if dirfd == AT_FDCWD {
            return Ok(self.working_context()?.cwd().clone());
        }
        let vnode = self.descriptor(dirfd)?.vnode().clone();
        if !vnode.is_dir() {
            return Err(KError::NotADirectory);
        }
        Ok(vnode)
    }

    /// errno of the last failed call; zero if none failed yet.
    pub fn last_error(&self) -> i32 {
        self.errno.get()
    }

    /// Turns a system call result into its raw return value, recording the
    /// errno of a failure.
    pub fn complete(&self, result: KResult<isize>) -> isize {
        match result {
            Ok(value) => value,
            Err(err) => {
                self.errno.set(err.errno());
                -1
            }
        }
    }
}

impl Drop for ThreadContext {
    fn drop(&mut self) {
        if self.process.exit_thread(self.tid) {
            trace!("last thread of process {} detached", self.process.pid());
        }
    }
}

impl fmt::Debug for ThreadContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ThreadContext")
            .field("pid", &self.process.pid())
            .field("tid", &self.tid)
            .field("errno", &self.errno.get())
            .finish()
    }
}
