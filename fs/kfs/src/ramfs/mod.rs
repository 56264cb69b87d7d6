// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 KylinSoft Co., Ltd. <https://www.kylinos.cn/>
// See LICENSES for license details.

//! In-memory filesystem.
//!
//! Used as the root filesystem at boot. Directories own their entries;
//! files and symbolic links count the entries that refer to them and free
//! their contents once unlinked and no longer open.

mod dir;
mod file;

use alloc::sync::Arc;
use core::sync::atomic::{AtomicU32, AtomicU64, Ordering};

use kerrno::{KError, KResult};
use ksync::Mutex;
use kvfs::{Inode, IoContext, Stat, TimeSpec};

pub use self::{dir::RamDir, file::*};

/// Block size reported by `stat`.
const BLOCK_SIZE: i64 = 4096;

struct FsInner {
    dev: u64,
    next_ino: AtomicU64,
    clock: fn() -> TimeSpec,
}

impl FsInner {
    fn alloc_ino(&self) -> u64 {
        self.next_ino.fetch_add(1, Ordering::Relaxed)
    }

    fn now(&self) -> TimeSpec {
        (self.clock)()
    }
}

/// Attributes shared by every ramfs node.
struct Meta {
    ino: u64,
    dev: u64,
    mode: AtomicU32,
    owner: Mutex<(u32, u32)>,
    /// Access, modification and change times.
    times: Mutex<[TimeSpec; 3]>,
    nlink: AtomicU32,
}

impl Meta {
    fn new(fs: &FsInner, ino: u64, mode: u32, ctx: &IoContext) -> Self {
        let now = fs.now();
        Self {
            ino,
            dev: fs.dev,
            mode: AtomicU32::new(mode),
            owner: Mutex::new((ctx.uid, ctx.gid)),
            times: Mutex::new([now; 3]),
            nlink: AtomicU32::new(0),
        }
    }

    fn mode(&self) -> u32 {
        self.mode.load(Ordering::Acquire)
    }

    fn nlink(&self) -> u32 {
        self.nlink.load(Ordering::Acquire)
    }

    fn linked(&self) {
        self.nlink.fetch_add(1, Ordering::AcqRel);
    }

    fn unlinked(&self) {
        self.nlink.fetch_sub(1, Ordering::AcqRel);
    }

    fn touch(&self, fs: &FsInner) {
        let now = fs.now();
        let mut times = self.times.lock();
        times[1] = now;
        times[2] = now;
    }

    fn stat(&self, nlink: u32, size: i64) -> Stat {
        let (uid, gid) = *self.owner.lock();
        let [atime, mtime, ctime] = *self.times.lock();
        Stat {
            ino: self.ino,
            dev: self.dev,
            mode: self.mode(),
            nlink,
            uid,
            gid,
            rdev: 0,
            size,
            blksize: BLOCK_SIZE,
            blocks: (size + 511) / 512,
            atime,
            mtime,
            ctime,
        }
    }

    fn chmod(&self, fs: &FsInner, ctx: &IoContext, mode: u32) -> KResult<()> {
        let owner = self.owner.lock().0;
        if ctx.uid != 0 && ctx.uid != owner {
            return Err(KError::OperationNotPermitted);
        }
        let old = self.mode();
        self.mode
            .store((old & !0o7777) | (mode & 0o7777), Ordering::Release);
        self.times.lock()[2] = fs.now();
        Ok(())
    }

    fn chown(&self, fs: &FsInner, ctx: &IoContext, uid: u32, gid: u32) -> KResult<()> {
        if ctx.uid != 0 {
            return Err(KError::OperationNotPermitted);
        }
        *self.owner.lock() = (uid, gid);
        self.times.lock()[2] = fs.now();
        Ok(())
    }

    fn utimens(
        &self,
        fs: &FsInner,
        ctx: &IoContext,
        atime: Option<TimeSpec>,
        mtime: Option<TimeSpec>,
    ) -> KResult<()> {
        let owner = self.owner.lock().0;
        if ctx.uid != 0 && ctx.uid != owner {
            return Err(KError::OperationNotPermitted);
        }
        if atime.is_some_and(|t| !t.is_valid()) || mtime.is_some_and(|t| !t.is_valid()) {
            return Err(KError::InvalidInput);
        }
        let mut times = self.times.lock();
        if let Some(atime) = atime {
            times[0] = atime;
        }
        if let Some(mtime) = mtime {
            times[1] = mtime;
        }
        times[2] = fs.now();
        Ok(())
    }
}

/// An in-memory filesystem instance.
pub struct RamFs {
    root: Arc<RamDir>,
}

impl RamFs {
    /// Creates an empty filesystem on device `dev` whose times are all zero.
    pub fn new(dev: u64) -> Self {
        Self::with_clock(dev, || TimeSpec::ZERO)
    }

    /// Creates an empty filesystem that stamps nodes with `clock`.
    pub fn with_clock(dev: u64, clock: fn() -> TimeSpec) -> Self {
        let fs = Arc::new(FsInner {
            dev,
            next_ino: AtomicU64::new(1),
            clock,
        });
        let root = RamDir::new_root(fs);
        Self { root }
    }

    pub fn root(&self) -> Arc<RamDir> {
        self.root.clone()
    }

    pub fn dev(&self) -> u64 {
        self.root.dev()
    }
}
