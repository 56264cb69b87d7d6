// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 KylinSoft Co., Ltd. <https://www.kylinos.cn/>
// See LICENSES for license details.

use kerrno::{KError, KResult};
use linux_raw_sys::general::{RLIM_NLIMITS, RLIMIT_NOFILE, RLIMIT_STACK};

/// The "no limit" value of a resource limit.
pub const RLIM_INFINITY: u64 = u64::MAX;

/// Default soft limit on open descriptors.
const DEFAULT_NOFILE: u64 = 1024;

/// Default soft limit on the stack size.
const DEFAULT_STACK: u64 = 8 * 1024 * 1024;

/// User and group identities of a process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Credentials {
    /// Real user ID.
    pub uid: u32,
    /// Real group ID.
    pub gid: u32,
    /// Effective user ID, used for permission checks.
    pub euid: u32,
    /// Effective group ID, used for permission checks.
    pub egid: u32,
}

impl Credentials {
    /// Credentials with all four IDs set to `uid`/`gid`.
    pub const fn new(uid: u32, gid: u32) -> Self {
        Self {
            uid,
            gid,
            euid: uid,
            egid: gid,
        }
    }

    /// Whether these credentials carry superuser rights.
    pub fn is_privileged(&self) -> bool {
        self.euid == 0
    }
}

/// A soft and hard limit pair, as in `struct rlimit`.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RLimit {
    /// Soft limit.
    pub cur: u64,
    /// Hard limit; ceiling for the soft limit.
    pub max: u64,
}

impl RLimit {
    /// A limit with equal soft and hard values.
    pub const fn new(cur: u64, max: u64) -> Self {
        Self { cur, max }
    }
}

impl Default for RLimit {
    fn default() -> Self {
        Self::new(RLIM_INFINITY, RLIM_INFINITY)
    }
}

#[derive(Clone)]
pub(crate) struct ResourceLimits([RLimit; RLIM_NLIMITS as usize]);

impl Default for ResourceLimits {
    fn default() -> Self {
        let mut limits = [RLimit::default(); RLIM_NLIMITS as usize];
        limits[RLIMIT_NOFILE as usize] = RLimit::new(DEFAULT_NOFILE, DEFAULT_NOFILE * 4);
        limits[RLIMIT_STACK as usize].cur = DEFAULT_STACK;
        Self(limits)
    }
}

impl ResourceLimits {
    fn index(resource: u32) -> KResult<usize> {
        if resource < RLIM_NLIMITS {
            Ok(resource as usize)
        } else {
            Err(KError::InvalidInput)
        }
    }

    pub(crate) fn get(&self, resource: u32) -> KResult<RLimit> {
        Ok(self.0[Self::index(resource)?])
    }

    /// Replaces a limit. Only a privileged caller may raise a hard limit.
    pub(crate) fn set(&mut self, resource: u32, new: RLimit, privileged: bool) -> KResult<()> {
        let index = Self::index(resource)?;
        if new.cur > new.max {
            return Err(KError::InvalidInput);
        }
        if new.max > self.0[index].max && !privileged {
            return Err(KError::OperationNotPermitted);
        }
        self.0[index] = new;
        Ok(())
    }
}

/// CPU time accounting, in nanoseconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ClockTimes {
    /// Time spent executing in user mode.
    pub user: u64,
    /// Time spent executing in the kernel on behalf of the process.
    pub system: u64,
    /// User time of reaped children, including their own reaped children.
    pub children_user: u64,
    /// System time of reaped children, including their own reaped children.
    pub children_system: u64,
}

impl ClockTimes {
    /// The total a reaping parent adds to its children's times.
    pub(crate) fn reaped_total(&self) -> (u64, u64) {
        (
            self.user.saturating_add(self.children_user),
            self.system.saturating_add(self.children_system),
        )
    }
}
