// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 KylinSoft Co., Ltd. <https://www.kylinos.cn/>
// See LICENSES for license details.

//! Resource limit and accounting syscalls.

use kerrno::KResult;
use kprocess::RLimit;

use crate::ThreadContext;

/// Clock ticks per second reported by `times`.
pub const CLK_TCK: u64 = 100;

const NANOS_PER_TICK: u64 = 1_000_000_000 / CLK_TCK;

/// Process times in clock ticks, laid out as `struct tms`.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Tms {
    pub tms_utime: i64,
    pub tms_stime: i64,
    pub tms_cutime: i64,
    pub tms_cstime: i64,
}

fn ticks(nanos: u64) -> i64 {
    (nanos / NANOS_PER_TICK) as i64
}

pub fn sys_getrlimit(ctx: &ThreadContext, resource: u32, rlim: &mut RLimit) -> KResult<isize> {
    debug!("sys_getrlimit <= resource: {resource}");
    *rlim = ctx.process().rlimit(resource)?;
    Ok(0)
}

/// Replaces a resource limit. Raising a hard limit needs privilege.
pub fn sys_setrlimit(ctx: &ThreadContext, resource: u32, rlim: &RLimit) -> KResult<isize> {
    debug!("sys_setrlimit <= resource: {resource}, {rlim:?}");
    ctx.process().set_rlimit(resource, *rlim)?;
    Ok(0)
}

/// Reports the CPU time of the caller and of its reaped children.
pub fn sys_times(ctx: &ThreadContext, tms: &mut Tms) -> KResult<isize> {
    let clocks = ctx.process().clocks();
    *tms = Tms {
        tms_utime: ticks(clocks.user),
        tms_stime: ticks(clocks.system),
        tms_cutime: ticks(clocks.children_user),
        tms_cstime: ticks(clocks.children_system),
    };
    Ok(0)
}
