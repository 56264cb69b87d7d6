// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 KylinSoft Co., Ltd. <https://www.kylinos.cn/>
// See LICENSES for license details.

use kerrno::KResult;

use crate::ThreadContext;

pub fn sys_getpid(ctx: &ThreadContext) -> KResult<isize> {
    Ok(ctx.process().pid() as _)
}

/// The parent's pid, or 0 for a process without one.
pub fn sys_getppid(ctx: &ThreadContext) -> KResult<isize> {
    Ok(ctx.process().ppid() as _)
}

pub fn sys_gettid(ctx: &ThreadContext) -> KResult<isize> {
    Ok(ctx.tid() as _)
}
