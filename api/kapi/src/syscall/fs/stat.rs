// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 KylinSoft Co., Ltd. <https://www.kylinos.cn/>
// See LICENSES for license details.

//! File metadata syscalls.

use kerrno::KResult;
use kvfs::Stat;

use crate::ThreadContext;

/// Get the attributes of the file open at `fd`.
pub fn sys_fstat(ctx: &ThreadContext, fd: i32, statbuf: &mut Stat) -> KResult<isize> {
    debug!("sys_fstat <= fd: {fd}");
    *statbuf = ctx.descriptor(fd)?.stat(&ctx.io_context())?;
    Ok(0)
}

/// Returns 1 if `fd` refers to a terminal, and fails with `ENOTTY`
/// otherwise.
pub fn sys_isatty(ctx: &ThreadContext, fd: i32) -> KResult<isize> {
    debug!("sys_isatty <= fd: {fd}");
    ctx.descriptor(fd)?.isatty(&ctx.io_context())?;
    Ok(1)
}
