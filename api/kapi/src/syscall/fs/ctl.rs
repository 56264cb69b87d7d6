// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 KylinSoft Co., Ltd. <https://www.kylinos.cn/>
// See LICENSES for license details.

//! File control syscalls.

use kerrno::{KError, KResult};
use kfs::FdFlags;
use kvfs::OpenFlags;
use linux_raw_sys::general::{F_DUPFD, F_DUPFD_CLOEXEC, F_GETFD, F_GETFL, F_SETFD, F_SETFL};

use crate::ThreadContext;

/// `fcntl` command duplicating a descriptor with close-on-fork set.
///
/// Linux has no such command; the value is outside its range.
pub const F_DUPFD_CLOFORK: u32 = 1040;

fn dup_floor(arg: usize) -> KResult<i32> {
    i32::try_from(arg).map_err(|_| KError::InvalidInput)
}

/// Manipulates the descriptor `fd`.
///
/// Supports duplication (`F_DUPFD`, `F_DUPFD_CLOEXEC`, `F_DUPFD_CLOFORK`),
/// slot flags (`F_GETFD`, `F_SETFD`) and status flags (`F_GETFL`,
/// `F_SETFL`). Status flags use this kernel's [`OpenFlags`] layout and only
/// [`OpenFlags::SETTABLE`] can be changed.
pub fn sys_fcntl(ctx: &ThreadContext, fd: i32, cmd: u32, arg: usize) -> KResult<isize> {
    debug!("sys_fcntl <= fd: {fd}, cmd: {cmd}, arg: {arg}");
    let table = ctx.process().fd_table();
    let dup_flags = match cmd {
        F_DUPFD => Some(FdFlags::empty()),
        F_DUPFD_CLOEXEC => Some(FdFlags::CLOEXEC),
        F_DUPFD_CLOFORK => Some(FdFlags::CLOFORK),
        _ => None,
    };
    if let Some(flags) = dup_flags {
        return Ok(table.allocate_dup(fd, flags, dup_floor(arg)?)? as _);
    }

    match cmd {
        F_GETFD => Ok(table.get_flags(fd)?.bits() as _),
        F_SETFD => {
            let flags = u32::try_from(arg).map_err(|_| KError::InvalidInput)?;
            table.set_flags(fd, FdFlags::from_bits_retain(flags))?;
            Ok(0)
        }
        F_GETFL => Ok(table.get(fd)?.get_flags().bits() as _),
        F_SETFL => {
            let flags = u32::try_from(arg).map_err(|_| KError::InvalidInput)?;
            table
                .get(fd)?
                .set_flags(OpenFlags::from_bits_truncate(flags));
            Ok(0)
        }
        _ => {
            warn!("unsupported fcntl command: {cmd}");
            Err(KError::InvalidInput)
        }
    }
}
