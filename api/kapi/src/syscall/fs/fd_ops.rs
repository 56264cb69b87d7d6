// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 KylinSoft Co., Ltd. <https://www.kylinos.cn/>
// See LICENSES for license details.

//! File descriptor operations.
//!
//! This module implements descriptor management including:
//! - Opening files (open, openat)
//! - Closing descriptors (close, closefrom)
//! - Duplicating descriptors (dup, dup2, dup3)

use kerrno::{KError, KResult};
use kfs::FdFlags;
use kvfs::OpenFlags;

use crate::{AT_FDCWD, ThreadContext};

/// Converts the close-on-exec and close-on-fork open flags into slot flags.
pub(crate) fn fd_flags_of(flags: OpenFlags) -> FdFlags {
    let mut fd_flags = FdFlags::empty();
    if flags.contains(OpenFlags::CLOEXEC) {
        fd_flags |= FdFlags::CLOEXEC;
    }
    if flags.contains(OpenFlags::CLOFORK) {
        fd_flags |= FdFlags::CLOFORK;
    }
    fd_flags
}

fn open_flags(raw: u32) -> KResult<OpenFlags> {
    OpenFlags::from_bits(raw).ok_or(KError::InvalidInput)
}

/// Opens `path` relative to the current directory.
pub fn sys_open(ctx: &ThreadContext, path: &str, flags: u32, mode: u32) -> KResult<isize> {
    sys_openat(ctx, AT_FDCWD, path, flags, mode)
}

/// Opens `path` relative to the directory `dirfd`, or to the current
/// directory if it is `AT_FDCWD`.
///
/// `flags` uses this kernel's [`OpenFlags`] layout.
pub fn sys_openat(
    ctx: &ThreadContext,
    dirfd: i32,
    path: &str,
    flags: u32,
    mode: u32,
) -> KResult<isize> {
    let flags = open_flags(flags)?;
    debug!("sys_openat <= {dirfd} {path:?} {flags:?} {mode:#o}");

    let wctx = ctx.working_context()?;
    let from = ctx.dir_vnode(dirfd)?;
    let io = ctx.io_context();
    let desc = ctx
        .resolver()
        .open(&io, wctx.root(), &from, path, flags, mode)?;
    let fd = ctx
        .process()
        .fd_table()
        .allocate(desc, fd_flags_of(flags), 0)?;
    Ok(fd as _)
}

/// Closes `fd`.
pub fn sys_close(ctx: &ThreadContext, fd: i32) -> KResult<isize> {
    debug!("sys_close <= {fd}");
    ctx.process().fd_table().free(fd)?;
    Ok(0)
}

/// Closes every descriptor numbered `min_fd` or above.
pub fn sys_closefrom(ctx: &ThreadContext, min_fd: i32) -> KResult<isize> {
    debug!("sys_closefrom <= {min_fd}");
    let closed = ctx.process().fd_table().close_from(min_fd)?;
    trace!("sys_closefrom: closed {closed} descriptors");
    Ok(0)
}

/// Duplicates `fd` into the lowest free slot.
pub fn sys_dup(ctx: &ThreadContext, fd: i32) -> KResult<isize> {
    debug!("sys_dup <= {fd}");
    let new_fd = ctx
        .process()
        .fd_table()
        .allocate_dup(fd, FdFlags::empty(), 0)?;
    Ok(new_fd as _)
}

/// Duplicates `old_fd` into `new_fd`, replacing whatever `new_fd` held.
///
/// Duplicating a valid descriptor onto itself does nothing.
pub fn sys_dup2(ctx: &ThreadContext, old_fd: i32, new_fd: i32) -> KResult<isize> {
    debug!("sys_dup2 <= old_fd: {old_fd}, new_fd: {new_fd}");
    let fd = ctx
        .process()
        .fd_table()
        .copy(old_fd, new_fd, FdFlags::empty())?;
    Ok(fd as _)
}

/// Like [`sys_dup2`], with `O_CLOEXEC`/`O_CLOFORK` applied to the new slot.
/// Equal descriptors are an error.
pub fn sys_dup3(ctx: &ThreadContext, old_fd: i32, new_fd: i32, flags: u32) -> KResult<isize> {
    debug!("sys_dup3 <= old_fd: {old_fd}, new_fd: {new_fd}, flags: {flags:#x}");
    let flags = open_flags(flags)?;
    if old_fd == new_fd || !(OpenFlags::CLOEXEC | OpenFlags::CLOFORK).contains(flags) {
        return Err(KError::InvalidInput);
    }
    let fd = ctx
        .process()
        .fd_table()
        .copy(old_fd, new_fd, fd_flags_of(flags))?;
    Ok(fd as _)
}
