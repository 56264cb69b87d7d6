// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 KylinSoft Co., Ltd. <https://www.kylinos.cn/>
// See LICENSES for license details.

//! Directory operations.
//!
//! This module implements directory and link management including:
//! - Creating and removing entries (mkdirat, unlinkat)
//! - Symbolic links (symlinkat, readlinkat)
//! - Changing the current directory (chdir, fchdir)

use alloc::sync::Arc;

use kerrno::{KError, KResult};
use kvfs::Vnode;
use linux_raw_sys::general::AT_REMOVEDIR;

use crate::ThreadContext;

/// Resolves the parent directory of `path` and calls `f` on it with the
/// last component.
fn with_parent<R>(
    ctx: &ThreadContext,
    dirfd: i32,
    path: &str,
    f: impl FnOnce(&Arc<Vnode>, &str) -> KResult<R>,
) -> KResult<R> {
    let wctx = ctx.working_context()?;
    let from = ctx.dir_vnode(dirfd)?;
    let (dir, name) = ctx
        .resolver()
        .resolve_parent(&ctx.io_context(), wctx.root(), &from, path)?;
    f(&dir, name)
}

fn resolve(ctx: &ThreadContext, dirfd: i32, path: &str, follow: bool) -> KResult<Arc<Vnode>> {
    let wctx = ctx.working_context()?;
    let from = ctx.dir_vnode(dirfd)?;
    ctx.resolver()
        .resolve(&ctx.io_context(), wctx.root(), &from, path, follow)
}

/// Creates the directory `path`.
pub fn sys_mkdirat(ctx: &ThreadContext, dirfd: i32, path: &str, mode: u32) -> KResult<isize> {
    debug!("sys_mkdirat <= {dirfd} {path:?} {mode:#o}");
    with_parent(ctx, dirfd, path, |dir, name| {
        dir.mkdir(&ctx.io_context(), name, mode)
    })?;
    Ok(0)
}

/// Removes the entry `path`; a directory only with `AT_REMOVEDIR`.
pub fn sys_unlinkat(ctx: &ThreadContext, dirfd: i32, path: &str, flags: u32) -> KResult<isize> {
    debug!("sys_unlinkat <= {dirfd} {path:?} {flags:#x}");
    if flags & !AT_REMOVEDIR != 0 {
        return Err(KError::InvalidInput);
    }
    with_parent(ctx, dirfd, path, |dir, name| {
        let io = ctx.io_context();
        if flags & AT_REMOVEDIR != 0 {
            dir.rmdir(&io, name)
        } else {
            dir.unlink(&io, name)
        }
    })?;
    Ok(0)
}

/// Creates the symbolic link `path` pointing at `target`.
pub fn sys_symlinkat(ctx: &ThreadContext, target: &str, dirfd: i32, path: &str) -> KResult<isize> {
    debug!("sys_symlinkat <= {target:?} {dirfd} {path:?}");
    with_parent(ctx, dirfd, path, |dir, name| {
        dir.symlink(&ctx.io_context(), target, name)
    })?;
    Ok(0)
}

/// Reads the target of the symbolic link `path` into `buf`.
///
/// The target is truncated to the buffer and not NUL-terminated; returns the
/// number of bytes placed.
pub fn sys_readlinkat(
    ctx: &ThreadContext,
    dirfd: i32,
    path: &str,
    buf: &mut [u8],
) -> KResult<isize> {
    debug!("sys_readlinkat <= {dirfd} {path:?} len: {}", buf.len());
    if buf.is_empty() {
        return Err(KError::InvalidInput);
    }
    let link = resolve(ctx, dirfd, path, false)?;
    let target = link.readlink(&ctx.io_context())?;
    let len = target.len().min(buf.len());
    buf[..len].copy_from_slice(&target.as_bytes()[..len]);
    Ok(len as _)
}

/// Changes the current directory to `path`.
pub fn sys_chdir(ctx: &ThreadContext, path: &str) -> KResult<isize> {
    debug!("sys_chdir <= {path:?}");
    let dir = resolve(ctx, crate::AT_FDCWD, path, true)?;
    ctx.process().chdir(dir)?;
    Ok(0)
}

/// Changes the current directory to the directory open at `fd`.
pub fn sys_fchdir(ctx: &ThreadContext, fd: i32) -> KResult<isize> {
    debug!("sys_fchdir <= {fd}");
    let dir = ctx.descriptor(fd)?.vnode().clone();
    ctx.process().chdir(dir)?;
    Ok(0)
}
