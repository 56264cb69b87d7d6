// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 KylinSoft Co., Ltd. <https://www.kylinos.cn/>
// See LICENSES for license details.

//! File I/O syscalls.
//!
//! This module implements file input/output operations including:
//! - Reading and writing (read, write, pread, pwrite)
//! - File seeking (lseek)

use kerrno::KResult;

use crate::ThreadContext;

/// Read data from the file indicated by `fd`.
///
/// Return the read size if success.
pub fn sys_read(ctx: &ThreadContext, fd: i32, buf: &mut [u8]) -> KResult<isize> {
    debug!("sys_read <= fd: {fd}, len: {}", buf.len());
    Ok(ctx.descriptor(fd)?.read(&ctx.io_context(), buf)? as _)
}

/// Write data to the file indicated by `fd`.
///
/// Return the written size if success.
pub fn sys_write(ctx: &ThreadContext, fd: i32, buf: &[u8]) -> KResult<isize> {
    debug!("sys_write <= fd: {fd}, len: {}", buf.len());
    Ok(ctx.descriptor(fd)?.write(&ctx.io_context(), buf)? as _)
}

/// Read at `offset` without moving the file offset.
pub fn sys_pread64(ctx: &ThreadContext, fd: i32, buf: &mut [u8], offset: i64) -> KResult<isize> {
    debug!("sys_pread64 <= fd: {fd}, len: {}, offset: {offset}", buf.len());
    Ok(ctx.descriptor(fd)?.pread(&ctx.io_context(), buf, offset)? as _)
}

/// Write at `offset` without moving the file offset.
pub fn sys_pwrite64(ctx: &ThreadContext, fd: i32, buf: &[u8], offset: i64) -> KResult<isize> {
    debug!("sys_pwrite64 <= fd: {fd}, len: {}, offset: {offset}", buf.len());
    Ok(ctx.descriptor(fd)?.pwrite(&ctx.io_context(), buf, offset)? as _)
}

/// Repositions the read/write file offset.
pub fn sys_lseek(ctx: &ThreadContext, fd: i32, offset: i64, whence: i32) -> KResult<isize> {
    debug!("sys_lseek <= {fd} {offset} {whence}");
    let off = ctx.descriptor(fd)?.lseek(&ctx.io_context(), offset, whence)?;
    Ok(off as _)
}
