// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 KylinSoft Co., Ltd. <https://www.kylinos.cn/>
// See LICENSES for license details.

use kerrno::{KError, KResult};
use kfs::{Descriptor, pipe::pipe};
use kvfs::{OpenFlags, Vnode};

use super::fd_ops::fd_flags_of;
use crate::ThreadContext;

/// Creates a pipe and stores its read and write descriptors in `fds`.
///
/// `flags` may hold `CLOEXEC`, `CLOFORK` and `NONBLOCK` in this kernel's
/// [`OpenFlags`] layout.
pub fn sys_pipe2(ctx: &ThreadContext, fds: &mut [i32; 2], flags: u32) -> KResult<isize> {
    let flags = OpenFlags::from_bits(flags)
        .filter(|f| (OpenFlags::CLOEXEC | OpenFlags::CLOFORK | OpenFlags::NONBLOCK).contains(*f))
        .ok_or(KError::InvalidInput)?;
    debug!("sys_pipe2 <= flags: {flags:?}");

    let (reader, writer) = pipe(ctx.config().pipe_capacity);
    let status = flags & OpenFlags::NONBLOCK;
    let reader = Descriptor::new(Vnode::new_detached(reader), OpenFlags::READ | status);
    let writer = Descriptor::new(Vnode::new_detached(writer), OpenFlags::WRITE | status);

    let table = ctx.process().fd_table();
    let fd_flags = fd_flags_of(flags);
    let read_fd = table.allocate(reader, fd_flags, 0)?;
    let write_fd = match table.allocate(writer, fd_flags, 0) {
        Ok(fd) => fd,
        Err(err) => {
            let _ = table.free(read_fd);
            return Err(err);
        }
    };
    *fds = [read_fd, write_fd];
    debug!("sys_pipe2 => [{read_fd}, {write_fd}]");
    Ok(0)
}
