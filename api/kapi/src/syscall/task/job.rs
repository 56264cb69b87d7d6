// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 KylinSoft Co., Ltd. <https://www.kylinos.cn/>
// See LICENSES for license details.

//! Job control syscalls.
//!
//! This module implements process group operations:
//! - Process group queries (getpgid)
//! - Moving processes between groups (setpgid)

use alloc::sync::Arc;

use kerrno::{KError, KResult};
use kprocess::{Pid, Process};

use crate::ThreadContext;

/// The caller for `pid == 0`, otherwise the process `pid`.
fn process_or_self(ctx: &ThreadContext, pid: i32) -> KResult<Arc<Process>> {
    match pid {
        0 => Ok(ctx.process().clone()),
        pid if pid > 0 => ctx.process().table().get(pid as Pid),
        _ => Err(KError::NoSuchProcess),
    }
}

/// Get the process group ID of the process
pub fn sys_getpgid(ctx: &ThreadContext, pid: i32) -> KResult<isize> {
    debug!("sys_getpgid <= {pid}");
    Ok(process_or_self(ctx, pid)?.group().pgid() as _)
}

/// Set the process group ID of the process
///
/// The target must be the caller or one of its children. A `pgid` of 0 or
/// equal to the target's pid makes the target lead a group of its own;
/// otherwise the group must already exist.
pub fn sys_setpgid(ctx: &ThreadContext, pid: i32, pgid: i32) -> KResult<isize> {
    debug!("sys_setpgid <= pid: {pid}, pgid: {pgid}");
    if pgid < 0 {
        return Err(KError::InvalidInput);
    }
    let proc = process_or_self(ctx, pid)?;
    let caller = ctx.process();
    if !Arc::ptr_eq(&proc, caller) && proc.ppid() != caller.pid() {
        return Err(KError::NoSuchProcess);
    }

    let pgid = pgid as Pid;
    if pgid == 0 || pgid == proc.pid() {
        proc.create_group();
    } else {
        let group = caller
            .table()
            .group(pgid)
            .map_err(|_| KError::OperationNotPermitted)?;
        proc.move_to_group(&group)?;
    }

    Ok(0)
}
