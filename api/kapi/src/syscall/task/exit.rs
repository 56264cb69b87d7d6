// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 KylinSoft Co., Ltd. <https://www.kylinos.cn/>
// See LICENSES for license details.

//! Process exit syscalls.
//!
//! This module implements process termination including:
//! - Process exit
//! - Exit code handling

use kerrno::KResult;

use crate::ThreadContext;

/// Terminates the calling process with `exit_code`.
///
/// The process becomes a zombie until its parent waits for it; the wait
/// status carries the code in its second byte.
pub fn sys_exit(ctx: &ThreadContext, exit_code: i32) -> KResult<isize> {
    debug!("sys_exit <= pid: {}, code: {exit_code}", ctx.process().pid());
    ctx.process().exit((exit_code & 0xff) << 8);
    Ok(0)
}
