// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 KylinSoft Co., Ltd. <https://www.kylinos.cn/>
// See LICENSES for license details.

use kerrno::{KError, KResult};
use kprocess::{WaitOptions, WaitSelector};

use crate::ThreadContext;

/// Waits for a child selected by `pid` to exit and reaps it.
///
/// `pid` selects any child (-1), a child of the caller's group (0), one
/// child (> 0) or a child of group `-pid` (< -1). Returns the reaped pid, or
/// 0 under `WNOHANG` when no selected child has exited yet.
pub fn sys_waitpid(
    ctx: &ThreadContext,
    pid: i32,
    status: Option<&mut i32>,
    options: u32,
) -> KResult<isize> {
    debug!("sys_waitpid <= pid: {pid}, options: {options:#x}");
    let options = WaitOptions::from_bits(options).ok_or(KError::InvalidInput)?;
    let proc = ctx.process();
    let selector = WaitSelector::from_waitpid(pid, proc);

    match proc.wait(ctx.signals(), selector, options)? {
        Some((child, exit_status)) => {
            if let Some(status) = status {
                *status = exit_status;
            }
            Ok(child as _)
        }
        None => Ok(0),
    }
}
