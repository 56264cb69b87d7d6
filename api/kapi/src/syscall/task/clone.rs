// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 KylinSoft Co., Ltd. <https://www.kylinos.cn/>
// See LICENSES for license details.

use kerrno::KResult;

use crate::ThreadContext;

/// Creates a child process duplicating the caller.
///
/// Returns the child's pid. The child starts without threads; its main
/// thread is attached with [`ThreadContext::main`].
pub fn sys_fork(ctx: &ThreadContext) -> KResult<isize> {
    debug!("sys_fork <= pid: {}", ctx.process().pid());
    let child = ctx.process().fork()?;
    debug!("sys_fork => {}", child.pid());
    Ok(child.pid() as _)
}
