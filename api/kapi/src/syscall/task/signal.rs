// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 KylinSoft Co., Ltd. <https://www.kylinos.cn/>
// See LICENSES for license details.

use alloc::{sync::Arc, vec::Vec};

use kerrno::{KError, KResult};
use kprocess::{Pid, Process};
use ksignal::Signo;

use crate::ThreadContext;

fn may_signal(sender: &Process, target: &Process) -> bool {
    let from = sender.credentials();
    let to = target.credentials();
    from.is_privileged() || from.uid == to.uid || from.euid == to.uid
}

/// Sends `sig` to the processes selected by `pid`.
///
/// `pid` selects one process (> 0), the caller's group (0), every process
/// but init and the caller (-1) or the group `-pid` (< -1). A `sig` of 0
/// only checks that a target exists and may be signaled.
pub fn sys_kill(ctx: &ThreadContext, pid: i32, sig: u32) -> KResult<isize> {
    debug!("sys_kill <= pid: {pid}, sig: {sig}");
    let signo = match sig {
        0 => None,
        sig => Some(Signo::from_raw(sig).ok_or(KError::InvalidInput)?),
    };

    let caller = ctx.process();
    let table = caller.table();
    let targets: Vec<Arc<Process>> = match pid {
        p if p > 0 => Vec::from([table.get(p as Pid)?]),
        0 => caller.group().processes(),
        -1 => table
            .processes()
            .into_iter()
            .filter(|p| !p.is_init() && !Arc::ptr_eq(p, caller))
            .collect(),
        p => table.group(p.unsigned_abs())?.processes(),
    };
    if targets.is_empty() {
        return Err(KError::NoSuchProcess);
    }

    let mut delivered = 0;
    for target in targets.iter().filter(|t| may_signal(caller, t)) {
        if let Some(signo) = signo {
            if !target.send_signal(signo) {
                trace!("sys_kill: process {} has no threads", target.pid());
            }
        }
        delivered += 1;
    }
    if delivered == 0 {
        return Err(KError::OperationNotPermitted);
    }
    Ok(0)
}
