// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 KylinSoft Co., Ltd. <https://www.kylinos.cn/>
// See LICENSES for license details.

use alloc::{
    collections::BTreeMap,
    sync::{Arc, Weak},
    vec::Vec,
};
use core::sync::atomic::{AtomicU32, Ordering};

use kerrno::{KError, KResult};
use ksync::Mutex;

use crate::{Pid, Process, ProcessGroup};

/// Maps process and process group IDs to live objects.
///
/// The table only holds weak references: a process is kept alive by its
/// parent until it is reaped, and a group by its members. The init process
/// is owned by whoever created it.
pub struct ProcessTable {
    next_pid: AtomicU32,
    processes: Mutex<BTreeMap<Pid, Weak<Process>>>,
    groups: Mutex<BTreeMap<Pid, Weak<ProcessGroup>>>,
    init: Mutex<Weak<Process>>,
}

impl ProcessTable {
    /// Creates an empty table; the first allocated pid is 1.
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            next_pid: AtomicU32::new(1),
            processes: Mutex::new(BTreeMap::new()),
            groups: Mutex::new(BTreeMap::new()),
            init: Mutex::new(Weak::new()),
        })
    }

    pub(crate) fn alloc_pid(&self) -> Pid {
        self.next_pid.fetch_add(1, Ordering::Relaxed)
    }

    /// Allocates an ID for an additional thread. Thread IDs come from the
    /// pid space, so they never collide with a process ID.
    pub fn alloc_tid(&self) -> Pid {
        self.alloc_pid()
    }

    /// Looks up a live process.
    pub fn get(&self, pid: Pid) -> KResult<Arc<Process>> {
        self.processes
            .lock()
            .get(&pid)
            .and_then(Weak::upgrade)
            .ok_or(KError::NoSuchProcess)
    }

    /// Looks up a process group that still has members.
    pub fn group(&self, pgid: Pid) -> KResult<Arc<ProcessGroup>> {
        // Upgrade first: a rejected group may drop here, and dropping one
        // takes the groups lock.
        let group = self.groups.lock().get(&pgid).and_then(Weak::upgrade);
        group
            .filter(|g| !g.is_empty())
            .ok_or(KError::NoSuchProcess)
    }

    /// The process orphans are reparented to.
    pub fn init(&self) -> KResult<Arc<Process>> {
        self.init.lock().upgrade().ok_or(KError::NoSuchProcess)
    }

    /// Every live process, in pid order.
    pub fn processes(&self) -> Vec<Arc<Process>> {
        self.processes
            .lock()
            .values()
            .filter_map(Weak::upgrade)
            .collect()
    }

    pub(crate) fn set_init(&self, init: &Arc<Process>) {
        *self.init.lock() = Arc::downgrade(init);
    }

    pub(crate) fn insert(&self, process: &Arc<Process>) {
        self.processes
            .lock()
            .insert(process.pid(), Arc::downgrade(process));
    }

    pub(crate) fn remove(&self, pid: Pid) {
        self.processes.lock().remove(&pid);
    }

    /// Returns the live group `pgid`, or creates it.
    pub(crate) fn group_or_new(self: &Arc<Self>, pgid: Pid) -> Arc<ProcessGroup> {
        let existing = self.groups.lock().get(&pgid).and_then(Weak::upgrade);
        existing.unwrap_or_else(|| ProcessGroup::new(pgid, self))
    }

    pub(crate) fn insert_group(&self, group: &Arc<ProcessGroup>) {
        self.groups
            .lock()
            .insert(group.pgid(), Arc::downgrade(group));
    }

    /// Forgets `pgid` unless a live group has taken the ID again.
    pub(crate) fn remove_group(&self, pgid: Pid) {
        let mut groups = self.groups.lock();
        if groups.get(&pgid).is_some_and(|g| g.strong_count() == 0) {
            groups.remove(&pgid);
        }
    }
}
