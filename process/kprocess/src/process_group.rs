// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 KylinSoft Co., Ltd. <https://www.kylinos.cn/>
// See LICENSES for license details.

use alloc::{
    collections::BTreeMap,
    sync::{Arc, Weak},
    vec::Vec,
};
use core::fmt;

use ksync::Mutex;

use crate::{Pid, Process, ProcessTable};

/// A process group
pub struct ProcessGroup {
    pgid: Pid,
    table: Weak<ProcessTable>,
    processes: Mutex<BTreeMap<Pid, Weak<Process>>>,
}

impl ProcessGroup {
    pub(crate) fn new(pgid: Pid, table: &Arc<ProcessTable>) -> Arc<Self> {
        let group = Arc::new(Self {
            pgid,
            table: Arc::downgrade(table),
            processes: Mutex::new(BTreeMap::new()),
        });
        table.insert_group(&group);
        group
    }

    /// The [`ProcessGroup`] ID.
    pub fn pgid(&self) -> Pid {
        self.pgid
    }

    /// The live processes in this group.
    pub fn processes(&self) -> Vec<Arc<Process>> {
        self.processes
            .lock()
            .values()
            .filter_map(Weak::upgrade)
            .collect()
    }

    /// Whether no live process belongs to the group any more.
    pub fn is_empty(&self) -> bool {
        !self
            .processes
            .lock()
            .values()
            .any(|p| p.strong_count() > 0)
    }

    pub(crate) fn add(&self, process: &Arc<Process>) {
        self.processes
            .lock()
            .insert(process.pid(), Arc::downgrade(process));
    }

    pub(crate) fn remove(&self, pid: Pid) {
        self.processes.lock().remove(&pid);
    }
}

impl Drop for ProcessGroup {
    fn drop(&mut self) {
        if let Some(table) = self.table.upgrade() {
            table.remove_group(self.pgid);
        }
    }
}

impl fmt::Debug for ProcessGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProcessGroup")
            .field("pgid", &self.pgid)
            .finish()
    }
}
