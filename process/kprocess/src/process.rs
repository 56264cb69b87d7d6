// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 KylinSoft Co., Ltd. <https://www.kylinos.cn/>
// See LICENSES for license details.

use alloc::{
    collections::BTreeMap,
    sync::{Arc, Weak},
    vec::Vec,
};
use core::fmt;

use bitflags::bitflags;
use kerrno::{KError, KResult};
use kfs::{DescriptorTable, WorkingContext};
use ksignal::{Signo, ThreadSignals};
use ksync::{Mutex, WaitQueue};
use kvfs::{IoContext, MountTable, Vnode};
use linux_raw_sys::general::{RLIMIT_NOFILE, WNOHANG};

use crate::{
    ClockTimes, Credentials, Pid, ProcessGroup, ProcessTable, RLimit,
    resources::ResourceLimits,
};

bitflags! {
    /// Options of [`Process::wait`].
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct WaitOptions: u32 {
        /// Return at once if no selected child has exited.
        const NOHANG = WNOHANG;
    }
}

/// The children a [`Process::wait`] call may reap.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitSelector {
    /// Any child.
    Any,
    /// The child with this pid.
    Pid(Pid),
    /// Any child in this process group.
    Group(Pid),
}

impl WaitSelector {
    /// Decodes the `pid` argument of `waitpid` on behalf of `caller`.
    pub fn from_waitpid(pid: i32, caller: &Process) -> Self {
        match pid {
            -1 => Self::Any,
            0 => Self::Group(caller.group().pgid()),
            p if p > 0 => Self::Pid(p as Pid),
            p => Self::Group(p.unsigned_abs()),
        }
    }

    fn matches(&self, child: &Process) -> bool {
        match *self {
            Self::Any => true,
            Self::Pid(pid) => child.pid == pid,
            Self::Group(pgid) => child.group().pgid() == pgid,
        }
    }
}

#[derive(Default)]
struct ExitState {
    zombie: bool,
    status: i32,
}

/// A process
///
/// Lock order: `children` of a process, then `parent` of its children, then
/// `children` of init. `group` is taken before the group's member lock.
pub struct Process {
    pid: Pid,
    table: Arc<ProcessTable>,
    parent: Mutex<Weak<Process>>,
    children: Mutex<BTreeMap<Pid, Arc<Process>>>,
    group: Mutex<Arc<ProcessGroup>>,
    exit: Mutex<ExitState>,
    zombie_cond: Arc<WaitQueue>,
    fd_table: DescriptorTable,
    fs: Mutex<Option<WorkingContext>>,
    mount_table: Option<Arc<MountTable>>,
    creds: Mutex<Credentials>,
    limits: Mutex<ResourceLimits>,
    clocks: Mutex<ClockTimes>,
    threads: Mutex<BTreeMap<Pid, Arc<ThreadSignals>>>,
}

impl Process {
    /// Creates the init process: no descriptors, `root` as root and current
    /// directory, leader of its own group.
    pub fn new_init(table: &Arc<ProcessTable>, root: Arc<Vnode>) -> Arc<Process> {
        let pid = table.alloc_pid();
        let limits = ResourceLimits::default();
        let nofile = nofile_limit(&limits);
        let group = table.group_or_new(pid);
        let init = Arc::new(Process {
            pid,
            table: table.clone(),
            parent: Mutex::new(Weak::new()),
            children: Mutex::new(BTreeMap::new()),
            group: Mutex::new(group.clone()),
            exit: Mutex::new(ExitState::default()),
            zombie_cond: Arc::new(WaitQueue::new()),
            fd_table: DescriptorTable::with_limit(nofile),
            mount_table: root.mount_table().cloned(),
            fs: Mutex::new(Some(WorkingContext::new(root))),
            creds: Mutex::new(Credentials::default()),
            limits: Mutex::new(limits),
            clocks: Mutex::new(ClockTimes::default()),
            threads: Mutex::new(BTreeMap::new()),
        });
        group.add(&init);
        table.insert(&init);
        table.set_init(&init);
        info!("init process created with pid {pid}");
        init
    }

    /// The [`Process`] ID.
    pub fn pid(&self) -> Pid {
        self.pid
    }

    /// The table this process is registered in.
    pub fn table(&self) -> &Arc<ProcessTable> {
        &self.table
    }

    /// Whether this is the process orphans are reparented to.
    pub fn is_init(&self) -> bool {
        self.table
            .init()
            .is_ok_and(|init| core::ptr::eq(Arc::as_ptr(&init), self))
    }

    /// The parent, if it is still around.
    pub fn parent(&self) -> Option<Arc<Process>> {
        self.parent.lock().upgrade()
    }

    /// The parent's pid, or 0 for init.
    pub fn ppid(&self) -> Pid {
        self.parent().map_or(0, |p| p.pid)
    }

    /// Live and zombie children.
    pub fn children(&self) -> Vec<Arc<Process>> {
        self.children.lock().values().cloned().collect()
    }

    /// The descriptor table.
    pub fn fd_table(&self) -> &DescriptorTable {
        &self.fd_table
    }

    /// The mount table paths of this process are resolved through.
    pub fn mount_table(&self) -> Option<&Arc<MountTable>> {
        self.mount_table.as_ref()
    }

    /// Creates a child process.
    ///
    /// The child shares every descriptor of this process except the
    /// close-on-fork ones, and starts with the same directories,
    /// credentials and limits, in the same group. Fails with `ESRCH` once
    /// this process has exited.
    pub fn fork(self: &Arc<Self>) -> KResult<Arc<Process>> {
        let fs = self.fs.lock().clone().ok_or(KError::NoSuchProcess)?;
        let fd_table = self.fd_table.fork()?;
        let pid = self.table.alloc_pid();
        let group = self.group();
        let child = Arc::new(Process {
            pid,
            table: self.table.clone(),
            parent: Mutex::new(Arc::downgrade(self)),
            children: Mutex::new(BTreeMap::new()),
            group: Mutex::new(group.clone()),
            exit: Mutex::new(ExitState::default()),
            zombie_cond: Arc::new(WaitQueue::new()),
            fd_table,
            fs: Mutex::new(Some(fs)),
            mount_table: self.mount_table.clone(),
            creds: Mutex::new(self.credentials()),
            limits: Mutex::new(self.limits.lock().clone()),
            clocks: Mutex::new(ClockTimes::default()),
            threads: Mutex::new(BTreeMap::new()),
        });
        // `exit` marks the zombie before it takes `children` to reparent
        // them, so a child linked in under this lock is never stranded.
        let mut children = self.children.lock();
        if self.is_zombie() {
            drop(children);
            drop(child);
            return Err(KError::NoSuchProcess);
        }
        children.insert(pid, child.clone());
        group.add(&child);
        self.table.insert(&child);
        drop(children);
        debug!("fork: {} -> {}", self.pid, pid);
        Ok(child)
    }

    /// Whether the process has exited and awaits reaping.
    pub fn is_zombie(&self) -> bool {
        self.exit.lock().zombie
    }

    /// The wait status recorded by [`Process::exit`].
    pub fn exit_status(&self) -> i32 {
        self.exit.lock().status
    }

    /// Terminates the process with wait status `status`.
    ///
    /// Descriptors and directories are released, children are handed to
    /// init, and the parent is woken. Exiting twice has no effect.
    pub fn exit(&self, status: i32) {
        {
            let mut state = self.exit.lock();
            if state.zombie {
                warn!("process {} exited twice", self.pid);
                return;
            }
            state.zombie = true;
            state.status = status;
        }
        debug!("process {} exits with status {status:#x}", self.pid);
        self.fd_table.reset();
        let fs = self.fs.lock().take();
        drop(fs);
        self.threads.lock().clear();
        self.reparent_children();

        let parent_ref = self.parent.lock();
        if let Some(parent) = parent_ref.upgrade() {
            parent.zombie_cond.notify_all();
        }
    }

    fn reparent_children(&self) {
        let mut children = self.children.lock();
        if children.is_empty() {
            return;
        }
        let init = match self.table.init() {
            Ok(init) if !core::ptr::eq(Arc::as_ptr(&init), self) => init,
            _ => {
                warn!("process {} exits with no init to adopt its children", self.pid);
                return;
            }
        };
        let orphans = core::mem::take(&mut *children);
        for child in orphans.values() {
            *child.parent.lock() = Arc::downgrade(&init);
        }
        trace!("reparenting {} children of {} to init", orphans.len(), self.pid);
        init.children.lock().extend(orphans);
        drop(children);
        // Some of the orphans may already be zombies.
        init.zombie_cond.notify_all();
    }

    /// Finds a zombie child the selector allows; `ECHILD` if no child matches
    /// at all.
    fn find_zombie(&self, selector: WaitSelector) -> KResult<Option<Arc<Process>>> {
        let children = self.children.lock();
        let mut matched = false;
        for child in children.values().filter(|c| selector.matches(c)) {
            if child.is_zombie() {
                return Ok(Some(child.clone()));
            }
            matched = true;
        }
        if matched {
            Ok(None)
        } else {
            Err(KError::NoChildProcess)
        }
    }

    /// Removes a zombie child and folds its clocks into ours.
    fn reap(&self, child: &Process) -> Option<(Pid, i32)> {
        self.children.lock().remove(&child.pid)?;
        let (user, system) = child.clocks().reaped_total();
        {
            let mut clocks = self.clocks.lock();
            clocks.children_user = clocks.children_user.saturating_add(user);
            clocks.children_system = clocks.children_system.saturating_add(system);
        }
        child.group().remove(child.pid);
        self.table.remove(child.pid);
        trace!("process {} reaped {}", self.pid, child.pid);
        Some((child.pid, child.exit_status()))
    }

    /// Waits for a selected child to exit and reaps it.
    ///
    /// Returns the child's pid and wait status, or `None` under
    /// [`WaitOptions::NOHANG`] when no selected child has exited yet.
    pub fn wait(
        &self,
        signals: &ThreadSignals,
        selector: WaitSelector,
        options: WaitOptions,
    ) -> KResult<Option<(Pid, i32)>> {
        loop {
            if let Some(child) = self.find_zombie(selector)? {
                if let Some(reaped) = self.reap(&child) {
                    return Ok(Some(reaped));
                }
                continue;
            }
            if options.contains(WaitOptions::NOHANG) {
                return Ok(None);
            }
            signals.sleep_until(&self.zombie_cond, || {
                !matches!(self.find_zombie(selector), Ok(None))
            })?;
        }
    }

    /// The group this process belongs to.
    pub fn group(&self) -> Arc<ProcessGroup> {
        self.group.lock().clone()
    }

    /// Makes this process the leader of a group named after its pid.
    pub fn create_group(self: &Arc<Self>) -> Arc<ProcessGroup> {
        let group = self.table.group_or_new(self.pid);
        self.set_group(&group);
        group
    }

    /// Moves this process into `group`, which must still have members.
    pub fn move_to_group(self: &Arc<Self>, group: &Arc<ProcessGroup>) -> KResult<()> {
        if group.is_empty() {
            return Err(KError::OperationNotPermitted);
        }
        self.set_group(group);
        Ok(())
    }

    fn set_group(self: &Arc<Self>, group: &Arc<ProcessGroup>) {
        let mut current = self.group.lock();
        if Arc::ptr_eq(&current, group) {
            return;
        }
        current.remove(self.pid);
        group.add(self);
        let old = core::mem::replace(&mut *current, group.clone());
        drop(current);
        drop(old);
    }

    /// Closes the close-on-exec descriptors, as a successful `execve` does.
    pub fn on_execute(&self) {
        self.fd_table.on_execute();
    }

    /// Registers a thread of this process.
    pub fn add_thread(&self, tid: Pid, signals: Arc<ThreadSignals>) {
        self.threads.lock().insert(tid, signals);
    }

    /// Unregisters a thread; returns whether it was the last one.
    pub fn exit_thread(&self, tid: Pid) -> bool {
        let mut threads = self.threads.lock();
        threads.remove(&tid);
        threads.is_empty()
    }

    /// The IDs of the registered threads.
    pub fn threads(&self) -> Vec<Pid> {
        self.threads.lock().keys().copied().collect()
    }

    /// Signal state of one thread.
    pub fn thread_signals(&self, tid: Pid) -> KResult<Arc<ThreadSignals>> {
        self.threads
            .lock()
            .get(&tid)
            .cloned()
            .ok_or(KError::NoSuchProcess)
    }

    /// Makes `signo` pending on the first thread that does not block it, or
    /// on the first thread if all of them do.
    ///
    /// Returns `false` if the process has no threads.
    pub fn send_signal(&self, signo: Signo) -> bool {
        let threads = self.threads.lock();
        let target = threads
            .values()
            .find(|t| !t.blocked().has(signo))
            .or_else(|| threads.values().next());
        match target {
            Some(thread) => {
                thread.send(signo);
                true
            }
            None => false,
        }
    }

    /// The current credentials.
    pub fn credentials(&self) -> Credentials {
        *self.creds.lock()
    }

    /// Replaces the credentials.
    pub fn set_credentials(&self, creds: Credentials) {
        *self.creds.lock() = creds;
    }

    /// An I/O context carrying this process's effective IDs.
    pub fn io_context(&self, signals: Arc<ThreadSignals>) -> IoContext {
        let creds = self.credentials();
        IoContext::new(creds.euid, creds.egid, signals)
    }

    /// Reads one resource limit.
    pub fn rlimit(&self, resource: u32) -> KResult<RLimit> {
        self.limits.lock().get(resource)
    }

    /// Replaces one resource limit. `RLIMIT_NOFILE` also bounds the
    /// descriptor table.
    pub fn set_rlimit(&self, resource: u32, new: RLimit) -> KResult<()> {
        let privileged = self.credentials().is_privileged();
        let mut limits = self.limits.lock();
        limits.set(resource, new, privileged)?;
        if resource == RLIMIT_NOFILE {
            self.fd_table.set_limit(nofile_limit(&limits));
        }
        Ok(())
    }

    /// CPU times of this process and its reaped children.
    pub fn clocks(&self) -> ClockTimes {
        *self.clocks.lock()
    }

    /// Charges execution time to this process.
    pub fn add_time(&self, user: u64, system: u64) {
        let mut clocks = self.clocks.lock();
        clocks.user = clocks.user.saturating_add(user);
        clocks.system = clocks.system.saturating_add(system);
    }

    /// A snapshot of the root and current directory.
    pub fn working_context(&self) -> KResult<WorkingContext> {
        self.fs.lock().clone().ok_or(KError::NoSuchProcess)
    }

    /// Changes the current directory.
    pub fn chdir(&self, dir: Arc<Vnode>) -> KResult<()> {
        self.fs
            .lock()
            .as_mut()
            .ok_or(KError::NoSuchProcess)?
            .chdir(dir)
    }

    /// Changes the root directory.
    pub fn chroot(&self, dir: Arc<Vnode>) -> KResult<()> {
        self.fs
            .lock()
            .as_mut()
            .ok_or(KError::NoSuchProcess)?
            .chroot(dir)
    }
}

fn nofile_limit(limits: &ResourceLimits) -> usize {
    limits
        .get(RLIMIT_NOFILE)
        .map_or(usize::MAX, |l| usize::try_from(l.cur).unwrap_or(usize::MAX))
}

impl fmt::Debug for Process {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Process")
            .field("pid", &self.pid)
            .field("ppid", &self.ppid())
            .field("zombie", &self.is_zombie())
            .finish()
    }
}
