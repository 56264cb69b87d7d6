// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 KylinSoft Co., Ltd. <https://www.kylinos.cn/>
// See LICENSES for license details.

use alloc::sync::Arc;

use kerrno::{KError, KResult};
use kfs::{PathResolver, ramfs::RamFs};
use kprocess::{Process, ProcessTable, RLimit};
use kvfs::{Inode, InodeType, IoContext, MountTable, Vnode};
use linux_raw_sys::general::RLIMIT_NOFILE;

use crate::{KernelConfig, ThreadContext};

/// Device number of the root filesystem.
const ROOT_DEV: u64 = 1;

/// A booted kernel: the root filesystem, the mount table and the process
/// table with its init process.
pub struct Kernel {
    config: Arc<KernelConfig>,
    _root_fs: RamFs,
    mount_table: Arc<MountTable>,
    root: Arc<Vnode>,
    processes: Arc<ProcessTable>,
    init: Arc<Process>,
}

impl Kernel {
    /// Brings the kernel up as described by `config`.
    pub fn boot(config: KernelConfig) -> KResult<Self> {
        klogger::init_klogger();
        if klogger::set_log_level(&config.log_level).is_err() {
            warn!("unknown log level {:?}, keeping warn", config.log_level);
        }

        let root_fs = RamFs::new(ROOT_DEV);
        let mount_table = Arc::new(MountTable::new());
        let root = Vnode::new_root(root_fs.root(), Some(mount_table.clone()));
        let processes = ProcessTable::new();
        let init = Process::new_init(&processes, root.clone());
        let nofile = config.max_open_files as u64;
        let max = init.rlimit(RLIMIT_NOFILE)?.max.max(nofile);
        init.set_rlimit(RLIMIT_NOFILE, RLimit::new(nofile, max))?;

        info!(
            "kernel booted: pipe capacity {}, symloop max {}, nofile {}",
            config.pipe_capacity, config.symloop_max, config.max_open_files
        );
        Ok(Self {
            config: Arc::new(config),
            _root_fs: root_fs,
            mount_table,
            root,
            processes,
            init,
        })
    }

    pub fn config(&self) -> &Arc<KernelConfig> {
        &self.config
    }

    /// The root directory of the whole system.
    pub fn root(&self) -> &Arc<Vnode> {
        &self.root
    }

    pub fn mount_table(&self) -> &Arc<MountTable> {
        &self.mount_table
    }

    pub fn processes(&self) -> &Arc<ProcessTable> {
        &self.processes
    }

    pub fn init(&self) -> &Arc<Process> {
        &self.init
    }

    /// Creates the context of the init process's main thread.
    pub fn init_thread(&self) -> ThreadContext {
        ThreadContext::main(self.config.clone(), self.init.clone())
    }

    /// Mounts the filesystem rooted at `root` on the directory `path`.
    pub fn mount(&self, path: &str, root: Arc<dyn Inode>) -> KResult<()> {
        let ctx = IoContext::kernel();
        let point = PathResolver::with_symloop_max(self.config.symloop_max).resolve(
            &ctx,
            &self.root,
            &self.root,
            path,
            true,
        )?;
        if !point.is_dir() || root.inode_type() != InodeType::Dir {
            return Err(KError::NotADirectory);
        }
        self.mount_table.add(point.ino, point.dev, root);
        Ok(())
    }
}
