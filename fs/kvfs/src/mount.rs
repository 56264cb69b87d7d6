// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 KylinSoft Co., Ltd. <https://www.kylinos.cn/>
// See LICENSES for license details.

//! The table of mounted filesystems.
use alloc::{sync::Arc, vec::Vec};

use kerrno::KError;
use ksync::Mutex;

use crate::{Inode, VfsResult};

struct Mount {
    /// Identity of the covered directory.
    ino: u64,
    dev: u64,
    root: Arc<dyn Inode>,
}

/// Maps covered directories, by `(ino, dev)`, to the roots mounted on them.
///
/// Mounts are kept in the order they were made. Mounting on the root of an
/// earlier mount stacks the new mount on top of it, and lookups walk the
/// stack by resuming after the mount they last found.
#[derive(Default)]
pub struct MountTable {
    mounts: Mutex<Vec<Mount>>,
}

impl MountTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&self, ino: u64, dev: u64, root: Arc<dyn Inode>) {
        debug!(
            "mount: ({ino}, {dev}) covered by root ({}, {})",
            root.ino(),
            root.dev()
        );
        self.mounts.lock().push(Mount { ino, dev, root });
    }

    /// Finds the first mount at or after position `from` covering
    /// `(ino, dev)`, returning its position and root.
    pub fn lookup(&self, ino: u64, dev: u64, from: usize) -> Option<(usize, Arc<dyn Inode>)> {
        let mounts = self.mounts.lock();
        mounts
            .iter()
            .enumerate()
            .skip(from)
            .find(|(_, m)| m.ino == ino && m.dev == dev)
            .map(|(i, m)| (i, m.root.clone()))
    }

    /// Removes the latest mount of the root `(root_ino, root_dev)` on the
    /// directory `(ino, dev)`.
    pub fn remove(&self, ino: u64, dev: u64, root_ino: u64, root_dev: u64) -> VfsResult<()> {
        let mut mounts = self.mounts.lock();
        let pos = mounts
            .iter()
            .rposition(|m| {
                m.ino == ino && m.dev == dev && m.root.ino() == root_ino && m.root.dev() == root_dev
            })
            .ok_or(KError::InvalidInput)?;
        let mount = mounts.remove(pos);
        drop(mounts);
        debug!("unmount: ({ino}, {dev})");
        drop(mount);
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.mounts.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.mounts.lock().is_empty()
    }
}
