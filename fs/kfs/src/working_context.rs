// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 KylinSoft Co., Ltd. <https://www.kylinos.cn/>
// See LICENSES for license details.

//! Root and current directory of a process.

use alloc::sync::Arc;
use core::fmt;

use kerrno::{KError, KResult};
use kvfs::Vnode;

/// The directories relative paths and absolute paths start from.
#[derive(Clone)]
pub struct WorkingContext {
    root: Arc<Vnode>,
    cwd: Arc<Vnode>,
}

impl WorkingContext {
    /// Creates a context whose root and current directory are both `root`.
    pub fn new(root: Arc<Vnode>) -> Self {
        Self {
            cwd: root.clone(),
            root,
        }
    }

    pub fn root(&self) -> &Arc<Vnode> {
        &self.root
    }

    pub fn cwd(&self) -> &Arc<Vnode> {
        &self.cwd
    }

    pub fn chdir(&mut self, dir: Arc<Vnode>) -> KResult<()> {
        if !dir.is_dir() {
            return Err(KError::NotADirectory);
        }
        self.cwd = dir;
        Ok(())
    }

    /// Returns a copy of this context with another current directory.
    pub fn with_cwd(&self, dir: Arc<Vnode>) -> KResult<Self> {
        let mut ctx = self.clone();
        ctx.chdir(dir)?;
        Ok(ctx)
    }

    pub fn chroot(&mut self, dir: Arc<Vnode>) -> KResult<()> {
        if !dir.is_dir() {
            return Err(KError::NotADirectory);
        }
        self.root = dir;
        Ok(())
    }
}

impl fmt::Debug for WorkingContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WorkingContext")
            .field("root", &(self.root.ino, self.root.dev))
            .field("cwd", &(self.cwd.ino, self.cwd.dev))
            .finish()
    }
}
