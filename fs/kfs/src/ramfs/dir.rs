// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 KylinSoft Co., Ltd. <https://www.kylinos.cn/>
// See LICENSES for license details.

use alloc::{
    collections::BTreeMap,
    string::String,
    sync::{Arc, Weak},
    vec::Vec,
};

use kerrno::{KError, KResult};
use ksync::{Mutex, MutexGuard};
use kvfs::{
    DirEntry, Inode, InodeType, IoContext, NAME_MAX, NodeType, OpenFlags, Stat, TimeSpec,
};

use super::{FsInner, Meta, RamFile, RamSymlink};

type Entries = BTreeMap<String, Arc<dyn Inode>>;

/// A directory.
pub struct RamDir {
    meta: Meta,
    fs: Arc<FsInner>,
    this: Weak<RamDir>,
    parent: Mutex<Weak<RamDir>>,
    entries: Mutex<Entries>,
}

fn check_name(name: &str) -> KResult<()> {
    if name.is_empty() {
        return Err(KError::NotFound);
    }
    if name.len() > NAME_MAX {
        return Err(KError::NameTooLong);
    }
    if name.contains('/') {
        return Err(KError::InvalidInput);
    }
    Ok(())
}

/// Checks a name a new entry is about to take.
fn check_new_name(name: &str) -> KResult<()> {
    if name == "." || name == ".." {
        return Err(KError::AlreadyExists);
    }
    check_name(name)
}

fn as_dir(node: &Arc<dyn Inode>) -> Option<&RamDir> {
    node.downcast_ref::<RamDir>()
}

/// Checks that `node` may replace `old` under a rename.
fn check_replace(node: &Arc<dyn Inode>, old: Option<&Arc<dyn Inode>>) -> KResult<()> {
    let Some(old) = old else {
        return Ok(());
    };
    match (as_dir(node), as_dir(old)) {
        (Some(_), None) => Err(KError::NotADirectory),
        (None, Some(_)) => Err(KError::IsADirectory),
        (Some(_), Some(old)) if !old.entries.lock().is_empty() => Err(KError::DirectoryNotEmpty),
        _ => Ok(()),
    }
}

impl RamDir {
    pub(super) fn new_root(fs: Arc<FsInner>) -> Arc<Self> {
        let ctx = IoContext::kernel();
        let dir = Self::new(fs, &ctx, 0o755, Weak::new());
        dir.meta.linked();
        dir
    }

    fn new(fs: Arc<FsInner>, ctx: &IoContext, perm: u32, parent: Weak<RamDir>) -> Arc<Self> {
        let mode = NodeType::Directory.as_mode() | (perm & 0o7777);
        let ino = fs.alloc_ino();
        Arc::new_cyclic(|this| Self {
            meta: Meta::new(&fs, ino, mode, ctx),
            fs,
            this: this.clone(),
            parent: Mutex::new(parent),
            entries: Mutex::new(BTreeMap::new()),
        })
    }

    fn this(&self) -> KResult<Arc<RamDir>> {
        self.this.upgrade().ok_or(KError::NotFound)
    }

    fn parent_or_self(&self) -> KResult<Arc<RamDir>> {
        match self.parent.lock().upgrade() {
            Some(parent) => Ok(parent),
            None => self.this(),
        }
    }

    /// Removed directories accept no new entries.
    fn check_alive(&self) -> KResult<()> {
        if self.meta.nlink() == 0 {
            Err(KError::NotFound)
        } else {
            Ok(())
        }
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }

    /// Whether `self` is `dir` or lies below it.
    fn is_within(&self, dir: &RamDir) -> bool {
        let mut current = self.this.upgrade();
        while let Some(node) = current {
            if core::ptr::eq(Arc::as_ptr(&node), dir) {
                return true;
            }
            current = node.parent.lock().upgrade();
        }
        false
    }

    /// Locks the entries of two distinct directories in inode order.
    fn lock_pair<'a>(
        &'a self,
        other: &'a RamDir,
    ) -> (MutexGuard<'a, Entries>, MutexGuard<'a, Entries>) {
        if self.meta.ino < other.meta.ino {
            let mine = self.entries.lock();
            (mine, other.entries.lock())
        } else {
            let theirs = other.entries.lock();
            (self.entries.lock(), theirs)
        }
    }

    fn insert_new(&self, name: &str, node: Arc<dyn Inode>) -> KResult<()> {
        check_new_name(name)?;
        self.check_alive()?;
        let mut entries = self.entries.lock();
        if entries.contains_key(name) {
            return Err(KError::AlreadyExists);
        }
        node.linked();
        entries.insert(name.into(), node);
        drop(entries);
        self.meta.touch(&self.fs);
        Ok(())
    }
}

impl Inode for RamDir {
    fn ino(&self) -> u64 {
        self.meta.ino
    }

    fn dev(&self) -> u64 {
        self.meta.dev
    }

    fn inode_type(&self) -> InodeType {
        InodeType::Dir
    }

    fn mode(&self) -> u32 {
        self.meta.mode()
    }

    fn linked(&self) {
        self.meta.linked();
    }

    fn unlinked(&self) {
        self.meta.unlinked();
    }

    fn stat(&self, _ctx: &IoContext) -> KResult<Stat> {
        let entries = self.entries.lock();
        let subdirs = entries
            .values()
            .filter(|n| n.inode_type() == InodeType::Dir)
            .count() as u32;
        let nlink = if self.meta.nlink() == 0 {
            0
        } else {
            2 + subdirs
        };
        Ok(self.meta.stat(nlink, entries.len() as i64))
    }

    fn chmod(&self, ctx: &IoContext, mode: u32) -> KResult<()> {
        self.meta.chmod(&self.fs, ctx, mode)
    }

    fn chown(&self, ctx: &IoContext, uid: u32, gid: u32) -> KResult<()> {
        self.meta.chown(&self.fs, ctx, uid, gid)
    }

    fn utimens(
        &self,
        ctx: &IoContext,
        atime: Option<TimeSpec>,
        mtime: Option<TimeSpec>,
    ) -> KResult<()> {
        self.meta.utimens(&self.fs, ctx, atime, mtime)
    }

    fn readdirents(&self, _ctx: &IoContext, start: u64, max: usize) -> KResult<Vec<DirEntry>> {
        let parent = self.parent_or_self()?;
        let dots = [(".", self.meta.ino), ("..", parent.meta.ino)].map(|(name, ino)| DirEntry {
            ino,
            node_type: NodeType::Directory,
            name: name.into(),
        });
        let entries = self.entries.lock();
        let listed = entries.iter().map(|(name, node)| DirEntry {
            ino: node.ino(),
            node_type: NodeType::from_mode(node.mode()),
            name: name.clone(),
        });
        let start = usize::try_from(start).unwrap_or(usize::MAX);
        Ok(dots.into_iter().chain(listed).skip(start).take(max).collect())
    }

    fn open(
        &self,
        ctx: &IoContext,
        name: &str,
        flags: OpenFlags,
        mode: u32,
    ) -> KResult<Arc<dyn Inode>> {
        match name {
            "." => return Ok(self.this()?),
            ".." => return Ok(self.parent_or_self()?),
            _ => check_name(name)?,
        }
        let mut entries = self.entries.lock();
        if let Some(node) = entries.get(name) {
            if flags.contains(OpenFlags::CREATE | OpenFlags::EXCL) {
                return Err(KError::AlreadyExists);
            }
            return Ok(node.clone());
        }
        if !flags.contains(OpenFlags::CREATE) {
            return Err(KError::NotFound);
        }
        self.check_alive()?;
        let file = RamFile::new(&self.fs, ctx, mode);
        file.linked();
        entries.insert(name.into(), file.clone());
        drop(entries);
        self.meta.touch(&self.fs);
        Ok(file)
    }

    fn mkdir(&self, ctx: &IoContext, name: &str, mode: u32) -> KResult<()> {
        let dir = RamDir::new(self.fs.clone(), ctx, mode, self.this.clone());
        self.insert_new(name, dir)
    }

    fn link(&self, _ctx: &IoContext, name: &str, node: &Arc<dyn Inode>) -> KResult<()> {
        if node.dev() != self.meta.dev {
            return Err(KError::CrossesDevices);
        }
        if node.inode_type() == InodeType::Dir {
            return Err(KError::OperationNotPermitted);
        }
        self.insert_new(name, node.clone())
    }

    fn symlink(&self, ctx: &IoContext, target: &str, name: &str) -> KResult<()> {
        let link = RamSymlink::new(&self.fs, ctx, target);
        self.insert_new(name, link)
    }

    fn unlink(&self, _ctx: &IoContext, name: &str) -> KResult<()> {
        if name == "." || name == ".." {
            return Err(KError::IsADirectory);
        }
        check_name(name)?;
        let mut entries = self.entries.lock();
        match entries.get(name) {
            None => return Err(KError::NotFound),
            Some(node) if node.inode_type() == InodeType::Dir => {
                return Err(KError::IsADirectory);
            }
            Some(_) => {}
        }
        let node = entries.remove(name);
        drop(entries);
        if let Some(node) = node {
            node.unlinked();
        }
        self.meta.touch(&self.fs);
        Ok(())
    }

    fn rmdir(&self, _ctx: &IoContext, name: &str) -> KResult<()> {
        match name {
            "." => return Err(KError::InvalidInput),
            ".." => return Err(KError::DirectoryNotEmpty),
            _ => check_name(name)?,
        }
        let mut entries = self.entries.lock();
        let dir = entries.get(name).ok_or(KError::NotFound)?;
        let dir = as_dir(dir).ok_or(KError::NotADirectory)?;
        if !dir.is_empty() {
            return Err(KError::DirectoryNotEmpty);
        }
        let node = entries.remove(name);
        drop(entries);
        if let Some(node) = node {
            node.unlinked();
        }
        self.meta.touch(&self.fs);
        Ok(())
    }

    fn rename_here(
        &self,
        _ctx: &IoContext,
        from: &Arc<dyn Inode>,
        oldname: &str,
        newname: &str,
    ) -> KResult<()> {
        let from = as_dir(from).ok_or(KError::CrossesDevices)?;
        if from.meta.dev != self.meta.dev {
            return Err(KError::CrossesDevices);
        }
        for name in [oldname, newname] {
            if name == "." || name == ".." {
                return Err(KError::InvalidInput);
            }
            check_name(name)?;
        }
        self.check_alive()?;

        let replaced = if core::ptr::eq(from, self) {
            let mut entries = self.entries.lock();
            let node = entries.get(oldname).cloned().ok_or(KError::NotFound)?;
            if oldname == newname {
                return Ok(());
            }
            check_replace(&node, entries.get(newname))?;
            entries.remove(oldname);
            entries.insert(newname.into(), node)
        } else {
            let (mut dst, mut src) = self.lock_pair(from);
            let node = src.get(oldname).cloned().ok_or(KError::NotFound)?;
            if let Some(moved) = as_dir(&node) {
                if self.is_within(moved) {
                    return Err(KError::InvalidInput);
                }
            }
            check_replace(&node, dst.get(newname))?;
            src.remove(oldname);
            if let Some(moved) = as_dir(&node) {
                *moved.parent.lock() = self.this.clone();
            }
            dst.insert(newname.into(), node)
        };
        if let Some(old) = replaced {
            old.unlinked();
        }
        self.meta.touch(&self.fs);
        Ok(())
    }
}
