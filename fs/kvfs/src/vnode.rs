// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 KylinSoft Co., Ltd. <https://www.kylinos.cn/>
// See LICENSES for license details.

//! Mount-aware wrapper around an inode.
use alloc::{string::String, sync::Arc, vec::Vec};

use inherit_methods_macro::inherit_methods;
use kerrno::KError;
use kpoll::PollNode;

use crate::{
    DirEntry, Inode, IoContext, MountTable, NodeType, OpenFlags, Stat, StatVfs, TimeSpec,
    VfsResult, WinSize,
};

/// An inode seen at a particular place in the mount tree.
///
/// `rootino`/`rootdev` identify the root of the mount the vnode lives in and
/// `mountedat` is the directory that mount covers, so `..` from a mount root
/// leaves the mount.
pub struct Vnode {
    inode: Arc<dyn Inode>,
    mountedat: Option<Arc<Vnode>>,
    rootino: u64,
    rootdev: u64,
    mtable: Option<Arc<MountTable>>,
    pub ino: u64,
    pub dev: u64,
    pub mode: u32,
}

#[inherit_methods(from = "self.inode")]
impl Vnode {
    pub fn sync(&self, ctx: &IoContext) -> VfsResult<()>;

    pub fn stat(&self, ctx: &IoContext) -> VfsResult<Stat>;

    pub fn statvfs(&self, ctx: &IoContext) -> VfsResult<StatVfs>;

    pub fn chmod(&self, ctx: &IoContext, mode: u32) -> VfsResult<()>;

    pub fn chown(&self, ctx: &IoContext, uid: u32, gid: u32) -> VfsResult<()>;

    pub fn truncate(&self, ctx: &IoContext, length: i64) -> VfsResult<()>;

    pub fn lseek(&self, ctx: &IoContext, offset: i64, whence: i32) -> VfsResult<i64>;

    pub fn read(&self, ctx: &IoContext, buf: &mut [u8]) -> VfsResult<usize>;

    pub fn pread(&self, ctx: &IoContext, buf: &mut [u8], offset: i64) -> VfsResult<usize>;

    pub fn write(&self, ctx: &IoContext, buf: &[u8]) -> VfsResult<usize>;

    pub fn pwrite(&self, ctx: &IoContext, buf: &[u8], offset: i64) -> VfsResult<usize>;

    pub fn utimens(
        &self,
        ctx: &IoContext,
        atime: Option<TimeSpec>,
        mtime: Option<TimeSpec>,
    ) -> VfsResult<()>;

    pub fn isatty(&self, ctx: &IoContext) -> VfsResult<()>;

    pub fn readdirents(&self, ctx: &IoContext, start: u64, max: usize) -> VfsResult<Vec<DirEntry>>;

    pub fn mkdir(&self, ctx: &IoContext, name: &str, mode: u32) -> VfsResult<()>;

    pub fn unlink(&self, ctx: &IoContext, name: &str) -> VfsResult<()>;

    pub fn rmdir(&self, ctx: &IoContext, name: &str) -> VfsResult<()>;

    pub fn symlink(&self, ctx: &IoContext, target: &str, name: &str) -> VfsResult<()>;

    pub fn readlink(&self, ctx: &IoContext) -> VfsResult<String>;

    pub fn poll(&self, ctx: &IoContext, node: &PollNode) -> VfsResult<()>;

    pub fn tcgetwinsize(&self, ctx: &IoContext) -> VfsResult<WinSize>;

    pub fn tcsetpgrp(&self, ctx: &IoContext, pgid: i32) -> VfsResult<()>;

    pub fn tcgetpgrp(&self, ctx: &IoContext) -> VfsResult<i32>;

    pub fn settermmode(&self, ctx: &IoContext, mode: u32) -> VfsResult<()>;

    pub fn gettermmode(&self, ctx: &IoContext) -> VfsResult<u32>;

    pub fn bind(&self, ctx: &IoContext, addr: &[u8]) -> VfsResult<()>;

    pub fn connect(&self, ctx: &IoContext, addr: &[u8]) -> VfsResult<()>;

    pub fn listen(&self, ctx: &IoContext, backlog: i32) -> VfsResult<()>;

    pub fn recv(&self, ctx: &IoContext, buf: &mut [u8], flags: i32) -> VfsResult<usize>;

    pub fn send(&self, ctx: &IoContext, buf: &[u8], flags: i32) -> VfsResult<usize>;

    pub fn getsockopt(
        &self,
        ctx: &IoContext,
        level: i32,
        name: i32,
        value: &mut [u8],
    ) -> VfsResult<usize>;

    pub fn setsockopt(&self, ctx: &IoContext, level: i32, name: i32, value: &[u8])
    -> VfsResult<()>;
}

impl Vnode {
    fn build(
        inode: Arc<dyn Inode>,
        mountedat: Option<Arc<Vnode>>,
        rootino: u64,
        rootdev: u64,
        mtable: Option<Arc<MountTable>>,
    ) -> Arc<Self> {
        Arc::new(Self {
            ino: inode.ino(),
            dev: inode.dev(),
            mode: inode.mode(),
            inode,
            mountedat,
            rootino,
            rootdev,
            mtable,
        })
    }

    /// Creates the vnode of a filesystem root that is not mounted anywhere.
    pub fn new_root(inode: Arc<dyn Inode>, mtable: Option<Arc<MountTable>>) -> Arc<Self> {
        let (ino, dev) = (inode.ino(), inode.dev());
        Self::build(inode, None, ino, dev, mtable)
    }

    /// Creates a vnode for an inode that lives outside the mount tree, such
    /// as a pipe end.
    pub fn new_detached(inode: Arc<dyn Inode>) -> Arc<Self> {
        Self::new_root(inode, None)
    }

    pub fn inode(&self) -> &Arc<dyn Inode> {
        &self.inode
    }

    /// The directory covered by the mount this vnode lives in.
    pub fn mounted_at(&self) -> Option<&Arc<Vnode>> {
        self.mountedat.as_ref()
    }

    pub fn mount_table(&self) -> Option<&Arc<MountTable>> {
        self.mtable.as_ref()
    }

    /// Whether this vnode is the root of the mount it lives in.
    pub fn is_mount_root(&self) -> bool {
        self.ino == self.rootino && self.dev == self.rootdev
    }

    pub fn node_type(&self) -> NodeType {
        NodeType::from_mode(self.mode)
    }

    pub fn is_dir(&self) -> bool {
        self.node_type() == NodeType::Directory
    }

    /// Looks up `name` in this directory, crossing mount points.
    pub fn open(
        self: &Arc<Self>,
        ctx: &IoContext,
        name: &str,
        flags: OpenFlags,
        mode: u32,
    ) -> VfsResult<Arc<Vnode>> {
        if name == ".." && self.is_mount_root() {
            if let Some(covered) = &self.mountedat {
                return covered.open(ctx, name, flags, mode);
            }
        }

        let inode = self.inode.open(ctx, name, flags, mode)?;
        let mut vnode = Self::build(
            inode,
            self.mountedat.clone(),
            self.rootino,
            self.rootdev,
            self.mtable.clone(),
        );
        let Some(mtable) = &self.mtable else {
            return Ok(vnode);
        };
        let mut from = 0;
        while let Some((pos, root)) = mtable.lookup(vnode.ino, vnode.dev, from) {
            let (rootino, rootdev) = (root.ino(), root.dev());
            vnode = Self::build(root, Some(vnode), rootino, rootdev, self.mtable.clone());
            from = pos + 1;
        }
        Ok(vnode)
    }

    pub fn link(&self, ctx: &IoContext, name: &str, node: &Vnode) -> VfsResult<()> {
        if node.dev != self.dev {
            return Err(KError::CrossesDevices);
        }
        self.inode.link(ctx, name, &node.inode)
    }

    pub fn rename_here(
        &self,
        ctx: &IoContext,
        from: &Vnode,
        oldname: &str,
        newname: &str,
    ) -> VfsResult<()> {
        if from.dev != self.dev {
            return Err(KError::CrossesDevices);
        }
        self.inode.rename_here(ctx, &from.inode, oldname, newname)
    }

    /// Accepts a connection, returning a vnode outside the mount tree.
    pub fn accept(&self, ctx: &IoContext) -> VfsResult<Arc<Vnode>> {
        self.inode.accept(ctx).map(Self::new_detached)
    }

    /// Mounts the filesystem rooted at `root` on the directory `name`.
    pub fn fsm_mount(
        self: &Arc<Self>,
        ctx: &IoContext,
        name: &str,
        root: Arc<dyn Inode>,
    ) -> VfsResult<()> {
        let mtable = self.mtable.as_ref().ok_or(KError::Unsupported)?;
        let point = self.open(ctx, name, OpenFlags::READ, 0)?;
        if !point.is_dir() {
            return Err(KError::NotADirectory);
        }
        mtable.add(point.ino, point.dev, root);
        Ok(())
    }

    /// Makes the inode behind `source` visible at `name` as well.
    pub fn fsm_fsbind(
        self: &Arc<Self>,
        ctx: &IoContext,
        name: &str,
        source: &Vnode,
    ) -> VfsResult<()> {
        let mtable = self.mtable.as_ref().ok_or(KError::Unsupported)?;
        let point = self.open(ctx, name, OpenFlags::READ, 0)?;
        if point.is_dir() != source.is_dir() {
            return Err(KError::NotADirectory);
        }
        mtable.add(point.ino, point.dev, source.inode.clone());
        Ok(())
    }

    /// Removes the topmost mount reached through `name`.
    pub fn unmount(self: &Arc<Self>, ctx: &IoContext, name: &str) -> VfsResult<()> {
        let mtable = self.mtable.as_ref().ok_or(KError::Unsupported)?;
        let point = self.open(ctx, name, OpenFlags::READ, 0)?;
        let Some(covered) = point.mounted_at().filter(|_| point.is_mount_root()) else {
            return Err(KError::InvalidInput);
        };
        mtable.remove(covered.ino, covered.dev, point.rootino, point.rootdev)
    }
}
