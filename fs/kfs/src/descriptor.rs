// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 KylinSoft Co., Ltd. <https://www.kylinos.cn/>
// See LICENSES for license details.

//! Open file descriptions.

use alloc::{string::String, sync::Arc, vec::Vec};

use inherit_methods_macro::inherit_methods;
use kerrno::{KError, KResult};
use kpoll::PollNode;
use ksync::Mutex;
use kvfs::{
    DirEntry, IoContext, NodeType, OFF_MAX, OpenFlags, SEEK_CUR, SEEK_END, SEEK_SET, Stat,
    StatVfs, TimeSpec, Vnode, WinSize,
};
use spin::Once;

use crate::PathResolver;

/// An open file description: a vnode plus the offset and status flags of
/// one `open` call.
///
/// Descriptors are shared between descriptor-table slots by `dup` and
/// between processes by `fork`; all of them see the same offset.
pub struct Descriptor {
    vnode: Arc<Vnode>,
    dflags: Mutex<OpenFlags>,
    current_offset: Mutex<i64>,
    seekable: Once<bool>,
    pub ino: u64,
    pub dev: u64,
    pub mode: u32,
}

#[inherit_methods(from = "self.vnode")]
impl Descriptor {
    pub fn sync(&self, ctx: &IoContext) -> KResult<()>;

    pub fn stat(&self, ctx: &IoContext) -> KResult<Stat>;

    pub fn statvfs(&self, ctx: &IoContext) -> KResult<StatVfs>;

    pub fn chmod(&self, ctx: &IoContext, mode: u32) -> KResult<()>;

    pub fn chown(&self, ctx: &IoContext, uid: u32, gid: u32) -> KResult<()>;

    pub fn utimens(
        &self,
        ctx: &IoContext,
        atime: Option<TimeSpec>,
        mtime: Option<TimeSpec>,
    ) -> KResult<()>;

    pub fn isatty(&self, ctx: &IoContext) -> KResult<()>;

    pub fn mkdir(&self, ctx: &IoContext, name: &str, mode: u32) -> KResult<()>;

    pub fn unlink(&self, ctx: &IoContext, name: &str) -> KResult<()>;

    pub fn rmdir(&self, ctx: &IoContext, name: &str) -> KResult<()>;

    pub fn symlink(&self, ctx: &IoContext, target: &str, name: &str) -> KResult<()>;

    pub fn readlink(&self, ctx: &IoContext) -> KResult<String>;

    pub fn tcgetwinsize(&self, ctx: &IoContext) -> KResult<WinSize>;

    pub fn tcsetpgrp(&self, ctx: &IoContext, pgid: i32) -> KResult<()>;

    pub fn tcgetpgrp(&self, ctx: &IoContext) -> KResult<i32>;

    pub fn settermmode(&self, ctx: &IoContext, mode: u32) -> KResult<()>;

    pub fn gettermmode(&self, ctx: &IoContext) -> KResult<u32>;

    pub fn bind(&self, ctx: &IoContext, addr: &[u8]) -> KResult<()>;

    pub fn connect(&self, ctx: &IoContext, addr: &[u8]) -> KResult<()>;

    pub fn listen(&self, ctx: &IoContext, backlog: i32) -> KResult<()>;

    pub fn getsockopt(
        &self,
        ctx: &IoContext,
        level: i32,
        name: i32,
        value: &mut [u8],
    ) -> KResult<usize>;

    pub fn setsockopt(&self, ctx: &IoContext, level: i32, name: i32, value: &[u8]) -> KResult<()>;
}

impl Descriptor {
    /// Opens `vnode`; only the status bits of `dflags` are kept.
    pub fn new(vnode: Arc<Vnode>, dflags: OpenFlags) -> Arc<Self> {
        Self::with_offset(vnode, dflags & OpenFlags::STATUS, 0)
    }

    fn with_offset(vnode: Arc<Vnode>, dflags: OpenFlags, offset: i64) -> Arc<Self> {
        Arc::new(Self {
            ino: vnode.ino,
            dev: vnode.dev,
            mode: vnode.mode,
            vnode,
            dflags: Mutex::new(dflags),
            current_offset: Mutex::new(offset),
            seekable: Once::new(),
        })
    }

    pub fn vnode(&self) -> &Arc<Vnode> {
        &self.vnode
    }

    /// Creates an independent description of the same vnode, starting with
    /// this one's flags and offset.
    pub fn fork(&self) -> Arc<Self> {
        let offset = *self.current_offset.lock();
        Self::with_offset(self.vnode.clone(), self.get_flags(), offset)
    }

    pub fn get_flags(&self) -> OpenFlags {
        *self.dflags.lock()
    }

    /// Replaces the changeable status flags; the access mode is kept.
    pub fn set_flags(&self, flags: OpenFlags) {
        let mut dflags = self.dflags.lock();
        *dflags = (*dflags - OpenFlags::SETTABLE) | (flags & OpenFlags::SETTABLE);
    }

    pub fn is_seekable(&self) -> bool {
        *self.seekable.call_once(|| {
            matches!(
                NodeType::from_mode(self.mode),
                NodeType::RegularFile | NodeType::Directory | NodeType::BlockDevice
            )
        })
    }

    fn io_context(&self, ctx: &IoContext) -> IoContext {
        ctx.with_dflags(self.get_flags())
    }

    fn check_readable(&self) -> KResult<()> {
        if self.get_flags().is_readable() {
            Ok(())
        } else {
            Err(KError::BadFileDescriptor)
        }
    }

    fn check_writable(&self) -> KResult<()> {
        if self.get_flags().is_writable() {
            Ok(())
        } else {
            Err(KError::BadFileDescriptor)
        }
    }

    pub fn lseek(&self, ctx: &IoContext, offset: i64, whence: i32) -> KResult<i64> {
        if !self.is_seekable() {
            return self.vnode.lseek(&self.io_context(ctx), offset, whence);
        }
        let mut current = self.current_offset.lock();
        let base = match whence {
            SEEK_SET => 0,
            SEEK_CUR => *current,
            SEEK_END => self.vnode.stat(&self.io_context(ctx))?.size,
            _ => return Err(KError::InvalidInput),
        };
        let new = base.checked_add(offset).ok_or(KError::Overflow)?;
        if new < 0 {
            return Err(KError::InvalidInput);
        }
        *current = new;
        Ok(new)
    }

    pub fn read(&self, ctx: &IoContext, buf: &mut [u8]) -> KResult<usize> {
        self.check_readable()?;
        let ctx = self.io_context(ctx);
        if !self.is_seekable() {
            return self.vnode.read(&ctx, buf);
        }
        let mut offset = self.current_offset.lock();
        let count = clamp_count(*offset, buf.len());
        let n = self.vnode.pread(&ctx, &mut buf[..count], *offset)?;
        *offset += n as i64;
        Ok(n)
    }

    pub fn pread(&self, ctx: &IoContext, buf: &mut [u8], offset: i64) -> KResult<usize> {
        self.check_readable()?;
        if !self.is_seekable() {
            return Err(KError::IllegalSeek);
        }
        if offset < 0 {
            return Err(KError::InvalidInput);
        }
        let count = clamp_count(offset, buf.len());
        self.vnode
            .pread(&self.io_context(ctx), &mut buf[..count], offset)
    }

    pub fn write(&self, ctx: &IoContext, buf: &[u8]) -> KResult<usize> {
        self.check_writable()?;
        let ctx = self.io_context(ctx);
        if !self.is_seekable() {
            return self.vnode.write(&ctx, buf);
        }
        let mut offset = self.current_offset.lock();
        if ctx.dflags.contains(OpenFlags::APPEND) {
            *offset = self.vnode.stat(&ctx)?.size;
        }
        let count = clamp_count(*offset, buf.len());
        if count == 0 && !buf.is_empty() {
            return Err(KError::Overflow);
        }
        let n = self.vnode.pwrite(&ctx, &buf[..count], *offset)?;
        *offset += n as i64;
        Ok(n)
    }

    pub fn pwrite(&self, ctx: &IoContext, buf: &[u8], offset: i64) -> KResult<usize> {
        self.check_writable()?;
        if !self.is_seekable() {
            return Err(KError::IllegalSeek);
        }
        if offset < 0 {
            return Err(KError::InvalidInput);
        }
        let count = clamp_count(offset, buf.len());
        if count == 0 && !buf.is_empty() {
            return Err(KError::Overflow);
        }
        self.vnode.pwrite(&self.io_context(ctx), &buf[..count], offset)
    }

    pub fn truncate(&self, ctx: &IoContext, length: i64) -> KResult<()> {
        self.check_writable()?;
        self.vnode.truncate(&self.io_context(ctx), length)
    }

    /// Reads up to `max` directory entries and advances the offset by the
    /// number of entries returned.
    pub fn readdirents(&self, ctx: &IoContext, max: usize) -> KResult<Vec<DirEntry>> {
        self.check_readable()?;
        let mut offset = self.current_offset.lock();
        let entries = self
            .vnode
            .readdirents(&self.io_context(ctx), *offset as u64, max)?;
        *offset += entries.len() as i64;
        Ok(entries)
    }

    pub fn poll(&self, ctx: &IoContext, node: &PollNode) -> KResult<()> {
        self.vnode.poll(&self.io_context(ctx), node)
    }

    pub fn link(&self, ctx: &IoContext, name: &str, node: &Descriptor) -> KResult<()> {
        self.vnode.link(ctx, name, &node.vnode)
    }

    pub fn rename_here(
        &self,
        ctx: &IoContext,
        from: &Descriptor,
        oldname: &str,
        newname: &str,
    ) -> KResult<()> {
        self.vnode.rename_here(ctx, &from.vnode, oldname, newname)
    }

    pub fn accept(&self, ctx: &IoContext) -> KResult<Arc<Descriptor>> {
        let vnode = self.vnode.accept(&self.io_context(ctx))?;
        Ok(Self::new(vnode, OpenFlags::READ | OpenFlags::WRITE))
    }

    pub fn recv(&self, ctx: &IoContext, buf: &mut [u8], flags: i32) -> KResult<usize> {
        self.vnode.recv(&self.io_context(ctx), buf, flags)
    }

    pub fn send(&self, ctx: &IoContext, buf: &[u8], flags: i32) -> KResult<usize> {
        self.vnode.send(&self.io_context(ctx), buf, flags)
    }

    /// Opens `path` relative to this descriptor's directory.
    pub fn open(
        &self,
        ctx: &IoContext,
        root: &Arc<Vnode>,
        path: &str,
        flags: OpenFlags,
        mode: u32,
    ) -> KResult<Arc<Descriptor>> {
        PathResolver::new().open(ctx, root, &self.vnode, path, flags, mode)
    }
}

/// Limits a transfer of `len` bytes at `offset` so the offset stays within
/// [`OFF_MAX`].
fn clamp_count(offset: i64, len: usize) -> usize {
    let room = (OFF_MAX - offset) as u64;
    len.min(usize::try_from(room).unwrap_or(usize::MAX))
}
