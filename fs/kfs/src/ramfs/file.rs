// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 KylinSoft Co., Ltd. <https://www.kylinos.cn/>
// See LICENSES for license details.

use alloc::{string::String, sync::Arc, vec::Vec};

use kerrno::{KError, KResult};
use ksync::Mutex;
use kvfs::{Inode, InodeType, IoContext, NodeType, OFF_MAX, Stat, TimeSpec};

use super::{FsInner, Meta};

/// A regular file.
pub struct RamFile {
    meta: Meta,
    fs: Arc<FsInner>,
    data: Mutex<Vec<u8>>,
}

impl RamFile {
    pub(super) fn new(fs: &Arc<FsInner>, ctx: &IoContext, perm: u32) -> Arc<Self> {
        let mode = NodeType::RegularFile.as_mode() | (perm & 0o7777);
        Arc::new(Self {
            meta: Meta::new(fs, fs.alloc_ino(), mode, ctx),
            fs: fs.clone(),
            data: Mutex::new(Vec::new()),
        })
    }

    /// Number of directory entries referring to this file.
    pub fn nlink(&self) -> u32 {
        self.meta.nlink()
    }

    pub fn len(&self) -> usize {
        self.data.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.lock().is_empty()
    }
}

fn resize(data: &mut Vec<u8>, len: usize) -> KResult<()> {
    if len > data.len() {
        data.try_reserve(len - data.len())
            .map_err(|_| KError::NoMemory)?;
    }
    data.resize(len, 0);
    Ok(())
}

impl Inode for RamFile {
    fn ino(&self) -> u64 {
        self.meta.ino
    }

    fn dev(&self) -> u64 {
        self.meta.dev
    }

    fn inode_type(&self) -> InodeType {
        InodeType::File
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
        let size = self.data.lock().len() as i64;
        Ok(self.meta.stat(self.meta.nlink(), size))
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

    fn truncate(&self, _ctx: &IoContext, length: i64) -> KResult<()> {
        let len = usize::try_from(length).map_err(|_| KError::InvalidInput)?;
        resize(&mut self.data.lock(), len)?;
        self.meta.touch(&self.fs);
        Ok(())
    }

    fn pread(&self, ctx: &IoContext, buf: &mut [u8], offset: i64) -> KResult<usize> {
        let offset = usize::try_from(offset).map_err(|_| KError::InvalidInput)?;
        let data = self.data.lock();
        if offset >= data.len() {
            return Ok(0);
        }
        let n = buf.len().min(data.len() - offset);
        ctx.copy_to_dest(&mut buf[..n], &data[offset..offset + n])?;
        Ok(n)
    }

    fn pwrite(&self, ctx: &IoContext, buf: &[u8], offset: i64) -> KResult<usize> {
        if offset < 0 {
            return Err(KError::InvalidInput);
        }
        if buf.is_empty() {
            return Ok(0);
        }
        let end = offset
            .checked_add(buf.len() as i64)
            .filter(|end| *end <= OFF_MAX)
            .ok_or(KError::Overflow)?;
        let (offset, end) = (offset as usize, end as usize);
        let mut data = self.data.lock();
        if end > data.len() {
            resize(&mut data, end)?;
        }
        ctx.copy_from_src(&mut data[offset..end], buf)?;
        drop(data);
        self.meta.touch(&self.fs);
        Ok(buf.len())
    }
}

impl Drop for RamFile {
    fn drop(&mut self) {
        if self.meta.nlink() == 0 {
            trace!("ramfs: reclaiming unlinked file {}", self.meta.ino);
        }
    }
}

/// A symbolic link.
pub struct RamSymlink {
    meta: Meta,
    target: String,
}

impl RamSymlink {
    pub(super) fn new(fs: &Arc<FsInner>, ctx: &IoContext, target: &str) -> Arc<Self> {
        let mode = NodeType::Symlink.as_mode() | 0o777;
        Arc::new(Self {
            meta: Meta::new(fs, fs.alloc_ino(), mode, ctx),
            target: target.into(),
        })
    }
}

impl Inode for RamSymlink {
    fn ino(&self) -> u64 {
        self.meta.ino
    }

    fn dev(&self) -> u64 {
        self.meta.dev
    }

    fn inode_type(&self) -> InodeType {
        InodeType::File
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
        Ok(self.meta.stat(self.meta.nlink(), self.target.len() as i64))
    }

    fn readlink(&self, _ctx: &IoContext) -> KResult<String> {
        Ok(self.target.clone())
    }
}
