// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 KylinSoft Co., Ltd. <https://www.kylinos.cn/>
// See LICENSES for license details.

use alloc::{string::String, sync::Arc, vec::Vec};

use downcast_rs::{DowncastSync, impl_downcast};
use kerrno::KError;
use kpoll::{IoEvents, PollNode};

use crate::{
    DirEntry, InodeType, IoContext, OpenFlags, Stat, StatVfs, TimeSpec, VfsResult, WinSize,
};

/// A filesystem object.
///
/// Backends implement the identity methods and override the operations they
/// support. Every other operation falls back to a default chosen by
/// [`Inode::inode_type`]: directories answer file operations with
/// `EISDIR`, streams and terminals refuse to seek, everything but a
/// directory answers directory operations with `ENOTDIR`, and so on.
pub trait Inode: DowncastSync {
    fn ino(&self) -> u64;

    fn dev(&self) -> u64;

    fn inode_type(&self) -> InodeType;

    /// Type and permission bits.
    fn mode(&self) -> u32;

    /// Called when a directory entry starts referring to this inode.
    fn linked(&self) {}

    /// Called when a directory entry referring to this inode is removed.
    fn unlinked(&self) {}

    fn sync(&self, _ctx: &IoContext) -> VfsResult<()> {
        Ok(())
    }

    fn stat(&self, _ctx: &IoContext) -> VfsResult<Stat> {
        Ok(Stat {
            ino: self.ino(),
            dev: self.dev(),
            mode: self.mode(),
            nlink: 1,
            ..Default::default()
        })
    }

    fn statvfs(&self, _ctx: &IoContext) -> VfsResult<StatVfs> {
        Err(KError::NoSys)
    }

    fn chmod(&self, _ctx: &IoContext, _mode: u32) -> VfsResult<()> {
        Err(KError::OperationNotPermitted)
    }

    fn chown(&self, _ctx: &IoContext, _uid: u32, _gid: u32) -> VfsResult<()> {
        Err(KError::OperationNotPermitted)
    }

    fn truncate(&self, _ctx: &IoContext, _length: i64) -> VfsResult<()> {
        match self.inode_type() {
            InodeType::Dir => Err(KError::IsADirectory),
            _ => Err(KError::InvalidInput),
        }
    }

    fn lseek(&self, _ctx: &IoContext, _offset: i64, _whence: i32) -> VfsResult<i64> {
        match self.inode_type() {
            InodeType::File | InodeType::Dir => Err(KError::InvalidInput),
            InodeType::Stream | InodeType::Tty => Err(KError::IllegalSeek),
        }
    }

    fn read(&self, _ctx: &IoContext, _buf: &mut [u8]) -> VfsResult<usize> {
        Err(default_io_error(self.inode_type()))
    }

    fn pread(&self, _ctx: &IoContext, _buf: &mut [u8], _offset: i64) -> VfsResult<usize> {
        Err(default_positional_error(self.inode_type()))
    }

    fn write(&self, _ctx: &IoContext, _buf: &[u8]) -> VfsResult<usize> {
        Err(default_io_error(self.inode_type()))
    }

    fn pwrite(&self, _ctx: &IoContext, _buf: &[u8], _offset: i64) -> VfsResult<usize> {
        Err(default_positional_error(self.inode_type()))
    }

    /// Sets the access and modification times; `None` leaves a time as is.
    fn utimens(
        &self,
        _ctx: &IoContext,
        _atime: Option<TimeSpec>,
        _mtime: Option<TimeSpec>,
    ) -> VfsResult<()> {
        Err(KError::OperationNotPermitted)
    }

    fn isatty(&self, _ctx: &IoContext) -> VfsResult<()> {
        match self.inode_type() {
            InodeType::Tty => Ok(()),
            _ => Err(KError::NotATty),
        }
    }

    /// Returns at most `max` entries, starting at entry index `start`.
    fn readdirents(&self, _ctx: &IoContext, _start: u64, _max: usize) -> VfsResult<Vec<DirEntry>> {
        Err(default_dir_error(self.inode_type()))
    }

    /// Looks up or creates the entry `name` in this directory.
    fn open(
        &self,
        _ctx: &IoContext,
        _name: &str,
        _flags: OpenFlags,
        _mode: u32,
    ) -> VfsResult<Arc<dyn Inode>> {
        Err(default_dir_error(self.inode_type()))
    }

    fn mkdir(&self, _ctx: &IoContext, _name: &str, _mode: u32) -> VfsResult<()> {
        Err(default_dir_error(self.inode_type()))
    }

    fn link(&self, _ctx: &IoContext, _name: &str, _node: &Arc<dyn Inode>) -> VfsResult<()> {
        Err(default_dir_error(self.inode_type()))
    }

    fn unlink(&self, _ctx: &IoContext, _name: &str) -> VfsResult<()> {
        Err(default_dir_error(self.inode_type()))
    }

    fn rmdir(&self, _ctx: &IoContext, _name: &str) -> VfsResult<()> {
        Err(default_dir_error(self.inode_type()))
    }

    /// Creates the symbolic link `name` pointing at `target`.
    fn symlink(&self, _ctx: &IoContext, _target: &str, _name: &str) -> VfsResult<()> {
        Err(default_dir_error(self.inode_type()))
    }

    fn readlink(&self, _ctx: &IoContext) -> VfsResult<String> {
        Err(KError::InvalidInput)
    }

    /// Moves the entry `oldname` of directory `from` to `newname` in this
    /// directory.
    fn rename_here(
        &self,
        _ctx: &IoContext,
        _from: &Arc<dyn Inode>,
        _oldname: &str,
        _newname: &str,
    ) -> VfsResult<()> {
        Err(default_dir_error(self.inode_type()))
    }

    /// Reports readiness on `node`, or registers it on the object's poll
    /// channel and fails with [`KError::WouldBlock`].
    fn poll(&self, _ctx: &IoContext, node: &PollNode) -> VfsResult<()> {
        match self.inode_type() {
            InodeType::File | InodeType::Dir => {
                let ready = (IoEvents::IN | IoEvents::OUT | IoEvents::RDNORM | IoEvents::WRNORM)
                    & node.events();
                if ready.is_empty() {
                    return Err(KError::WouldBlock);
                }
                node.report_ready(ready);
                Ok(())
            }
            InodeType::Stream | InodeType::Tty => Err(KError::Unsupported),
        }
    }

    fn tcgetwinsize(&self, _ctx: &IoContext) -> VfsResult<WinSize> {
        Err(default_tty_error(self.inode_type()))
    }

    fn tcsetpgrp(&self, _ctx: &IoContext, _pgid: i32) -> VfsResult<()> {
        Err(default_tty_error(self.inode_type()))
    }

    fn tcgetpgrp(&self, _ctx: &IoContext) -> VfsResult<i32> {
        Err(default_tty_error(self.inode_type()))
    }

    fn settermmode(&self, _ctx: &IoContext, _mode: u32) -> VfsResult<()> {
        Err(default_tty_error(self.inode_type()))
    }

    fn gettermmode(&self, _ctx: &IoContext) -> VfsResult<u32> {
        Err(default_tty_error(self.inode_type()))
    }

    fn accept(&self, _ctx: &IoContext) -> VfsResult<Arc<dyn Inode>> {
        Err(KError::NotASocket)
    }

    fn bind(&self, _ctx: &IoContext, _addr: &[u8]) -> VfsResult<()> {
        Err(KError::NotASocket)
    }

    fn connect(&self, _ctx: &IoContext, _addr: &[u8]) -> VfsResult<()> {
        Err(KError::NotASocket)
    }

    fn listen(&self, _ctx: &IoContext, _backlog: i32) -> VfsResult<()> {
        Err(KError::NotASocket)
    }

    fn recv(&self, _ctx: &IoContext, _buf: &mut [u8], _flags: i32) -> VfsResult<usize> {
        Err(KError::NotASocket)
    }

    fn send(&self, _ctx: &IoContext, _buf: &[u8], _flags: i32) -> VfsResult<usize> {
        Err(KError::NotASocket)
    }

    fn getsockopt(
        &self,
        _ctx: &IoContext,
        _level: i32,
        _name: i32,
        _value: &mut [u8],
    ) -> VfsResult<usize> {
        Err(KError::NotASocket)
    }

    fn setsockopt(&self, _ctx: &IoContext, _level: i32, _name: i32, _value: &[u8]) -> VfsResult<()> {
        Err(KError::NotASocket)
    }
}

impl_downcast!(sync Inode);

fn default_io_error(ty: InodeType) -> KError {
    match ty {
        InodeType::Dir => KError::IsADirectory,
        _ => KError::BadFileDescriptor,
    }
}

fn default_positional_error(ty: InodeType) -> KError {
    match ty {
        InodeType::File => KError::BadFileDescriptor,
        InodeType::Stream | InodeType::Tty => KError::IllegalSeek,
        InodeType::Dir => KError::IsADirectory,
    }
}

fn default_dir_error(ty: InodeType) -> KError {
    match ty {
        InodeType::Dir => KError::Unsupported,
        _ => KError::NotADirectory,
    }
}

fn default_tty_error(ty: InodeType) -> KError {
    match ty {
        InodeType::Tty => KError::Unsupported,
        _ => KError::NotATty,
    }
}
