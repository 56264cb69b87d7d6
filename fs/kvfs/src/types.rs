// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 KylinSoft Co., Ltd. <https://www.kylinos.cn/>
// See LICENSES for license details.

use alloc::string::String;

use bitflags::bitflags;
use linux_raw_sys::general::S_IFMT;

/// Longest file name a directory entry may carry.
pub const NAME_MAX: usize = 255;

/// Largest file offset.
pub const OFF_MAX: i64 = i64::MAX;

pub const SEEK_SET: i32 = 0;
pub const SEEK_CUR: i32 = 1;
pub const SEEK_END: i32 = 2;

/// Selects the default behavior of every [`Inode`](crate::Inode) operation
/// a backend does not implement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InodeType {
    /// Seekable data: regular files and block devices.
    File,
    /// Unseekable byte streams: pipes and character devices.
    Stream,
    /// Terminals.
    Tty,
    Dir,
}

/// Node type, as stored in the `S_IFMT` bits of a mode.
///
/// The values are also the `d_type` values of directory entries.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeType {
    Unknown = 0,
    Fifo = 0o1,
    CharacterDevice = 0o2,
    Directory = 0o4,
    BlockDevice = 0o6,
    RegularFile = 0o10,
    Symlink = 0o12,
    Socket = 0o14,
}

impl From<u8> for NodeType {
    fn from(value: u8) -> Self {
        match value {
            0o1 => Self::Fifo,
            0o2 => Self::CharacterDevice,
            0o4 => Self::Directory,
            0o6 => Self::BlockDevice,
            0o10 => Self::RegularFile,
            0o12 => Self::Symlink,
            0o14 => Self::Socket,
            _ => Self::Unknown,
        }
    }
}

impl NodeType {
    /// Extracts the node type from a full mode.
    pub fn from_mode(mode: u32) -> Self {
        Self::from(((mode & S_IFMT) >> 12) as u8)
    }

    /// The `S_IFMT` bits for this type.
    pub const fn as_mode(self) -> u32 {
        (self as u32) << 12
    }
}

bitflags! {
    /// Permission bits of a mode.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct NodePermission: u16 {
        const OTHER_EXEC  = 0o1;
        const OTHER_WRITE = 0o2;
        const OTHER_READ  = 0o4;
        const GROUP_EXEC  = 0o10;
        const GROUP_WRITE = 0o20;
        const GROUP_READ  = 0o40;
        const OWNER_EXEC  = 0o100;
        const OWNER_WRITE = 0o200;
        const OWNER_READ  = 0o400;
        const STICKY      = 0o1000;
        const SET_GID     = 0o2000;
        const SET_UID     = 0o4000;
    }
}

impl Default for NodePermission {
    fn default() -> Self {
        Self::from_bits_truncate(0o666)
    }
}

impl NodePermission {
    /// Takes the permission bits of a full mode, dropping the type bits.
    pub fn from_mode(mode: u32) -> Self {
        Self::from_bits_truncate((mode & 0o7777) as u16)
    }
}

bitflags! {
    /// Descriptor status flags and open flags.
    ///
    /// The low bits are the status flags kept on a descriptor; the rest only
    /// steer `open`.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct OpenFlags: u32 {
        const READ      = 1 << 0;
        const WRITE     = 1 << 1;
        const EXEC      = 1 << 2;
        const APPEND    = 1 << 3;
        const CLOEXEC   = 1 << 4;
        const CREATE    = 1 << 5;
        const DIRECTORY = 1 << 6;
        const EXCL      = 1 << 7;
        const TRUNC     = 1 << 8;
        const CLOFORK   = 1 << 9;
        const SEARCH    = 1 << 10;
        const NONBLOCK  = 1 << 11;
        const NOFOLLOW  = 1 << 12;
    }
}

impl OpenFlags {
    /// Flags a descriptor keeps after it is opened.
    pub const STATUS: Self = Self::READ
        .union(Self::WRITE)
        .union(Self::EXEC)
        .union(Self::APPEND)
        .union(Self::SEARCH)
        .union(Self::NONBLOCK);

    /// Status flags `F_SETFL` may change.
    pub const SETTABLE: Self = Self::APPEND.union(Self::NONBLOCK);

    pub fn is_readable(self) -> bool {
        self.contains(Self::READ)
    }

    pub fn is_writable(self) -> bool {
        self.contains(Self::WRITE)
    }
}

/// A time value, laid out as `struct timespec`.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, PartialOrd, Ord)]
pub struct TimeSpec {
    pub tv_sec: i64,
    pub tv_nsec: i64,
}

impl TimeSpec {
    pub const ZERO: Self = Self::new(0, 0);

    pub const fn new(tv_sec: i64, tv_nsec: i64) -> Self {
        Self { tv_sec, tv_nsec }
    }

    /// Whether `tv_nsec` lies in `[0, 1e9)`.
    pub const fn is_valid(&self) -> bool {
        self.tv_nsec >= 0 && self.tv_nsec < 1_000_000_000
    }

    /// Adds two times, normalizing nanoseconds and saturating on overflow.
    pub fn saturating_add(self, other: Self) -> Self {
        let mut sec = self.tv_sec.saturating_add(other.tv_sec);
        let mut nsec = self.tv_nsec + other.tv_nsec;
        if nsec >= 1_000_000_000 {
            nsec -= 1_000_000_000;
            sec = sec.saturating_add(1);
        }
        Self::new(sec, nsec)
    }
}

/// Attributes of a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Stat {
    pub ino: u64,
    pub dev: u64,
    pub mode: u32,
    pub nlink: u32,
    pub uid: u32,
    pub gid: u32,
    pub rdev: u64,
    pub size: i64,
    pub blksize: i64,
    pub blocks: i64,
    pub atime: TimeSpec,
    pub mtime: TimeSpec,
    pub ctime: TimeSpec,
}

/// Filesystem statistics returned by `statvfs`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StatVfs {
    /// Fundamental block size (bytes).
    pub block_size: u64,
    pub blocks: u64,
    pub blocks_free: u64,
    pub files: u64,
    pub files_free: u64,
    pub fsid: u64,
    pub flags: u64,
    /// Maximum filename length.
    pub name_max: u64,
}

/// One entry returned by `readdirents`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirEntry {
    pub ino: u64,
    pub node_type: NodeType,
    pub name: String,
}

/// Terminal window size, laid out as `struct winsize`.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct WinSize {
    pub ws_row: u16,
    pub ws_col: u16,
    pub ws_xpixel: u16,
    pub ws_ypixel: u16,
}
