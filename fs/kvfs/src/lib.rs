// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 KylinSoft Co., Ltd. <https://www.kylinos.cn/>
// See LICENSES for license details.

//! Inode and vnode interfaces.
//!
//! An [`Inode`] is a filesystem object supplied by a backend. A [`Vnode`]
//! wraps an inode with its position in the mount tree, so that lookups cross
//! mount points in both directions. Every operation takes an [`IoContext`]
//! describing the caller.
#![cfg_attr(not(test), no_std)]

#[macro_use]
extern crate log;
extern crate alloc;

mod inode;
mod ioctx;
mod mount;
mod types;
mod vnode;

mod test_inode;
mod test_vnode;

pub use inode::*;
pub use ioctx::*;
pub use mount::*;
pub use types::*;
pub use vnode::*;

pub type VfsError = kerrno::KError;
pub type VfsResult<T> = Result<T, VfsError>;
