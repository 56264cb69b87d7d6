// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 KylinSoft Co., Ltd. <https://www.kylinos.cn/>
// See LICENSES for license details.

//! System call layer of the process, descriptor and polling core.
//!
//! A [`Kernel`] is booted from a [`KernelConfig`]; every system call takes
//! the calling thread's [`ThreadContext`], which carries the current
//! process, the thread's signal state and its last error.
#![cfg_attr(not(any(test, feature = "std")), no_std)]

extern crate alloc;

#[macro_use]
extern crate log;

pub mod config;
mod kernel;
pub mod syscall;
mod thread;

pub use self::{config::KernelConfig, kernel::Kernel, thread::ThreadContext};

/// Special `dirfd` value meaning "relative to the current directory".
pub const AT_FDCWD: i32 = linux_raw_sys::general::AT_FDCWD;
