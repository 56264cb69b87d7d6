// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 KylinSoft Co., Ltd. <https://www.kylinos.cn/>
// See LICENSES for license details.

//! Kernel signal state and interruptible sleeping.
#![cfg_attr(not(test), no_std)]

#[macro_use]
extern crate log;
extern crate alloc;


mod thread;
pub use thread::*;

mod types;
pub use types::*;
