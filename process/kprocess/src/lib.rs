// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 KylinSoft Co., Ltd. <https://www.kylinos.cn/>
// See LICENSES for license details.

//! Process Management

#![cfg_attr(not(test), no_std)]
#![warn(missing_docs)]

extern crate alloc;

#[macro_use]
extern crate log;

mod process;
mod process_group;
mod resources;
mod table;


/// A process ID, also used as process group ID and thread ID.
pub type Pid = u32;

pub use process::{Process, WaitOptions, WaitSelector};
pub use process_group::ProcessGroup;
pub use resources::{ClockTimes, Credentials, RLIM_INFINITY, RLimit};
pub use table::ProcessTable;
