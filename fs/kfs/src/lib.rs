// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 KylinSoft Co., Ltd. <https://www.kylinos.cn/>
// See LICENSES for license details.

//! Descriptors, descriptor tables and the filesystems the kernel carries
//! itself: an in-memory filesystem and anonymous pipes.
#![cfg_attr(not(test), no_std)]

extern crate alloc;

#[macro_use]
extern crate log;

mod descriptor;
mod dtable;
mod path_resolver;
pub mod pipe;
pub mod ramfs;
mod working_context;

mod test_path_resolver;
mod test_working_context;

pub use descriptor::Descriptor;
pub use dtable::{DescriptorTable, FdFlags};
pub use path_resolver::{PathResolver, SYMLOOP_MAX};
pub use working_context::WorkingContext;
