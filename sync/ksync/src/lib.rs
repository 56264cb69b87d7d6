// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 KylinSoft Co., Ltd. <https://www.kylinos.cn/>
// See LICENSES for license details.

//! Locks and wait queues shared by the kernel crates.
//!
//! Data locks are spin mutexes. Sleeping is done on a [`WaitQueue`], which
//! plays the role of a condition variable: the waker changes the guarded
//! state, then notifies; the sleeper re-checks its condition after every
//! wakeup.

mod wait_queue;

pub use spin::{Mutex, MutexGuard, Once};
pub use wait_queue::WaitQueue;
