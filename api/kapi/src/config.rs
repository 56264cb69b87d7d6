// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 KylinSoft Co., Ltd. <https://www.kylinos.cn/>
// See LICENSES for license details.

//! Boot-time kernel configuration.

use alloc::string::{String, ToString};
use core::str::FromStr;

use kfs::SYMLOOP_MAX;

/// Environment variable holding the log level.
pub const ENV_LOG: &str = "KERNEL_LOG";
/// Environment variable holding the pipe buffer size in bytes.
pub const ENV_PIPE_CAPACITY: &str = "KERNEL_PIPE_CAPACITY";
/// Environment variable holding the symbolic link budget of one lookup.
pub const ENV_SYMLOOP_MAX: &str = "KERNEL_SYMLOOP_MAX";
/// Environment variable holding the initial `RLIMIT_NOFILE` soft limit.
pub const ENV_NOFILE: &str = "KERNEL_NOFILE";

const DEFAULT_PIPE_CAPACITY: usize = 64 * 1024;
const DEFAULT_MAX_OPEN_FILES: usize = 1024;

/// Tunables applied by [`Kernel::boot`](crate::Kernel::boot).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KernelConfig {
    /// Maximum log level, by name.
    pub log_level: String,
    /// Bytes a pipe buffers before writers block.
    pub pipe_capacity: usize,
    /// Symbolic links one path lookup may follow.
    pub symloop_max: usize,
    /// Soft `RLIMIT_NOFILE` of the init process.
    pub max_open_files: usize,
}

impl Default for KernelConfig {
    fn default() -> Self {
        Self {
            log_level: "warn".to_string(),
            pipe_capacity: DEFAULT_PIPE_CAPACITY,
            symloop_max: SYMLOOP_MAX,
            max_open_files: DEFAULT_MAX_OPEN_FILES,
        }
    }
}

impl KernelConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn log_level(mut self, level: &str) -> Self {
        self.log_level = level.to_string();
        self
    }

    pub fn pipe_capacity(mut self, bytes: usize) -> Self {
        self.pipe_capacity = bytes;
        self
    }

    pub fn symloop_max(mut self, links: usize) -> Self {
        self.symloop_max = links;
        self
    }

    pub fn max_open_files(mut self, files: usize) -> Self {
        self.max_open_files = files;
        self
    }

    /// Builds a configuration from the defaults overridden by whatever
    /// `lookup` returns for the `KERNEL_*` variables.
    ///
    /// Values that do not parse are ignored with a warning.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();
        if let Some(level) = lookup(ENV_LOG) {
            config.log_level = level;
        }
        override_with(&lookup, ENV_PIPE_CAPACITY, &mut config.pipe_capacity);
        override_with(&lookup, ENV_SYMLOOP_MAX, &mut config.symloop_max);
        override_with(&lookup, ENV_NOFILE, &mut config.max_open_files);
        config
    }

    /// Builds a configuration from the process environment.
    #[cfg(any(test, feature = "std"))]
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }
}

fn override_with<F, T>(lookup: &F, key: &str, slot: &mut T)
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    let Some(raw) = lookup(key) else {
        return;
    };
    match raw.trim().parse() {
        Ok(value) => *slot = value,
        Err(_) => warn!("ignoring {key}={raw:?}: not a number"),
    }
}
