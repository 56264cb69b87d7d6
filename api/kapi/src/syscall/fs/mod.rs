//! File system related syscalls.
//!
//! This module implements various file system operations including:
//! - File I/O (read, write, pread, pwrite, lseek)
//! - Directory operations (mkdirat, unlinkat, symlinkat, chdir, etc.)
//! - File descriptor operations (open, close, dup, etc.)
//! - File control (fcntl) and metadata (fstat, isatty)
//! - Pipes

mod ctl;
mod dir;
mod fd_ops;
mod io;
mod pipe;
mod stat;

pub use self::{ctl::*, dir::*, fd_ops::*, io::*, pipe::*, stat::*};
