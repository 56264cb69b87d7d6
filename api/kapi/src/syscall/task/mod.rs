//! Task and process management syscalls.
//!
//! This module implements process management operations including:
//! - Process creation (fork)
//! - Process termination (exit, kill)
//! - Process control (waitpid)
//! - Process identity (getpid, getppid)
//! - Job control and process groups (getpgid, setpgid)
//! - Resource limits and accounting (getrlimit, setrlimit, times)

mod clone;
mod ctl;
mod exit;
mod job;
mod resource;
mod signal;
mod wait;

pub use self::{clone::*, ctl::*, exit::*, job::*, resource::*, signal::*, wait::*};
