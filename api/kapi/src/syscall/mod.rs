//! System call implementations.
//!
//! Every call takes the calling thread's [`ThreadContext`] first and returns
//! `KResult<isize>`; [`ThreadContext::complete`] converts that into the raw
//! return value and the thread's errno.
//!
//! [`ThreadContext`]: crate::ThreadContext
//! [`ThreadContext::complete`]: crate::ThreadContext::complete

mod fs;
mod io_mpx;
mod task;

pub use self::{fs::*, io_mpx::*, task::*};
