//! Shared setup for the system call tests

#![allow(unused)]

use kapi::{Kernel, KernelConfig, ThreadContext, syscall::*};
use kvfs::OpenFlags;

pub fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Boots a kernel with small pipes, so tests can fill them quickly.
pub fn boot() -> (Kernel, ThreadContext) {
    boot_with(KernelConfig::new().log_level("debug").pipe_capacity(64))
}

pub fn boot_with(config: KernelConfig) -> (Kernel, ThreadContext) {
    init_logger();
    let kernel = Kernel::boot(config).expect("Failed to boot kernel");
    let ctx = kernel.init_thread();
    (kernel, ctx)
}

pub fn bits(flags: OpenFlags) -> u32 {
    flags.bits()
}

/// Creates `path` with the given contents and returns it open read-write.
pub fn create_file(ctx: &ThreadContext, path: &str, contents: &[u8]) -> i32 {
    let flags = OpenFlags::READ | OpenFlags::WRITE | OpenFlags::CREATE;
    let fd = sys_open(ctx, path, bits(flags), 0o644).expect("Failed to create file") as i32;
    assert_eq!(
        sys_write(ctx, fd, contents).unwrap(),
        contents.len() as isize
    );
    assert_eq!(sys_lseek(ctx, fd, 0, 0).unwrap(), 0);
    fd
}

/// Returns the read and write ends of a new pipe.
pub fn make_pipe(ctx: &ThreadContext, flags: OpenFlags) -> (i32, i32) {
    let mut fds = [-1; 2];
    sys_pipe2(ctx, &mut fds, bits(flags)).expect("Failed to create pipe");
    (fds[0], fds[1])
}
