// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 KylinSoft Co., Ltd. <https://www.kylinos.cn/>
// See LICENSES for license details.

//! Tests for process system calls

mod test_helpers;

use std::{sync::Arc, thread, time::Duration};

use kapi::{ThreadContext, syscall::*};
use kerrno::KError;
use kprocess::{Credentials, RLimit};
use ksignal::Signo;
use kvfs::OpenFlags;
use linux_raw_sys::{
    errno::ECHILD,
    general::{RLIMIT_NOFILE, WNOHANG},
};
use test_helpers::*;

fn fork(ctx: &ThreadContext) -> ThreadContext {
    let pid = sys_fork(ctx).unwrap();
    let child = ctx.process().table().get(pid as u32).unwrap();
    ThreadContext::main(ctx.config().clone(), child)
}

// ========== Fork / Exit / Wait ==========

#[test]
fn test_fork_exit_wait() {
    let (_kernel, ctx) = boot();
    assert_eq!(sys_getpid(&ctx).unwrap(), 1);
    assert_eq!(sys_getppid(&ctx).unwrap(), 0);

    let child = fork(&ctx);
    let child_pid = sys_getpid(&child).unwrap();
    assert_eq!(child_pid, 2);
    assert_eq!(sys_getppid(&child).unwrap(), 1);
    assert_eq!(sys_gettid(&child).unwrap(), child_pid);

    assert_eq!(sys_waitpid(&ctx, -1, None, WNOHANG).unwrap(), 0);
    sys_exit(&child, 42).unwrap();

    let mut status = 0;
    assert_eq!(sys_waitpid(&ctx, -1, Some(&mut status), 0).unwrap(), child_pid);
    assert_eq!(status, 42 << 8);
    assert_eq!(ctx.complete(sys_waitpid(&ctx, -1, None, 0)), -1);
    assert_eq!(ctx.last_error(), ECHILD as i32);
    assert_eq!(sys_waitpid(&ctx, -1, None, 0x8000).err(), Some(KError::InvalidInput));
}

#[test]
fn test_wait_blocks_until_exit() {
    let (_kernel, ctx) = boot();
    let child = fork(&ctx);
    let child_pid = sys_getpid(&child).unwrap();
    let handle = thread::spawn(move || {
        thread::sleep(Duration::from_millis(50));
        sys_exit(&child, 3).unwrap();
    });

    let mut status = 0;
    assert_eq!(
        sys_waitpid(&ctx, child_pid as i32, Some(&mut status), 0).unwrap(),
        child_pid
    );
    assert_eq!(status, 3 << 8);
    handle.join().unwrap();
}

#[test]
fn test_orphans_go_to_init() {
    let (_kernel, ctx) = boot();
    let parent = fork(&ctx);
    let grandchild = fork(&parent);
    let grandchild_pid = sys_getpid(&grandchild).unwrap();

    sys_exit(&parent, 0).unwrap();
    assert_eq!(sys_getppid(&grandchild).unwrap(), 1);
    sys_exit(&grandchild, 9).unwrap();

    let mut reaped = Vec::new();
    loop {
        match sys_waitpid(&ctx, -1, None, WNOHANG) {
            Ok(0) | Err(_) => break,
            Ok(pid) => reaped.push(pid),
        }
    }
    reaped.sort();
    assert_eq!(reaped, [2, grandchild_pid]);
}

#[test]
fn test_fork_copies_descriptors() {
    let (_kernel, ctx) = boot();
    let fd = create_file(&ctx, "/shared", b"0123456789");
    let (rfd, _wfd) = make_pipe(&ctx, OpenFlags::CLOFORK);

    let child = fork(&ctx);
    let mut buf = [0u8; 4];
    sys_read(&child, fd, &mut buf).unwrap();
    // The table is copied but the descriptor, and its offset, are shared.
    sys_read(&ctx, fd, &mut buf).unwrap();
    assert_eq!(&buf, b"4567");
    assert_eq!(
        sys_read(&child, rfd, &mut buf).err(),
        Some(KError::BadFileDescriptor)
    );

    sys_close(&child, fd).unwrap();
    assert!(sys_read(&ctx, fd, &mut buf).is_ok());
}

// ========== Process Groups ==========

#[test]
fn test_process_groups() {
    let (_kernel, ctx) = boot();
    let a = fork(&ctx);
    let b = fork(&ctx);
    let a_pid = sys_getpid(&a).unwrap() as i32;
    let b_pid = sys_getpid(&b).unwrap() as i32;
    assert_eq!(sys_getpgid(&a, 0).unwrap(), 1);

    sys_setpgid(&a, 0, 0).unwrap();
    assert_eq!(sys_getpgid(&ctx, a_pid).unwrap(), a_pid as isize);
    // The parent may move a child into an existing group.
    sys_setpgid(&ctx, b_pid, a_pid).unwrap();
    assert_eq!(sys_getpgid(&b, 0).unwrap(), a_pid as isize);

    assert_eq!(sys_setpgid(&ctx, b_pid, 999).err(), Some(KError::OperationNotPermitted));
    assert_eq!(sys_setpgid(&a, b_pid, 0).err(), Some(KError::NoSuchProcess));
    assert_eq!(sys_setpgid(&a, 0, -2).err(), Some(KError::InvalidInput));
    assert_eq!(sys_getpgid(&ctx, 999).err(), Some(KError::NoSuchProcess));

    // Waiting on the group reaps its members only.
    sys_exit(&a, 1).unwrap();
    sys_exit(&b, 2).unwrap();
    let mut reaped = vec![
        sys_waitpid(&ctx, -a_pid, None, 0).unwrap(),
        sys_waitpid(&ctx, -a_pid, None, 0).unwrap(),
    ];
    reaped.sort();
    assert_eq!(reaped, [a_pid as isize, b_pid as isize]);
}

// ========== Signals ==========

#[test]
fn test_kill() {
    let (_kernel, ctx) = boot();
    let child = fork(&ctx);
    let pid = sys_getpid(&child).unwrap() as i32;

    sys_kill(&ctx, pid, 0).unwrap();
    sys_kill(&ctx, pid, Signo::SIGTERM as u32).unwrap();
    assert!(child.signals().pending().has(Signo::SIGTERM));

    sys_kill(&ctx, 0, Signo::SIGUSR2 as u32).unwrap();
    assert!(ctx.signals().pending().has(Signo::SIGUSR2));
    assert!(child.signals().pending().has(Signo::SIGUSR2));

    assert_eq!(sys_kill(&ctx, pid, 200).err(), Some(KError::InvalidInput));
    assert_eq!(sys_kill(&ctx, 4242, 0).err(), Some(KError::NoSuchProcess));

    child.process().set_credentials(Credentials::new(1000, 1000));
    assert_eq!(
        sys_kill(&child, 1, Signo::SIGTERM as u32).err(),
        Some(KError::OperationNotPermitted)
    );
    assert!(!ctx.signals().pending().has(Signo::SIGTERM));
}

#[test]
fn test_kill_wakes_blocked_wait() {
    let (_kernel, ctx) = boot();
    let _child = fork(&ctx);
    let sender = ctx.spawn();
    let handle = thread::spawn(move || {
        thread::sleep(Duration::from_millis(50));
        sys_kill(&sender, 1, Signo::SIGINT as u32).unwrap();
    });
    assert_eq!(sys_waitpid(&ctx, -1, None, 0).err(), Some(KError::Interrupted));
    handle.join().unwrap();
}

// ========== Resources ==========

#[test]
fn test_rlimits() {
    let (_kernel, ctx) = boot_with(kapi::KernelConfig::new().max_open_files(3));
    let mut rlim = RLimit::default();
    sys_getrlimit(&ctx, RLIMIT_NOFILE, &mut rlim).unwrap();
    assert_eq!(rlim.cur, 3);

    create_file(&ctx, "/a", b"");
    make_pipe(&ctx, OpenFlags::empty());
    assert_eq!(
        sys_open(&ctx, "/a", bits(OpenFlags::READ), 0).err(),
        Some(KError::TooManyOpenFiles)
    );

    sys_setrlimit(&ctx, RLIMIT_NOFILE, &RLimit::new(8, rlim.max)).unwrap();
    assert!(sys_open(&ctx, "/a", bits(OpenFlags::READ), 0).is_ok());
    assert_eq!(
        sys_setrlimit(&ctx, RLIMIT_NOFILE, &RLimit::new(9, 8)).err(),
        Some(KError::InvalidInput)
    );
    assert_eq!(sys_getrlimit(&ctx, 99, &mut rlim).err(), Some(KError::InvalidInput));
}

#[test]
fn test_times() {
    let (_kernel, ctx) = boot();
    let child = fork(&ctx);
    child.process().add_time(30_000_000, 10_000_000);
    ctx.process().add_time(20_000_000, 0);
    sys_exit(&child, 0).unwrap();
    sys_waitpid(&ctx, -1, None, 0).unwrap();

    let mut tms = Tms::default();
    sys_times(&ctx, &mut tms).unwrap();
    assert_eq!(tms.tms_utime, 2);
    assert_eq!(tms.tms_stime, 0);
    assert_eq!(tms.tms_cutime, 3);
    assert_eq!(tms.tms_cstime, 1);
}

#[test]
fn test_thread_contexts() {
    let (_kernel, ctx) = boot();
    let second = ctx.spawn();
    assert_ne!(second.tid(), ctx.tid());
    assert!(Arc::ptr_eq(second.process(), ctx.process()));
    assert_eq!(ctx.process().threads().len(), 2);
    drop(second);
    assert_eq!(ctx.process().threads(), [1]);
}
