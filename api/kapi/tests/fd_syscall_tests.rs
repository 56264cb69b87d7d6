// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 KylinSoft Co., Ltd. <https://www.kylinos.cn/>
// See LICENSES for license details.

//! Tests for descriptor and filesystem system calls

mod test_helpers;

use kapi::{AT_FDCWD, syscall::*};
use kerrno::KError;
use kfs::FdFlags;
use kvfs::{NodeType, OpenFlags, Stat};
use linux_raw_sys::{
    errno::EBADF,
    general::{
        AT_REMOVEDIR, F_DUPFD, F_DUPFD_CLOEXEC, F_GETFD, F_GETFL, F_SETFD, F_SETFL, SEEK_END,
    },
};
use test_helpers::*;

// ========== Open / Read / Write ==========

#[test]
fn test_open_read_write() {
    let (_kernel, ctx) = boot();
    let fd = create_file(&ctx, "/hello.txt", b"hello world");
    assert_eq!(fd, 0);

    let mut buf = [0u8; 5];
    assert_eq!(sys_read(&ctx, fd, &mut buf).unwrap(), 5);
    assert_eq!(&buf, b"hello");
    assert_eq!(sys_pread64(&ctx, fd, &mut buf, 6).unwrap(), 5);
    assert_eq!(&buf, b"world");
    // pread left the offset alone.
    assert_eq!(sys_read(&ctx, fd, &mut buf[..1]).unwrap(), 1);
    assert_eq!(buf[0], b' ');

    assert_eq!(sys_pwrite64(&ctx, fd, b"W", 6).unwrap(), 1);
    assert_eq!(sys_lseek(&ctx, fd, 0, SEEK_END as i32).unwrap(), 11);
    assert_eq!(sys_pread64(&ctx, fd, &mut buf, 6).unwrap(), 5);
    assert_eq!(&buf, b"World");
}

#[test]
fn test_open_errors() {
    let (_kernel, ctx) = boot();
    let read = bits(OpenFlags::READ);
    assert_eq!(sys_open(&ctx, "/missing", read, 0).err(), Some(KError::NotFound));
    assert_eq!(
        sys_open(&ctx, "/", bits(OpenFlags::WRITE), 0).err(),
        Some(KError::IsADirectory)
    );
    assert_eq!(
        sys_open(&ctx, "/x", 1 << 31, 0).err(),
        Some(KError::InvalidInput)
    );
    assert_eq!(
        sys_read(&ctx, 9, &mut [0u8; 1]).err(),
        Some(KError::BadFileDescriptor)
    );
}

#[test]
fn test_openat_relative_to_directory() {
    let (_kernel, ctx) = boot();
    sys_mkdirat(&ctx, AT_FDCWD, "etc", 0o755).unwrap();
    let dirfd = sys_open(&ctx, "/etc", bits(OpenFlags::READ | OpenFlags::DIRECTORY), 0).unwrap() as i32;
    let flags = OpenFlags::READ | OpenFlags::WRITE | OpenFlags::CREATE;
    let fd = sys_openat(&ctx, dirfd, "passwd", bits(flags), 0o600).unwrap() as i32;
    sys_write(&ctx, fd, b"root").unwrap();

    let again = sys_open(&ctx, "/etc/passwd", bits(OpenFlags::READ), 0).unwrap() as i32;
    let mut buf = [0u8; 8];
    assert_eq!(sys_read(&ctx, again, &mut buf).unwrap(), 4);

    // A file is not a directory to resolve against.
    assert_eq!(
        sys_openat(&ctx, fd, "x", bits(OpenFlags::READ), 0).err(),
        Some(KError::NotADirectory)
    );
}

#[test]
fn test_fstat_and_isatty() {
    let (_kernel, ctx) = boot();
    let fd = create_file(&ctx, "/f", b"12345");
    let mut st = Stat::default();
    sys_fstat(&ctx, fd, &mut st).unwrap();
    assert_eq!(st.size, 5);
    assert_eq!(NodeType::from_mode(st.mode), NodeType::RegularFile);

    assert_eq!(sys_isatty(&ctx, fd).err(), Some(KError::NotATty));
    assert_eq!(ctx.complete(sys_isatty(&ctx, 77)), -1);
    assert_eq!(ctx.last_error(), EBADF as i32);
}

// ========== Duplication ==========

#[test]
fn test_dup_family() {
    let (_kernel, ctx) = boot();
    let fd = create_file(&ctx, "/f", b"abcdef");
    let dup = sys_dup(&ctx, fd).unwrap() as i32;
    assert_eq!(dup, 1);

    // Duplicates share the offset.
    let mut buf = [0u8; 2];
    sys_read(&ctx, fd, &mut buf).unwrap();
    sys_read(&ctx, dup, &mut buf).unwrap();
    assert_eq!(&buf, b"cd");

    assert_eq!(sys_dup2(&ctx, fd, 7).unwrap(), 7);
    assert_eq!(sys_dup2(&ctx, fd, fd).unwrap(), fd as isize);
    assert_eq!(sys_dup2(&ctx, 5, 5).err(), Some(KError::BadFileDescriptor));

    let cloexec = bits(OpenFlags::CLOEXEC);
    assert_eq!(sys_dup3(&ctx, fd, fd, cloexec).err(), Some(KError::InvalidInput));
    assert_eq!(
        sys_dup3(&ctx, fd, 4, bits(OpenFlags::APPEND)).err(),
        Some(KError::InvalidInput)
    );
    assert_eq!(sys_dup3(&ctx, fd, 4, cloexec).unwrap(), 4);
    assert_eq!(sys_fcntl(&ctx, 4, F_GETFD, 0).unwrap(), FdFlags::CLOEXEC.bits() as isize);
}

#[test]
fn test_dup2_replaces_open_descriptor() {
    let (_kernel, ctx) = boot();
    let a = create_file(&ctx, "/a", b"aaaa");
    let b = create_file(&ctx, "/b", b"bbbb");
    assert_eq!(sys_dup2(&ctx, a, b).unwrap(), b as isize);
    let mut buf = [0u8; 4];
    sys_read(&ctx, b, &mut buf).unwrap();
    assert_eq!(&buf, b"aaaa");
}

#[test]
fn test_fcntl() {
    let (_kernel, ctx) = boot();
    let fd = create_file(&ctx, "/f", b"");

    assert_eq!(sys_fcntl(&ctx, fd, F_DUPFD, 10).unwrap(), 10);
    assert_eq!(sys_fcntl(&ctx, fd, F_DUPFD_CLOEXEC, 10).unwrap(), 11);
    assert_eq!(sys_fcntl(&ctx, 11, F_GETFD, 0).unwrap(), 1);
    assert_eq!(sys_fcntl(&ctx, fd, F_DUPFD_CLOFORK, 0).unwrap(), 1);
    assert_eq!(sys_fcntl(&ctx, 1, F_GETFD, 0).unwrap(), 2);

    sys_fcntl(&ctx, fd, F_SETFD, 3).unwrap();
    assert_eq!(sys_fcntl(&ctx, fd, F_GETFD, 0).unwrap(), 3);
    assert_eq!(sys_fcntl(&ctx, fd, F_SETFD, 8).err(), Some(KError::InvalidInput));

    // Only APPEND and NONBLOCK change; the access mode stays.
    let rw = OpenFlags::READ | OpenFlags::WRITE;
    assert_eq!(sys_fcntl(&ctx, fd, F_GETFL, 0).unwrap(), rw.bits() as isize);
    let new = OpenFlags::READ | OpenFlags::APPEND | OpenFlags::NONBLOCK;
    sys_fcntl(&ctx, fd, F_SETFL, new.bits() as usize).unwrap();
    assert_eq!(
        sys_fcntl(&ctx, fd, F_GETFL, 0).unwrap(),
        (rw | OpenFlags::APPEND | OpenFlags::NONBLOCK).bits() as isize
    );

    assert_eq!(sys_fcntl(&ctx, fd, 9999, 0).err(), Some(KError::InvalidInput));
    assert_eq!(sys_fcntl(&ctx, 50, F_GETFL, 0).err(), Some(KError::BadFileDescriptor));
}

#[test]
fn test_close_and_closefrom() {
    let (_kernel, ctx) = boot();
    let fd = create_file(&ctx, "/f", b"");
    for _ in 0..4 {
        sys_dup(&ctx, fd).unwrap();
    }
    sys_close(&ctx, 2).unwrap();
    assert_eq!(sys_close(&ctx, 2).err(), Some(KError::BadFileDescriptor));
    assert_eq!(sys_dup(&ctx, fd).unwrap(), 2);

    sys_closefrom(&ctx, 1).unwrap();
    assert_eq!(ctx.process().fd_table().next_used(1), None);
    assert!(ctx.process().fd_table().get(0).is_ok());
    assert_eq!(sys_closefrom(&ctx, -1).err(), Some(KError::BadFileDescriptor));
}

// ========== Pipes ==========

#[test]
fn test_pipe2() {
    let (_kernel, ctx) = boot();
    let (rfd, wfd) = make_pipe(&ctx, OpenFlags::CLOEXEC);
    assert_eq!((rfd, wfd), (0, 1));
    assert_eq!(sys_fcntl(&ctx, rfd, F_GETFD, 0).unwrap(), 1);
    assert_eq!(sys_write(&ctx, rfd, b"x").err(), Some(KError::BadFileDescriptor));
    assert_eq!(sys_lseek(&ctx, rfd, 0, 0).err(), Some(KError::IllegalSeek));

    sys_write(&ctx, wfd, b"data").unwrap();
    let mut buf = [0u8; 16];
    assert_eq!(sys_read(&ctx, rfd, &mut buf).unwrap(), 4);

    let mut fds = [0; 2];
    assert_eq!(
        sys_pipe2(&ctx, &mut fds, bits(OpenFlags::APPEND)).err(),
        Some(KError::InvalidInput)
    );
}

#[test]
fn test_nonblocking_pipe() {
    let (kernel, ctx) = boot();
    let (rfd, wfd) = make_pipe(&ctx, OpenFlags::NONBLOCK);
    let mut buf = [0u8; 4];
    assert_eq!(sys_read(&ctx, rfd, &mut buf).err(), Some(KError::WouldBlock));

    let fill = vec![0u8; kernel.config().pipe_capacity];
    assert_eq!(sys_write(&ctx, wfd, &fill).unwrap(), fill.len() as isize);
    assert_eq!(sys_write(&ctx, wfd, b"x").err(), Some(KError::WouldBlock));

    sys_close(&ctx, rfd).unwrap();
    assert_eq!(sys_write(&ctx, wfd, b"x").err(), Some(KError::BrokenPipe));
}

#[test]
fn test_pipe_eof() {
    let (_kernel, ctx) = boot();
    let (rfd, wfd) = make_pipe(&ctx, OpenFlags::empty());
    sys_write(&ctx, wfd, b"end").unwrap();
    sys_close(&ctx, wfd).unwrap();
    let mut buf = [0u8; 8];
    assert_eq!(sys_read(&ctx, rfd, &mut buf).unwrap(), 3);
    assert_eq!(sys_read(&ctx, rfd, &mut buf).unwrap(), 0);
}

// ========== Directories ==========

#[test]
fn test_directory_syscalls() {
    let (_kernel, ctx) = boot();
    sys_mkdirat(&ctx, AT_FDCWD, "/home", 0o755).unwrap();
    sys_mkdirat(&ctx, AT_FDCWD, "/home/user", 0o700).unwrap();
    assert_eq!(
        sys_mkdirat(&ctx, AT_FDCWD, "/home", 0o755).err(),
        Some(KError::AlreadyExists)
    );

    sys_chdir(&ctx, "/home/user").unwrap();
    create_file(&ctx, "notes", b"n");
    sys_symlinkat(&ctx, "notes", AT_FDCWD, "link").unwrap();

    let mut buf = [0u8; 32];
    let len = sys_readlinkat(&ctx, AT_FDCWD, "/home/user/link", &mut buf).unwrap() as usize;
    assert_eq!(&buf[..len], b"notes");
    let mut short = [0u8; 3];
    assert_eq!(sys_readlinkat(&ctx, AT_FDCWD, "link", &mut short).unwrap(), 3);
    assert_eq!(&short, b"not");
    assert_eq!(
        sys_readlinkat(&ctx, AT_FDCWD, "notes", &mut buf).err(),
        Some(KError::InvalidInput)
    );

    // Following the link reaches the file.
    let fd = sys_open(&ctx, "link", bits(OpenFlags::READ), 0).unwrap() as i32;
    assert_eq!(sys_read(&ctx, fd, &mut buf).unwrap(), 1);

    sys_unlinkat(&ctx, AT_FDCWD, "link", 0).unwrap();
    sys_unlinkat(&ctx, AT_FDCWD, "notes", 0).unwrap();
    sys_chdir(&ctx, "/").unwrap();
    assert_eq!(
        sys_unlinkat(&ctx, AT_FDCWD, "home/user", 0).err(),
        Some(KError::IsADirectory)
    );
    sys_unlinkat(&ctx, AT_FDCWD, "home/user", AT_REMOVEDIR).unwrap();
    assert_eq!(
        sys_unlinkat(&ctx, AT_FDCWD, "home", 0x1).err(),
        Some(KError::InvalidInput)
    );
}

#[test]
fn test_fchdir() {
    let (_kernel, ctx) = boot();
    sys_mkdirat(&ctx, AT_FDCWD, "/tmp", 0o777).unwrap();
    let dirfd = sys_open(&ctx, "/tmp", bits(OpenFlags::READ), 0).unwrap() as i32;
    sys_fchdir(&ctx, dirfd).unwrap();
    create_file(&ctx, "scratch", b"");
    assert!(sys_open(&ctx, "/tmp/scratch", bits(OpenFlags::READ), 0).is_ok());

    let file = sys_open(&ctx, "/tmp/scratch", bits(OpenFlags::READ), 0).unwrap() as i32;
    assert_eq!(sys_fchdir(&ctx, file).err(), Some(KError::NotADirectory));
    assert_eq!(sys_chdir(&ctx, "/nowhere").err(), Some(KError::NotFound));
}

#[test]
fn test_symlink_loop() {
    let (_kernel, ctx) = boot_with(kapi::KernelConfig::new().symloop_max(4));
    sys_symlinkat(&ctx, "b", AT_FDCWD, "/a").unwrap();
    sys_symlinkat(&ctx, "a", AT_FDCWD, "/b").unwrap();
    assert_eq!(
        sys_open(&ctx, "/a", bits(OpenFlags::READ), 0).err(),
        Some(KError::FilesystemLoop)
    );
}
