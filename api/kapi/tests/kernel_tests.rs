// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 KylinSoft Co., Ltd. <https://www.kylinos.cn/>
// See LICENSES for license details.

//! Tests for kernel bootstrap and mounts

mod test_helpers;

use kapi::{AT_FDCWD, KernelConfig, syscall::*};
use kerrno::KError;
use kfs::ramfs::RamFs;
use kvfs::{Inode, OpenFlags, Stat};
use test_helpers::*;

fn fstat(ctx: &kapi::ThreadContext, fd: i32) -> Stat {
    let mut st = Stat::default();
    sys_fstat(ctx, fd, &mut st).unwrap();
    st
}

fn open_dir(ctx: &kapi::ThreadContext, path: &str) -> i32 {
    sys_open(ctx, path, bits(OpenFlags::READ | OpenFlags::DIRECTORY), 0).unwrap() as i32
}

#[test]
fn test_boot_applies_config() {
    let config = KernelConfig::new()
        .log_level("info")
        .pipe_capacity(128)
        .max_open_files(16);
    let (kernel, ctx) = boot_with(config.clone());
    assert_eq!(**kernel.config(), config);
    assert!(kernel.init().is_init());
    assert_eq!(kernel.processes().init().unwrap().pid(), 1);
    assert_eq!(ctx.process().fd_table().limit(), 16);

    let (_rfd, wfd) = make_pipe(&ctx, OpenFlags::NONBLOCK);
    let data = vec![1u8; 200];
    assert_eq!(sys_write(&ctx, wfd, &data).unwrap(), 128);
}

#[test]
fn test_config_from_lookup_env() {
    let config = KernelConfig::from_lookup(|key| match key {
        "KERNEL_PIPE_CAPACITY" => Some("256".into()),
        "KERNEL_NOFILE" => Some("not-a-number".into()),
        _ => None,
    });
    assert_eq!(config.pipe_capacity, 256);
    assert_eq!(config.max_open_files, 1024);
    assert_eq!(config.log_level, "warn");
}

#[test]
fn test_unknown_log_level_still_boots() {
    let (kernel, _ctx) = boot_with(KernelConfig::new().log_level("chatty"));
    assert_eq!(kernel.config().log_level, "chatty");
}

#[test]
fn test_mount_and_dotdot() {
    let (kernel, ctx) = boot();
    sys_mkdirat(&ctx, AT_FDCWD, "/mnt", 0o755).unwrap();
    let covered = fstat(&ctx, open_dir(&ctx, "/mnt"));

    let fs = RamFs::new(2);
    kernel.mount("/mnt", fs.root()).unwrap();
    create_file(&ctx, "/mnt/inside", b"on the mounted fs");

    let mnt = fstat(&ctx, open_dir(&ctx, "/mnt"));
    assert_eq!((mnt.ino, mnt.dev), (fs.root().ino(), 2));
    assert_ne!((mnt.ino, mnt.dev), (covered.ino, covered.dev));
    let file = sys_open(&ctx, "/mnt/inside", bits(OpenFlags::READ), 0).unwrap() as i32;
    assert_eq!(fstat(&ctx, file).dev, 2);

    // ".." at the mount root leaves the mounted filesystem.
    let root = fstat(&ctx, open_dir(&ctx, "/"));
    let up = fstat(&ctx, open_dir(&ctx, "/mnt/.."));
    assert_eq!((up.ino, up.dev), (root.ino, root.dev));
    sys_chdir(&ctx, "/mnt").unwrap();
    let up = fstat(&ctx, open_dir(&ctx, ".."));
    assert_eq!((up.ino, up.dev), (root.ino, root.dev));
}

#[test]
fn test_mount_errors() {
    let (kernel, ctx) = boot();
    create_file(&ctx, "/file", b"");
    let fs = RamFs::new(3);
    assert_eq!(
        kernel.mount("/file", fs.root()).err(),
        Some(KError::NotADirectory)
    );
    assert_eq!(
        kernel.mount("/absent", fs.root()).err(),
        Some(KError::NotFound)
    );
    assert_eq!(kernel.mount_table().len(), 0);
}
