// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 KylinSoft Co., Ltd. <https://www.kylinos.cn/>
// See LICENSES for license details.

//! Unit tests for PathResolver

#![cfg(test)]


use std::time::{Duration, Instant};

use kerrno::KError;
use kfs::{PathResolver, ramfs::RamFs};
use kvfs::{NodeType, OpenFlags, Vnode};
use test_helpers::*;

// ========== Basic Path Resolution Tests ==========

#[test]
fn test_resolve_absolute_path() {
    let (_fs, root) = setup_test_fs();
    let resolver = PathResolver::new();
    let cwd = root.open(&ctx(), "a", OpenFlags::READ, 0).unwrap();

    let loc = resolver
        .resolve(&ctx(), &root, &cwd, "/short.txt", true)
        .expect("Failed to resolve /short.txt");
    assert_eq!(loc.node_type(), NodeType::RegularFile);
    assert_eq!(loc.stat(&ctx()).unwrap().size, 5);
}

#[test]
fn test_resolve_relative_path() {
    let (_fs, root) = setup_test_fs();
    let resolver = PathResolver::new();
    let cwd = root.open(&ctx(), "a", OpenFlags::READ, 0).unwrap();

    let loc = resolver
        .resolve(&ctx(), &root, &cwd, "file.txt", true)
        .expect("Failed to resolve relative path");
    assert_eq!(loc.stat(&ctx()).unwrap().size, 8);
}

#[test]
fn test_resolve_root_path() {
    let (_fs, root) = setup_test_fs();
    let loc = PathResolver::new()
        .resolve(&ctx(), &root, &root, "/", true)
        .unwrap();
    assert_eq!(loc.ino, root.ino);
}

// ========== Symlink Tests ==========

#[test]
fn test_resolve_symlink() {
    let (_fs, root) = setup_test_fs_with_symlinks();
    let resolver = PathResolver::new();
    let target = resolver
        .resolve(&ctx(), &root, &root, "short.txt", true)
        .unwrap();

    let loc = resolver.resolve(&ctx(), &root, &root, "/link", true).unwrap();
    assert_eq!(loc.ino, target.ino);

    let loc = resolver
        .resolve(&ctx(), &root, &root, "/abs_link", true)
        .unwrap();
    assert_eq!(loc.stat(&ctx()).unwrap().size, 8);

    let loc = resolver
        .resolve(&ctx(), &root, &root, "link_to_dir/b", true)
        .unwrap();
    assert!(loc.is_dir());
}

#[test]
fn test_symlink_loop_detection() {
    let (_fs, root) = setup_circular_symlinks();
    let resolver = PathResolver::with_symloop_max(5);

    let result = resolver.resolve(&ctx(), &root, &root, "/loop1", true);
    assert_eq!(result.err(), Some(KError::FilesystemLoop));
}

#[test]
fn test_symlink_chain_within_limit() {
    let (_fs, root) = setup_test_fs();
    let ctx = ctx();
    root.symlink(&ctx, "short.txt", "l0").unwrap();
    for i in 1..5 {
        root.symlink(&ctx, &format!("l{}", i - 1), &format!("l{i}"))
            .unwrap();
    }
    assert!(
        PathResolver::with_symloop_max(5)
            .resolve(&ctx, &root, &root, "l4", true)
            .is_ok()
    );
    assert_eq!(
        PathResolver::with_symloop_max(4)
            .resolve(&ctx, &root, &root, "l4", true)
            .err(),
        Some(KError::FilesystemLoop)
    );
}

#[test]
fn test_resolve_no_follow() {
    let (_fs, root) = setup_test_fs_with_symlinks();
    let loc = PathResolver::new()
        .resolve(&ctx(), &root, &root, "/link", false)
        .unwrap();
    assert_eq!(loc.node_type(), NodeType::Symlink);
    assert_eq!(loc.readlink(&ctx()).unwrap(), "short.txt");
}

#[test]
fn test_open_nofollow_fails_on_symlink() {
    let (_fs, root) = setup_test_fs_with_symlinks();
    let result = PathResolver::new().open(
        &ctx(),
        &root,
        &root,
        "link",
        OpenFlags::READ | OpenFlags::NOFOLLOW,
        0,
    );
    assert!(matches!(result, Err(KError::FilesystemLoop)));
}

// ========== Path Component Tests ==========

#[test]
fn test_resolve_dot_components() {
    let (_fs, root) = setup_test_fs();
    let resolver = PathResolver::new();

    let loc = resolver
        .resolve(&ctx(), &root, &root, "/a/b/../file.txt", true)
        .expect("Failed to resolve path with .. component");
    assert_eq!(loc.node_type(), NodeType::RegularFile);

    let loc = resolver
        .resolve(&ctx(), &root, &root, "/./a/./file.txt", true)
        .unwrap();
    assert_eq!(loc.node_type(), NodeType::RegularFile);
}

#[test]
fn test_dotdot_stops_at_root() {
    let (_fs, root) = setup_test_fs();
    let resolver = PathResolver::new();
    let loc = resolver
        .resolve(&ctx(), &root, &root, "../../a/../..", true)
        .unwrap();
    assert_eq!(loc.ino, root.ino);

    // A chrooted resolution cannot climb out of its root either.
    let a = root.open(&ctx(), "a", OpenFlags::READ, 0).unwrap();
    let loc = resolver.resolve(&ctx(), &a, &a, "b/../..", true).unwrap();
    assert_eq!(loc.ino, a.ino);
}

#[test]
fn test_resolve_across_mount() {
    let (_fs, root) = setup_test_fs();
    let other = RamFs::new(2);
    create_file(
        &Vnode::new_root(other.root(), None),
        "mounted.txt",
        b"from another fs",
    );
    let a = root.open(&ctx(), "a", OpenFlags::READ, 0).unwrap();
    a.fsm_mount(&ctx(), "b", other.root()).unwrap();

    let resolver = PathResolver::new();
    let loc = resolver
        .resolve(&ctx(), &root, &root, "/a/b/mounted.txt", true)
        .unwrap();
    assert_eq!(loc.dev, 2);

    let back = resolver
        .resolve(&ctx(), &root, &root, "/a/b/../file.txt", true)
        .unwrap();
    assert_eq!(back.dev, 1);
}

// ========== Helper Method Tests ==========

#[test]
fn test_resolve_parent() {
    let (_fs, root) = setup_test_fs();
    let resolver = PathResolver::new();
    let a = root.open(&ctx(), "a", OpenFlags::READ, 0).unwrap();

    let (parent, name) = resolver
        .resolve_parent(&ctx(), &root, &root, "/a/new_file.txt")
        .unwrap();
    assert_eq!(parent.ino, a.ino);
    assert_eq!(name, "new_file.txt");

    let (parent, name) = resolver
        .resolve_parent(&ctx(), &root, &a, "plain")
        .unwrap();
    assert_eq!(parent.ino, a.ino);
    assert_eq!(name, "plain");

    assert!(
        resolver
            .resolve_parent(&ctx(), &root, &root, "/nonexist/new.txt")
            .is_err()
    );
    assert!(resolver.resolve_parent(&ctx(), &root, &root, "/").is_err());
}

// ========== Error Handling Tests ==========

#[test]
fn test_resolve_not_found() {
    let (_fs, root) = setup_test_fs();
    let result = PathResolver::new().resolve(&ctx(), &root, &root, "/nonexist/file.txt", true);
    assert!(matches!(result, Err(KError::NotFound)));
}

#[test]
fn test_resolve_empty_path() {
    let (_fs, root) = setup_test_fs();
    let result = PathResolver::new().resolve(&ctx(), &root, &root, "", true);
    assert!(matches!(result, Err(KError::NotFound)));
}

#[test]
fn test_resolve_through_file() {
    let (_fs, root) = setup_test_fs();
    let result = PathResolver::new().resolve(&ctx(), &root, &root, "/short.txt/x", true);
    assert!(matches!(result, Err(KError::NotADirectory)));
    let result = PathResolver::new().resolve(&ctx(), &root, &root, "/short.txt/", true);
    assert!(matches!(result, Err(KError::NotADirectory)));
}

#[test]
fn test_name_too_long() {
    let (_fs, root) = setup_test_fs();
    let name = "x".repeat(kvfs::NAME_MAX + 1);
    let result = PathResolver::new().resolve(&ctx(), &root, &root, &name, true);
    assert!(matches!(result, Err(KError::NameTooLong)));
}

// ========== Open Tests ==========

#[test]
fn test_open_flags() {
    let (_fs, root) = setup_test_fs();
    let resolver = PathResolver::new();
    let ctx = ctx();

    let desc = resolver
        .open(&ctx, &root, &root, "new.txt", rw() | OpenFlags::CREATE, 0o600)
        .unwrap();
    assert_eq!(desc.mode & 0o777, 0o600);

    let excl = resolver.open(
        &ctx,
        &root,
        &root,
        "new.txt",
        rw() | OpenFlags::CREATE | OpenFlags::EXCL,
        0o600,
    );
    assert!(matches!(excl, Err(KError::AlreadyExists)));

    let dir = resolver.open(&ctx, &root, &root, "short.txt", OpenFlags::READ | OpenFlags::DIRECTORY, 0);
    assert!(matches!(dir, Err(KError::NotADirectory)));

    let write_dir = resolver.open(&ctx, &root, &root, "a", rw(), 0);
    assert!(matches!(write_dir, Err(KError::IsADirectory)));

    let trunc = resolver
        .open(&ctx, &root, &root, "short.txt", rw() | OpenFlags::TRUNC, 0)
        .unwrap();
    assert_eq!(trunc.stat(&ctx).unwrap().size, 0);
}

// ========== Edge Cases ==========

#[test]
fn test_resolve_trailing_slash() {
    let (_fs, root) = setup_test_fs();
    let loc = PathResolver::new()
        .resolve(&ctx(), &root, &root, "/a/", true)
        .unwrap();
    assert_eq!(loc.node_type(), NodeType::Directory);
}

#[test]
fn test_resolve_multiple_slashes() {
    let (_fs, root) = setup_test_fs();
    let loc = PathResolver::new()
        .resolve(&ctx(), &root, &root, "//a///file.txt", true)
        .unwrap();
    assert_eq!(loc.node_type(), NodeType::RegularFile);
}

#[test]
#[ignore] // Run separately as it's time-consuming
fn test_resolve_deep_path_performance() {
    let (_fs, root) = setup_deep_fs(50);
    let path = format!("/a{}/file.txt", "/a".repeat(50));

    let start = Instant::now();
    let result = PathResolver::new().resolve(&ctx(), &root, &root, &path, true);
    let duration = start.elapsed();

    assert!(result.is_ok());
    assert!(
        duration < Duration::from_millis(50),
        "Path resolution too slow: {:?}",
        duration
    );
}
