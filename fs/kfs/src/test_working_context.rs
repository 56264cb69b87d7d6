//! Unit tests for WorkingContext.

#![cfg(test)]

use alloc::sync::Arc;

use kvfs::{IoContext, OpenFlags, Vnode};

use crate::{WorkingContext, ramfs::RamFs};

fn root_with_subdir() -> (RamFs, Arc<Vnode>, Arc<Vnode>) {
    let fs = RamFs::new(7);
    let root = Vnode::new_root(fs.root(), None);
    let ctx = IoContext::kernel();
    root.mkdir(&ctx, "sub", 0o755).unwrap();
    let sub = root.open(&ctx, "sub", OpenFlags::READ, 0).unwrap();
    (fs, root, sub)
}

#[test]
fn test_working_context_new() {
    let (_fs, root, _sub) = root_with_subdir();
    let ctx = WorkingContext::new(root.clone());
    assert!(Arc::ptr_eq(ctx.root(), &root));
    assert!(Arc::ptr_eq(ctx.cwd(), &root));
}

#[test]
fn test_working_context_clone() {
    let (_fs, root, sub) = root_with_subdir();
    let mut ctx = WorkingContext::new(root);
    ctx.chdir(sub.clone()).unwrap();
    let cloned = ctx.clone();
    assert!(Arc::ptr_eq(cloned.cwd(), &sub));
    assert!(Arc::ptr_eq(cloned.root(), ctx.root()));
}

#[test]
fn test_debug_names_root_and_cwd() {
    let (_fs, root, sub) = root_with_subdir();
    let ctx = WorkingContext::new(root).with_cwd(sub.clone()).unwrap();
    let debug = format!("{ctx:?}");
    assert!(debug.contains("root"));
    assert!(debug.contains(&format!("({}, 7)", sub.ino)));
}
