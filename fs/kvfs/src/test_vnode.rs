#![cfg(test)]

use std::{
    collections::BTreeMap,
    sync::{Arc, Mutex, Weak},
};

use kerrno::KError;
use linux_raw_sys::general::{S_IFDIR, S_IFREG};

use crate::{Inode, InodeType, IoContext, MountTable, OpenFlags, VfsResult, Vnode};

/// A directory tree small enough for mount tests.
struct Node {
    ino: u64,
    dev: u64,
    mode: u32,
    this: Weak<Node>,
    parent: Weak<Node>,
    children: Mutex<BTreeMap<String, Arc<Node>>>,
}

impl Node {
    fn root(dev: u64) -> Arc<Self> {
        Self::with_parent(1, dev, S_IFDIR | 0o755, Weak::new())
    }

    fn with_parent(ino: u64, dev: u64, mode: u32, parent: Weak<Node>) -> Arc<Self> {
        Arc::new_cyclic(|this| Self {
            ino,
            dev,
            mode,
            this: this.clone(),
            parent,
            children: Mutex::new(BTreeMap::new()),
        })
    }

    fn add(self: &Arc<Self>, name: &str, ino: u64, dir: bool) -> Arc<Self> {
        let mode = if dir { S_IFDIR | 0o755 } else { S_IFREG | 0o644 };
        let child = Self::with_parent(ino, self.dev, mode, Arc::downgrade(self));
        self.children
            .lock()
            .unwrap()
            .insert(name.into(), child.clone());
        child
    }
}

impl Inode for Node {
    fn ino(&self) -> u64 {
        self.ino
    }

    fn dev(&self) -> u64 {
        self.dev
    }

    fn inode_type(&self) -> InodeType {
        if self.mode & S_IFDIR != 0 {
            InodeType::Dir
        } else {
            InodeType::File
        }
    }

    fn mode(&self) -> u32 {
        self.mode
    }

    fn open(
        &self,
        _ctx: &IoContext,
        name: &str,
        _flags: OpenFlags,
        _mode: u32,
    ) -> VfsResult<Arc<dyn Inode>> {
        let found = match name {
            "." => self.this.upgrade(),
            ".." => self.parent.upgrade().or_else(|| self.this.upgrade()),
            _ => self.children.lock().unwrap().get(name).cloned(),
        };
        found
            .map(|n| n as Arc<dyn Inode>)
            .ok_or(KError::NotFound)
    }
}

fn setup() -> (Arc<Vnode>, Arc<MountTable>, Arc<Node>) {
    let root = Node::root(1);
    let mnt = root.add("mnt", 2, true);
    mnt.add("hidden", 3, false);
    let mtable = Arc::new(MountTable::new());
    (Vnode::new_root(root.clone(), Some(mtable.clone())), mtable, root)
}

fn path(ctx: &IoContext, from: &Arc<Vnode>, components: &[&str]) -> VfsResult<Arc<Vnode>> {
    let mut vnode = from.clone();
    for name in components {
        vnode = vnode.open(ctx, name, OpenFlags::READ, 0)?;
    }
    Ok(vnode)
}

#[test]
fn test_open_without_mounts() {
    let ctx = IoContext::kernel();
    let (root, _, _) = setup();
    let hidden = path(&ctx, &root, &["mnt", "hidden"]).unwrap();
    assert_eq!((hidden.ino, hidden.dev), (3, 1));
    assert!(!hidden.is_dir());
    assert!(hidden.mounted_at().is_none());

    let up = path(&ctx, &root, &["mnt", ".."]).unwrap();
    assert_eq!(up.ino, 1);
    // `..` at the global root stays there.
    assert_eq!(root.open(&ctx, "..", OpenFlags::READ, 0).unwrap().ino, 1);
}

#[test]
fn test_mount_covers_directory() {
    let ctx = IoContext::kernel();
    let (root, mtable, _) = setup();
    let fs = Node::root(9);
    fs.add("data", 2, false);
    root.fsm_mount(&ctx, "mnt", fs).unwrap();
    assert_eq!(mtable.len(), 1);

    let mnt = root.open(&ctx, "mnt", OpenFlags::READ, 0).unwrap();
    assert_eq!((mnt.ino, mnt.dev), (1, 9));
    assert!(mnt.is_mount_root());
    assert_eq!(mnt.mounted_at().map(|v| (v.ino, v.dev)), Some((2, 1)));

    assert_eq!(
        mnt.open(&ctx, "hidden", OpenFlags::READ, 0).err(),
        Some(KError::NotFound)
    );
    let data = mnt.open(&ctx, "data", OpenFlags::READ, 0).unwrap();
    assert_eq!((data.ino, data.dev), (2, 9));
    assert!(!data.is_mount_root());
}

#[test]
fn test_dotdot_crosses_mount_boundary() {
    let ctx = IoContext::kernel();
    let (root, _, _) = setup();
    let fs = Node::root(9);
    fs.add("sub", 5, true);
    root.fsm_mount(&ctx, "mnt", fs).unwrap();

    let out = path(&ctx, &root, &["mnt", "sub", "..", ".."]).unwrap();
    assert_eq!((out.ino, out.dev), (1, 1));
    assert!(out.mounted_at().is_none());
}

#[test]
fn test_stacked_mounts() {
    let ctx = IoContext::kernel();
    let (root, mtable, _) = setup();
    root.fsm_mount(&ctx, "mnt", Node::root(9)).unwrap();
    root.fsm_mount(&ctx, "mnt", Node::root(10)).unwrap();
    assert_eq!(mtable.len(), 2);

    let top = root.open(&ctx, "mnt", OpenFlags::READ, 0).unwrap();
    assert_eq!(top.dev, 10);
    assert_eq!(top.open(&ctx, "..", OpenFlags::READ, 0).unwrap().ino, 1);

    root.unmount(&ctx, "mnt").unwrap();
    assert_eq!(root.open(&ctx, "mnt", OpenFlags::READ, 0).unwrap().dev, 9);
    root.unmount(&ctx, "mnt").unwrap();
    assert_eq!(root.open(&ctx, "mnt", OpenFlags::READ, 0).unwrap().dev, 1);
    assert_eq!(root.unmount(&ctx, "mnt"), Err(KError::InvalidInput));
    assert!(mtable.is_empty());
}

#[test]
fn test_mount_needs_directory() {
    let ctx = IoContext::kernel();
    let (root, _, tree) = setup();
    tree.add("file", 4, false);
    assert_eq!(
        root.fsm_mount(&ctx, "file", Node::root(9)),
        Err(KError::NotADirectory)
    );
    assert_eq!(
        root.fsm_mount(&ctx, "missing", Node::root(9)),
        Err(KError::NotFound)
    );

    let detached = Vnode::new_detached(Node::root(9));
    assert_eq!(
        detached.fsm_mount(&ctx, ".", Node::root(10)),
        Err(KError::Unsupported)
    );
}

#[test]
fn test_bind_mount() {
    let ctx = IoContext::kernel();
    let (root, _, tree) = setup();
    let other = tree.add("other", 6, true);
    other.add("inside", 7, false);

    let source = root.open(&ctx, "other", OpenFlags::READ, 0).unwrap();
    root.fsm_fsbind(&ctx, "mnt", &source).unwrap();
    let seen = path(&ctx, &root, &["mnt", "inside"]).unwrap();
    assert_eq!(seen.ino, 7);

    let file = path(&ctx, &root, &["mnt", "inside"]).unwrap();
    assert_eq!(
        root.fsm_fsbind(&ctx, "other", &file),
        Err(KError::NotADirectory)
    );
}
