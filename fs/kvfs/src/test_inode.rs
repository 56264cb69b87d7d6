#![cfg(test)]

use std::sync::Arc;

use kerrno::KError;
use kpoll::{IoEvents, PollNode, PollWaiter};
use linux_raw_sys::general::{S_IFCHR, S_IFDIR, S_IFREG};

use crate::{Inode, InodeType, IoContext, NodePermission, NodeType, OpenFlags};

struct Plain {
    ty: InodeType,
    mode: u32,
}

impl Inode for Plain {
    fn ino(&self) -> u64 {
        7
    }

    fn dev(&self) -> u64 {
        3
    }

    fn inode_type(&self) -> InodeType {
        self.ty
    }

    fn mode(&self) -> u32 {
        self.mode
    }
}

fn plain(ty: InodeType) -> Arc<dyn Inode> {
    let mode = match ty {
        InodeType::Dir => S_IFDIR | 0o755,
        InodeType::File => S_IFREG | 0o644,
        InodeType::Stream | InodeType::Tty => S_IFCHR | 0o620,
    };
    Arc::new(Plain { ty, mode })
}

#[test]
fn test_node_type_conversion() {
    assert_eq!(NodeType::from(0o1), NodeType::Fifo);
    assert_eq!(NodeType::from(0o4), NodeType::Directory);
    assert_eq!(NodeType::from(0o10), NodeType::RegularFile);
    assert_eq!(NodeType::from(0o12), NodeType::Symlink);
    assert_eq!(NodeType::from(0o77), NodeType::Unknown);

    assert_eq!(NodeType::from_mode(S_IFDIR | 0o755), NodeType::Directory);
    assert_eq!(NodeType::from_mode(S_IFREG), NodeType::RegularFile);
    assert_eq!(NodeType::Directory.as_mode(), S_IFDIR);
}

#[test]
fn test_node_permission_bitflags() {
    let default = NodePermission::default();
    assert!(default.contains(NodePermission::OWNER_READ | NodePermission::OTHER_WRITE));
    assert!(!default.contains(NodePermission::OWNER_EXEC));

    let perm = NodePermission::from_mode(S_IFDIR | 0o4755);
    assert!(perm.contains(NodePermission::SET_UID | NodePermission::OWNER_EXEC));
    assert!(!perm.contains(NodePermission::GROUP_WRITE));
}

#[test]
fn test_open_flags_status_subset() {
    let flags = OpenFlags::READ | OpenFlags::CREATE | OpenFlags::CLOEXEC | OpenFlags::NONBLOCK;
    assert_eq!(flags & OpenFlags::STATUS, OpenFlags::READ | OpenFlags::NONBLOCK);
    assert!(flags.is_readable());
    assert!(!flags.is_writable());
    assert!(OpenFlags::STATUS.contains(OpenFlags::SETTABLE));
}

#[test]
fn test_default_stat_uses_identity() {
    let ctx = IoContext::kernel();
    let node = plain(InodeType::File);
    let st = node.stat(&ctx).unwrap();
    assert_eq!((st.ino, st.dev, st.mode), (7, 3, S_IFREG | 0o644));
    assert_eq!(node.statvfs(&ctx), Err(KError::NoSys));
    assert_eq!(node.chmod(&ctx, 0o600), Err(KError::OperationNotPermitted));
    assert_eq!(node.sync(&ctx), Ok(()));
}

#[test]
fn test_defaults_by_type() {
    let ctx = IoContext::kernel();
    let mut buf = [0u8; 4];

    let file = plain(InodeType::File);
    assert_eq!(file.read(&ctx, &mut buf), Err(KError::BadFileDescriptor));
    assert_eq!(file.pwrite(&ctx, &buf, 0), Err(KError::BadFileDescriptor));
    assert_eq!(file.lseek(&ctx, 0, 0), Err(KError::InvalidInput));
    assert_eq!(file.truncate(&ctx, 0), Err(KError::InvalidInput));
    assert_eq!(file.isatty(&ctx), Err(KError::NotATty));
    assert_eq!(file.mkdir(&ctx, "a", 0o755), Err(KError::NotADirectory));
    assert_eq!(file.tcgetpgrp(&ctx), Err(KError::NotATty));

    let stream = plain(InodeType::Stream);
    assert_eq!(stream.read(&ctx, &mut buf), Err(KError::BadFileDescriptor));
    assert_eq!(stream.pread(&ctx, &mut buf, 0), Err(KError::IllegalSeek));
    assert_eq!(stream.lseek(&ctx, 0, 0), Err(KError::IllegalSeek));
    assert!(matches!(stream.readdirents(&ctx, 0, 1), Err(KError::NotADirectory)));

    let tty = plain(InodeType::Tty);
    assert_eq!(tty.isatty(&ctx), Ok(()));
    assert_eq!(tty.pwrite(&ctx, &buf, 0), Err(KError::IllegalSeek));
    assert_eq!(tty.tcgetwinsize(&ctx), Err(KError::Unsupported));

    let dir = plain(InodeType::Dir);
    assert_eq!(dir.read(&ctx, &mut buf), Err(KError::IsADirectory));
    assert_eq!(dir.pread(&ctx, &mut buf, 0), Err(KError::IsADirectory));
    assert_eq!(dir.truncate(&ctx, 0), Err(KError::IsADirectory));
    assert_eq!(dir.lseek(&ctx, 0, 0), Err(KError::InvalidInput));
    assert_eq!(dir.unlink(&ctx, "x"), Err(KError::Unsupported));
    assert!(matches!(dir.readdirents(&ctx, 0, 1), Err(KError::Unsupported)));
    assert_eq!(dir.readlink(&ctx), Err(KError::InvalidInput));
    assert_eq!(dir.listen(&ctx, 1), Err(KError::NotASocket));
}

#[test]
fn test_default_poll() {
    let ctx = IoContext::kernel();

    let node = PollNode::new(IoEvents::IN | IoEvents::PRI, PollWaiter::new());
    assert_eq!(plain(InodeType::File).poll(&ctx, &node), Ok(()));
    assert_eq!(node.revents(), IoEvents::IN);

    let node = PollNode::new(IoEvents::PRI, PollWaiter::new());
    assert_eq!(plain(InodeType::Dir).poll(&ctx, &node), Err(KError::WouldBlock));
    assert!(node.revents().is_empty());

    let node = PollNode::new(IoEvents::IN, PollWaiter::new());
    assert_eq!(plain(InodeType::Stream).poll(&ctx, &node), Err(KError::Unsupported));
}

#[test]
fn test_downcast() {
    let node = plain(InodeType::File);
    assert!(node.clone().downcast_arc::<Plain>().is_ok());
}

#[test]
fn test_copy_routines() {
    let ctx = IoContext::kernel();
    let mut dst = [0u8; 3];
    assert_eq!(ctx.copy_to_dest(&mut dst, b"abc"), Ok(()));
    assert_eq!(&dst, b"abc");
    assert_eq!(ctx.copy_to_dest(&mut dst, b"ab"), Err(KError::BadAddress));

    fn faulting(_dst: &mut [u8], _src: &[u8]) -> bool {
        false
    }
    let ctx = ctx.with_copy_routines(faulting, faulting);
    assert_eq!(ctx.copy_from_src(&mut dst, b"xyz"), Err(KError::BadAddress));
    assert_eq!(&dst, b"abc");
}
