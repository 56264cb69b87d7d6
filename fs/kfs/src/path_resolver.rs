// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 KylinSoft Co., Ltd. <https://www.kylinos.cn/>
// See LICENSES for license details.

//! Path resolution.
//!
//! Walks a path one component at a time through [`Vnode::open`], so mount
//! points are crossed transparently. Symbolic links are expanded in place;
//! `..` never climbs above the root it is given.

use alloc::{string::String, sync::Arc, vec::Vec};

use kerrno::{KError, KResult};
use kvfs::{IoContext, NAME_MAX, NodeType, OpenFlags, Vnode};

use crate::Descriptor;

/// Default limit on symbolic link expansions during one resolution.
pub const SYMLOOP_MAX: usize = 20;

/// Resolves paths to vnodes.
#[derive(Debug, Clone, Copy)]
pub struct PathResolver {
    symloop_max: usize,
}

impl Default for PathResolver {
    fn default() -> Self {
        Self::new()
    }
}

fn is_same(a: &Vnode, b: &Vnode) -> bool {
    a.ino == b.ino && a.dev == b.dev
}

/// Pushes the components of `path` so that the first one is popped first.
fn push_components(pending: &mut Vec<String>, path: &str) {
    pending.extend(
        path.rsplit('/')
            .filter(|c| !c.is_empty() && *c != ".")
            .map(String::from),
    );
}

impl PathResolver {
    pub const fn new() -> Self {
        Self {
            symloop_max: SYMLOOP_MAX,
        }
    }

    pub const fn with_symloop_max(symloop_max: usize) -> Self {
        Self { symloop_max }
    }

    pub fn symloop_max(&self) -> usize {
        self.symloop_max
    }

    #[allow(clippy::too_many_arguments)]
    fn walk(
        &self,
        ctx: &IoContext,
        root: &Arc<Vnode>,
        from: &Arc<Vnode>,
        path: &str,
        last_flags: OpenFlags,
        last_mode: u32,
        follow_last: bool,
    ) -> KResult<Arc<Vnode>> {
        if path.is_empty() {
            return Err(KError::NotFound);
        }
        let mut current = if path.starts_with('/') {
            root.clone()
        } else {
            from.clone()
        };
        let mut pending = Vec::new();
        push_components(&mut pending, path);
        let mut expansions = 0;

        while let Some(name) = pending.pop() {
            if name.len() > NAME_MAX {
                return Err(KError::NameTooLong);
            }
            if !current.is_dir() {
                return Err(KError::NotADirectory);
            }
            if name == ".." && is_same(&current, root) {
                continue;
            }
            let last = pending.is_empty();
            let (flags, mode) = if last {
                (last_flags, last_mode)
            } else {
                (OpenFlags::SEARCH, 0)
            };
            let next = current.open(ctx, &name, flags, mode)?;
            if next.node_type() != NodeType::Symlink || (last && !follow_last) {
                current = next;
                continue;
            }
            if last && last_flags.contains(OpenFlags::NOFOLLOW) {
                return Err(KError::FilesystemLoop);
            }
            expansions += 1;
            if expansions > self.symloop_max {
                return Err(KError::FilesystemLoop);
            }
            let target = next.readlink(ctx)?;
            trace!("expanding symlink {name:?} -> {target:?}");
            if target.is_empty() {
                return Err(KError::NotFound);
            }
            if target.starts_with('/') {
                current = root.clone();
            }
            push_components(&mut pending, &target);
        }

        if path.ends_with('/') && !current.is_dir() {
            return Err(KError::NotADirectory);
        }
        Ok(current)
    }

    /// Resolves `path`, relative to `from` unless it is absolute.
    pub fn resolve(
        &self,
        ctx: &IoContext,
        root: &Arc<Vnode>,
        from: &Arc<Vnode>,
        path: &str,
        follow: bool,
    ) -> KResult<Arc<Vnode>> {
        self.walk(ctx, root, from, path, OpenFlags::READ, 0, follow)
    }

    /// Resolves the directory containing the last component of `path` and
    /// returns it with that component.
    pub fn resolve_parent<'a>(
        &self,
        ctx: &IoContext,
        root: &Arc<Vnode>,
        from: &Arc<Vnode>,
        path: &'a str,
    ) -> KResult<(Arc<Vnode>, &'a str)> {
        let trimmed = path.trim_end_matches('/');
        if trimmed.is_empty() {
            return Err(if path.is_empty() {
                KError::NotFound
            } else {
                KError::InvalidInput
            });
        }
        let (dir, name) = match trimmed.rsplit_once('/') {
            Some(("", name)) => (root.clone(), name),
            Some((dir, name)) => (self.resolve(ctx, root, from, dir, true)?, name),
            None => (from.clone(), trimmed),
        };
        if !dir.is_dir() {
            return Err(KError::NotADirectory);
        }
        if name.len() > NAME_MAX {
            return Err(KError::NameTooLong);
        }
        Ok((dir, name))
    }

    /// Opens `path` and returns a new descriptor for it.
    pub fn open(
        &self,
        ctx: &IoContext,
        root: &Arc<Vnode>,
        from: &Arc<Vnode>,
        path: &str,
        flags: OpenFlags,
        mode: u32,
    ) -> KResult<Arc<Descriptor>> {
        let vnode = self.walk(ctx, root, from, path, flags, mode, true)?;
        let ty = vnode.node_type();
        if flags.contains(OpenFlags::DIRECTORY) && ty != NodeType::Directory {
            return Err(KError::NotADirectory);
        }
        if ty == NodeType::Directory && flags.is_writable() {
            return Err(KError::IsADirectory);
        }
        if flags.contains(OpenFlags::TRUNC) && flags.is_writable() && ty == NodeType::RegularFile {
            vnode.truncate(ctx, 0)?;
        }
        Ok(Descriptor::new(vnode, flags))
    }
}
