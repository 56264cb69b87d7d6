// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 KylinSoft Co., Ltd. <https://www.kylinos.cn/>
// See LICENSES for license details.

//! Per-process descriptor tables.

use alloc::{sync::Arc, vec::Vec};
use core::sync::atomic::{AtomicUsize, Ordering};

use bitflags::bitflags;
use kerrno::{KError, KResult};
use ksync::Mutex;

use crate::Descriptor;

bitflags! {
    /// Per-slot descriptor flags.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct FdFlags: u32 {
        /// Closed by `execve`.
        const CLOEXEC = 1;
        /// Not inherited by `fork`.
        const CLOFORK = 2;
    }
}

#[derive(Default)]
struct Entry {
    desc: Option<Arc<Descriptor>>,
    flags: FdFlags,
}

impl Entry {
    fn is_good(&self) -> bool {
        self.desc.is_some()
    }

    fn take(&mut self) -> Option<Arc<Descriptor>> {
        self.flags = FdFlags::empty();
        self.desc.take()
    }
}

const MAX_ENTRIES: usize = i32::MAX as usize;

/// Maps small integers to open descriptors.
///
/// A slot is either empty or holds a descriptor and its [`FdFlags`]. All
/// operations serialize on one lock; descriptors released by an operation
/// are dropped after the lock is released.
pub struct DescriptorTable {
    entries: Mutex<Vec<Entry>>,
    limit: AtomicUsize,
}

impl Default for DescriptorTable {
    fn default() -> Self {
        Self::new()
    }
}

impl DescriptorTable {
    pub fn new() -> Self {
        Self::with_limit(MAX_ENTRIES)
    }

    /// Creates a table that refuses to hand out indices `>= limit`.
    pub fn with_limit(limit: usize) -> Self {
        Self {
            entries: Mutex::new(Vec::new()),
            limit: AtomicUsize::new(limit.min(MAX_ENTRIES)),
        }
    }

    pub fn limit(&self) -> usize {
        self.limit.load(Ordering::Relaxed)
    }

    pub fn set_limit(&self, limit: usize) {
        self.limit.store(limit.min(MAX_ENTRIES), Ordering::Relaxed);
    }

    fn check_flags(flags: FdFlags) -> KResult<()> {
        if FdFlags::all().contains(flags) {
            Ok(())
        } else {
            Err(KError::InvalidInput)
        }
    }

    fn slot(index: i32) -> KResult<usize> {
        usize::try_from(index).map_err(|_| KError::BadFileDescriptor)
    }

    /// Grows `entries` so that `index` is a valid position, at least doubling
    /// the length.
    ///
    /// Callers check `index` against the limit first, and the limit never
    /// exceeds `INT_MAX`, so a table that is full at `INT_MAX` reports
    /// `EMFILE` rather than `EOVERFLOW`.
    fn grow(entries: &mut Vec<Entry>, index: usize) -> KResult<()> {
        if index < entries.len() {
            return Ok(());
        }
        let new_len = (entries.len() * 2).max(index + 1).max(8).min(MAX_ENTRIES);
        entries
            .try_reserve_exact(new_len - entries.len())
            .map_err(|_| KError::NoMemory)?;
        entries.resize_with(new_len, Entry::default);
        Ok(())
    }

    /// Finds and makes room for the lowest empty slot not below `min_index`.
    fn free_slot_locked(
        &self,
        entries: &mut Vec<Entry>,
        flags: FdFlags,
        min_index: i32,
    ) -> KResult<usize> {
        Self::check_flags(flags)?;
        let min = usize::try_from(min_index).map_err(|_| KError::InvalidInput)?;
        let index = entries
            .iter()
            .enumerate()
            .skip(min)
            .find(|(_, e)| !e.is_good())
            .map_or(entries.len().max(min), |(i, _)| i);
        if index >= self.limit() {
            return Err(KError::TooManyOpenFiles);
        }
        Self::grow(entries, index)?;
        Ok(index)
    }

    /// Places `desc` in the lowest empty slot not below `min_index`.
    ///
    /// On failure `desc` is released after the table lock.
    pub fn allocate(&self, desc: Arc<Descriptor>, flags: FdFlags, min_index: i32) -> KResult<i32> {
        let mut entries = self.entries.lock();
        match self.free_slot_locked(&mut entries, flags, min_index) {
            Ok(index) => {
                entries[index] = Entry {
                    desc: Some(desc),
                    flags,
                };
                Ok(index as i32)
            }
            Err(err) => {
                drop(entries);
                drop(desc);
                Err(err)
            }
        }
    }

    /// Places the descriptor of slot `src_index` in a new slot as well.
    pub fn allocate_dup(&self, src_index: i32, flags: FdFlags, min_index: i32) -> KResult<i32> {
        let mut entries = self.entries.lock();
        let desc = Self::get_locked(&entries, src_index)?;
        let index = self.free_slot_locked(&mut entries, flags, min_index)?;
        entries[index] = Entry {
            desc: Some(desc),
            flags,
        };
        Ok(index as i32)
    }

    /// Makes slot `to` refer to the descriptor of slot `from`.
    ///
    /// The previous occupant of `to` is released without being closed
    /// explicitly. Copying a slot onto itself changes nothing.
    pub fn copy(&self, from: i32, to: i32, flags: FdFlags) -> KResult<i32> {
        Self::check_flags(flags)?;
        let to_index = Self::slot(to)?;
        if to_index >= self.limit() {
            return Err(KError::BadFileDescriptor);
        }
        let mut entries = self.entries.lock();
        let desc = Self::get_locked(&entries, from)?;
        if from == to {
            return Ok(to);
        }
        Self::grow(&mut entries, to_index)?;
        let old = core::mem::replace(
            &mut entries[to_index],
            Entry {
                desc: Some(desc),
                flags,
            },
        );
        drop(entries);
        drop(old);
        Ok(to)
    }

    fn get_locked(entries: &[Entry], index: i32) -> KResult<Arc<Descriptor>> {
        entries
            .get(Self::slot(index)?)
            .and_then(|e| e.desc.clone())
            .ok_or(KError::BadFileDescriptor)
    }

    pub fn get(&self, index: i32) -> KResult<Arc<Descriptor>> {
        Self::get_locked(&self.entries.lock(), index)
    }

    pub fn get_flags(&self, index: i32) -> KResult<FdFlags> {
        let entries = self.entries.lock();
        entries
            .get(Self::slot(index)?)
            .filter(|e| e.is_good())
            .map(|e| e.flags)
            .ok_or(KError::BadFileDescriptor)
    }

    pub fn set_flags(&self, index: i32, flags: FdFlags) -> KResult<()> {
        Self::check_flags(flags)?;
        let mut entries = self.entries.lock();
        let entry = entries
            .get_mut(Self::slot(index)?)
            .filter(|e| e.is_good())
            .ok_or(KError::BadFileDescriptor)?;
        entry.flags = flags;
        Ok(())
    }

    /// Empties slot `index` and hands its descriptor to the caller.
    pub fn free_keep(&self, index: i32) -> KResult<Arc<Descriptor>> {
        let mut entries = self.entries.lock();
        entries
            .get_mut(Self::slot(index)?)
            .and_then(Entry::take)
            .ok_or(KError::BadFileDescriptor)
    }

    pub fn free(&self, index: i32) -> KResult<()> {
        self.free_keep(index).map(drop)
    }

    /// Empties every slot from `min_index` on, returning how many were in use.
    pub fn close_from(&self, min_index: i32) -> KResult<usize> {
        let min = usize::try_from(min_index).map_err(|_| KError::BadFileDescriptor)?;
        let released = self.release_where(|index, _| index >= min);
        Ok(released.len())
    }

    /// Closes every close-on-exec slot.
    pub fn on_execute(&self) {
        let released = self.release_where(|_, flags| flags.contains(FdFlags::CLOEXEC));
        trace!("on_execute: closed {} descriptors", released.len());
    }

    fn release_where(&self, mut pred: impl FnMut(usize, FdFlags) -> bool) -> Vec<Arc<Descriptor>> {
        let mut entries = self.entries.lock();
        let released: Vec<_> = entries
            .iter_mut()
            .enumerate()
            .filter(|(i, e)| e.is_good() && pred(*i, e.flags))
            .filter_map(|(_, e)| e.take())
            .collect();
        drop(entries);
        released
    }

    /// Creates the table a forked child starts with: same length, every
    /// slot shared except the close-on-fork ones.
    pub fn fork(&self) -> KResult<DescriptorTable> {
        let entries = self.entries.lock();
        let mut forked = Vec::new();
        forked
            .try_reserve_exact(entries.len())
            .map_err(|_| KError::NoMemory)?;
        forked.extend(entries.iter().map(|e| {
            if e.is_good() && !e.flags.contains(FdFlags::CLOFORK) {
                Entry {
                    desc: e.desc.clone(),
                    flags: e.flags,
                }
            } else {
                Entry::default()
            }
        }));
        Ok(DescriptorTable {
            entries: Mutex::new(forked),
            limit: AtomicUsize::new(self.limit()),
        })
    }

    /// Releases every descriptor.
    pub fn reset(&self) {
        let entries = core::mem::take(&mut *self.entries.lock());
        drop(entries);
    }

    /// Number of slots, used or not.
    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    /// Whether no slot is in use.
    pub fn is_empty(&self) -> bool {
        !self.entries.lock().iter().any(Entry::is_good)
    }

    /// The first slot in use at or after `index`.
    pub fn next_used(&self, index: i32) -> Option<i32> {
        let start = usize::try_from(index).ok()?;
        let entries = self.entries.lock();
        entries
            .iter()
            .enumerate()
            .skip(start)
            .find(|(_, e)| e.is_good())
            .map(|(i, _)| i as i32)
    }
}
