// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 KylinSoft Co., Ltd. <https://www.kylinos.cn/>
// See LICENSES for license details.

use alloc::sync::Arc;

use ksync::{Mutex, WaitQueue};
use slab::Slab;

use crate::{
    IoEvents, PollNode,
    node::{PollTarget, Registration},
};

pub(crate) struct ChannelShared {
    channel_lock: Mutex<Slab<Arc<PollTarget>>>,
    no_pending: WaitQueue,
}

impl ChannelShared {
    pub(crate) fn remove(&self, key: usize) {
        let mut nodes = self.channel_lock.lock();
        if nodes.try_remove(key).is_some() && nodes.is_empty() {
            self.no_pending.notify_all();
        }
    }
}

/// A broadcast point an object uses to announce readiness.
///
/// Dropping a channel reports [`IoEvents::HUP`] to every registered node and
/// then blocks until all of them have been canceled.
pub struct PollChannel {
    shared: Arc<ChannelShared>,
}

impl PollChannel {
    pub fn new() -> Self {
        Self {
            shared: Arc::new(ChannelShared {
                channel_lock: Mutex::new(Slab::new()),
                no_pending: WaitQueue::new(),
            }),
        }
    }

    /// Registers `node`; it is woken by every later [`signal`] until it is
    /// canceled.
    ///
    /// A node can be registered on one channel at a time; registering a node
    /// that is already registered leaves it where it is.
    ///
    /// [`signal`]: PollChannel::signal
    pub fn register(&self, node: &PollNode) {
        let mut registration = node.registration.lock();
        if registration.is_some() {
            warn!("poll node is already registered on a channel");
            return;
        }
        let key = self.shared.channel_lock.lock().insert(node.target.clone());
        *registration = Some(Registration {
            channel: self.shared.clone(),
            key,
        });
    }

    /// Removes `node` if it is registered on this channel.
    pub fn unregister(&self, node: &PollNode) {
        let mut registration = node.registration.lock();
        let ours = registration
            .as_ref()
            .is_some_and(|r| Arc::ptr_eq(&r.channel, &self.shared));
        if !ours {
            return;
        }
        let taken = registration.take();
        drop(registration);
        if let Some(Registration { channel, key }) = taken {
            channel.remove(key);
        }
    }

    /// Delivers `events` to every registered node.
    pub fn signal(&self, events: IoEvents) {
        let nodes = self.shared.channel_lock.lock();
        for (_, target) in nodes.iter() {
            target.deliver(events);
        }
    }

    /// Number of registered nodes.
    pub fn num_registered(&self) -> usize {
        self.shared.channel_lock.lock().len()
    }
}

impl Default for PollChannel {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for PollChannel {
    fn drop(&mut self) {
        self.signal(IoEvents::HUP);
        let shared = &self.shared;
        shared
            .no_pending
            .wait_until(|| shared.channel_lock.lock().is_empty());
    }
}
