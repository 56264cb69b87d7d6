// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 KylinSoft Co., Ltd. <https://www.kylinos.cn/>
// See LICENSES for license details.

//! Anonymous pipes.

use alloc::{sync::Arc, vec::Vec};
use core::sync::atomic::{AtomicU64, Ordering};

use kerrno::{KError, KResult};
use kpoll::{IoEvents, PollChannel, PollNode};
use ksync::{Mutex, WaitQueue};
use kvfs::{Inode, InodeType, IoContext, NodeType, Stat};
use ringbuf::{
    HeapRb,
    traits::{Consumer, Observer, Producer},
};

/// Writes of at most this many bytes are never interleaved with other
/// writes.
pub const PIPE_BUF: usize = 4096;

/// Device number reported for pipe ends.
pub const PIPE_DEV: u64 = 0;

static NEXT_PIPE_INO: AtomicU64 = AtomicU64::new(1);

struct PipeState {
    buffer: HeapRb<u8>,
    reader_open: bool,
    writer_open: bool,
}

struct PipeChannel {
    ino: u64,
    capacity: usize,
    state: Mutex<PipeState>,
    read_wq: Arc<WaitQueue>,
    write_wq: Arc<WaitQueue>,
    read_poll: PollChannel,
    write_poll: PollChannel,
}

impl PipeChannel {
    /// Largest write that must go in as one piece.
    fn atomic_limit(&self) -> usize {
        PIPE_BUF.min(self.capacity)
    }

    fn can_write(&self, state: &PipeState, remaining: usize) -> bool {
        let vacant = state.buffer.vacant_len();
        if remaining <= self.atomic_limit() {
            vacant >= remaining
        } else {
            vacant > 0
        }
    }
}

/// One end of a pipe.
///
/// The read end reports `IN` while data is buffered and `HUP` once the write
/// end is gone; the write end reports `OUT` while there is room and `ERR`
/// once the read end is gone.
pub struct PipeEnd {
    channel: Arc<PipeChannel>,
    is_writer: bool,
}

/// Creates a pipe buffering up to `capacity` bytes and returns its read and
/// write ends.
pub fn pipe(capacity: usize) -> (Arc<PipeEnd>, Arc<PipeEnd>) {
    let capacity = capacity.max(1);
    let channel = Arc::new(PipeChannel {
        ino: NEXT_PIPE_INO.fetch_add(1, Ordering::Relaxed),
        capacity,
        state: Mutex::new(PipeState {
            buffer: HeapRb::new(capacity),
            reader_open: true,
            writer_open: true,
        }),
        read_wq: Arc::new(WaitQueue::new()),
        write_wq: Arc::new(WaitQueue::new()),
        read_poll: PollChannel::new(),
        write_poll: PollChannel::new(),
    });
    let reader = Arc::new(PipeEnd {
        channel: channel.clone(),
        is_writer: false,
    });
    let writer = Arc::new(PipeEnd {
        channel,
        is_writer: true,
    });
    (reader, writer)
}

impl PipeEnd {
    pub fn is_writer(&self) -> bool {
        self.is_writer
    }

    pub fn capacity(&self) -> usize {
        self.channel.capacity
    }

    /// Bytes currently buffered.
    pub fn buffered(&self) -> usize {
        self.channel.state.lock().buffer.occupied_len()
    }
}

impl Inode for PipeEnd {
    fn ino(&self) -> u64 {
        self.channel.ino
    }

    fn dev(&self) -> u64 {
        PIPE_DEV
    }

    fn inode_type(&self) -> InodeType {
        InodeType::Stream
    }

    fn mode(&self) -> u32 {
        NodeType::Fifo.as_mode() | 0o600
    }

    fn stat(&self, _ctx: &IoContext) -> KResult<Stat> {
        Ok(Stat {
            ino: self.ino(),
            dev: PIPE_DEV,
            mode: self.mode(),
            nlink: 1,
            size: self.buffered() as i64,
            blksize: PIPE_BUF as i64,
            ..Default::default()
        })
    }

    fn read(&self, ctx: &IoContext, buf: &mut [u8]) -> KResult<usize> {
        if self.is_writer {
            return Err(KError::BadFileDescriptor);
        }
        if buf.is_empty() {
            return Ok(0);
        }
        let ch = &self.channel;
        loop {
            let mut state = ch.state.lock();
            if !state.buffer.is_empty() {
                let (a, b) = state.buffer.as_slices();
                let n1 = a.len().min(buf.len());
                let n2 = b.len().min(buf.len() - n1);
                ctx.copy_to_dest(&mut buf[..n1], &a[..n1])?;
                ctx.copy_to_dest(&mut buf[n1..n1 + n2], &b[..n2])?;
                state.buffer.skip(n1 + n2);
                ch.write_poll.signal(IoEvents::OUT | IoEvents::WRNORM);
                drop(state);
                ch.write_wq.notify_all();
                return Ok(n1 + n2);
            }
            if !state.writer_open {
                return Ok(0);
            }
            drop(state);
            if ctx.is_nonblocking() {
                return Err(KError::WouldBlock);
            }
            ctx.sleep_until(&ch.read_wq, || {
                let state = ch.state.lock();
                !state.buffer.is_empty() || !state.writer_open
            })?;
        }
    }

    fn write(&self, ctx: &IoContext, buf: &[u8]) -> KResult<usize> {
        if !self.is_writer {
            return Err(KError::BadFileDescriptor);
        }
        if buf.is_empty() {
            return Ok(0);
        }
        let ch = &self.channel;
        let mut written = 0;
        loop {
            let remaining = buf.len() - written;
            let mut state = ch.state.lock();
            if !state.reader_open {
                return if written > 0 {
                    Ok(written)
                } else {
                    Err(KError::BrokenPipe)
                };
            }
            if ch.can_write(&state, remaining) {
                let n = remaining.min(state.buffer.vacant_len());
                let mut chunk = Vec::new();
                chunk.try_reserve_exact(n).map_err(|_| KError::NoMemory)?;
                chunk.resize(n, 0);
                ctx.copy_from_src(&mut chunk, &buf[written..written + n])?;
                state.buffer.push_slice(&chunk);
                written += n;
                ch.read_poll.signal(IoEvents::IN | IoEvents::RDNORM);
                drop(state);
                ch.read_wq.notify_all();
                if written == buf.len() {
                    return Ok(written);
                }
                continue;
            }
            drop(state);
            if ctx.is_nonblocking() {
                return if written > 0 {
                    Ok(written)
                } else {
                    Err(KError::WouldBlock)
                };
            }
            let slept = ctx.sleep_until(&ch.write_wq, || {
                let state = ch.state.lock();
                !state.reader_open || ch.can_write(&state, remaining)
            });
            match slept {
                Ok(()) => {}
                Err(_) if written > 0 => return Ok(written),
                Err(err) => return Err(err),
            }
        }
    }

    fn poll(&self, _ctx: &IoContext, node: &PollNode) -> KResult<()> {
        let ch = &self.channel;
        let state = ch.state.lock();
        let mut ready = IoEvents::empty();
        if self.is_writer {
            if state.buffer.vacant_len() > 0 {
                ready |= IoEvents::OUT | IoEvents::WRNORM;
            }
            if !state.reader_open {
                ready |= IoEvents::ERR;
            }
        } else {
            if !state.buffer.is_empty() {
                ready |= IoEvents::IN | IoEvents::RDNORM;
            }
            if !state.writer_open {
                ready |= IoEvents::HUP;
            }
        }
        let matched = ready & node.events();
        if !matched.is_empty() {
            node.report_ready(matched);
            return Ok(());
        }
        if self.is_writer {
            ch.write_poll.register(node);
        } else {
            ch.read_poll.register(node);
        }
        Err(KError::WouldBlock)
    }
}

impl Drop for PipeEnd {
    fn drop(&mut self) {
        let ch = &self.channel;
        let mut state = ch.state.lock();
        if self.is_writer {
            state.writer_open = false;
            ch.read_poll.signal(IoEvents::HUP);
        } else {
            state.reader_open = false;
            ch.write_poll.signal(IoEvents::ERR);
        }
        drop(state);
        ch.read_wq.notify_all();
        ch.write_wq.notify_all();
    }
}
