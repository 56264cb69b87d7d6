//! Unit tests for kpoll

#![cfg(test)]

use std::{
    sync::{Arc, Barrier},
    thread,
    time::Duration,
};

use kerrno::KError;
use ksignal::{Signo, ThreadSignals};

use crate::{IoEvents, PollChannel, PollNode, PollWaiter};

#[test]
fn test_register_and_signal() {
    let channel = PollChannel::new();
    let waiter = PollWaiter::new();
    let node = PollNode::new(IoEvents::IN, waiter.clone());

    channel.register(&node);
    assert!(node.is_registered());
    assert_eq!(channel.num_registered(), 1);

    // Not requested, not reported.
    channel.signal(IoEvents::OUT);
    assert!(node.revents().is_empty());
    assert!(!waiter.is_woken());

    channel.signal(IoEvents::IN | IoEvents::OUT);
    assert_eq!(node.revents(), IoEvents::IN);
    assert!(waiter.is_woken());
    assert_eq!(waiter.wakeups(), 1);

    node.cancel();
    assert!(!node.is_registered());
    assert_eq!(channel.num_registered(), 0);
}

#[test]
fn test_hangup_always_reported() {
    let channel = PollChannel::new();
    let node = PollNode::new(IoEvents::OUT, PollWaiter::new());
    assert!(node.events().contains(IoEvents::ALWAYS_POLL));
    channel.register(&node);
    channel.signal(IoEvents::HUP);
    assert_eq!(node.revents(), IoEvents::HUP);
    node.cancel();
}

#[test]
fn test_cancel_is_idempotent() {
    let channel = PollChannel::new();
    let node = PollNode::new(IoEvents::IN, PollWaiter::new());
    channel.register(&node);
    node.cancel();
    node.cancel();
    channel.unregister(&node);
    assert_eq!(channel.num_registered(), 0);
}

#[test]
fn test_double_register_keeps_first_channel() {
    let a = PollChannel::new();
    let b = PollChannel::new();
    let node = PollNode::new(IoEvents::IN, PollWaiter::new());
    a.register(&node);
    b.register(&node);
    assert_eq!(a.num_registered(), 1);
    assert_eq!(b.num_registered(), 0);

    // Unregistering from the wrong channel is a no-op.
    b.unregister(&node);
    assert!(node.is_registered());
    a.unregister(&node);
    assert!(!node.is_registered());
}

#[test]
fn test_report_ready_does_not_wake() {
    let waiter = PollWaiter::new();
    let node = PollNode::new(IoEvents::IN, waiter.clone());
    node.report_ready(IoEvents::IN | IoEvents::OUT);
    assert_eq!(node.revents(), IoEvents::IN);
    assert!(!waiter.is_woken());
}

#[test]
fn test_cancel_cancels_slaves() {
    let channels: Vec<_> = (0..3).map(|_| PollChannel::new()).collect();
    let master = PollNode::new(IoEvents::IN, PollWaiter::new());
    channels[0].register(&master);
    for channel in &channels[1..] {
        let slave = master.create_slave().unwrap();
        channel.register(&slave);
    }
    assert!(channels.iter().all(|c| c.num_registered() == 1));

    // A slave delivers into the master's revents.
    channels[2].signal(IoEvents::IN);
    assert_eq!(master.revents(), IoEvents::IN);

    master.cancel();
    assert!(channels.iter().all(|c| c.num_registered() == 0));
}

#[test]
fn test_chained_nodes_wake_once() {
    const N: usize = 8;
    let channels: Arc<Vec<_>> = Arc::new((0..N).map(|_| PollChannel::new()).collect());
    let waiter = PollWaiter::new();
    let master = PollNode::new(IoEvents::IN, waiter.clone());
    channels[0].register(&master);
    for channel in &channels[1..] {
        channel.register(&master.create_slave().unwrap());
    }

    let barrier = Arc::new(Barrier::new(N));
    let handles: Vec<_> = (0..N)
        .map(|i| {
            let channels = channels.clone();
            let barrier = barrier.clone();
            thread::spawn(move || {
                barrier.wait();
                channels[i].signal(IoEvents::IN);
            })
        })
        .collect();
    for h in handles {
        h.join().unwrap();
    }

    waiter.wait_uninterruptible();
    assert_eq!(waiter.wakeups(), 1);
    assert_eq!(master.revents(), IoEvents::IN);
    master.cancel();
}

#[test]
fn test_waiter_woken_from_other_thread() {
    let channel = Arc::new(PollChannel::new());
    let waiter = PollWaiter::new();
    let node = PollNode::new(IoEvents::IN, waiter.clone());
    channel.register(&node);

    let signaler = {
        let channel = channel.clone();
        thread::spawn(move || {
            thread::sleep(Duration::from_millis(20));
            channel.signal(IoEvents::IN);
        })
    };

    let signals = ThreadSignals::new();
    assert_eq!(waiter.wait(&signals), Ok(()));
    signaler.join().unwrap();
    node.cancel();
}

#[test]
fn test_waiter_interrupted() {
    let waiter = PollWaiter::new();
    let signals = ThreadSignals::new();
    let sleeper = {
        let waiter = waiter.clone();
        let signals = signals.clone();
        thread::spawn(move || waiter.wait(&signals))
    };
    thread::sleep(Duration::from_millis(20));
    signals.send(Signo::SIGUSR1);
    assert_eq!(sleeper.join().unwrap(), Err(KError::Interrupted));
    assert!(!waiter.is_woken());
}

#[test]
fn test_channel_drop_waits_for_unregister() {
    let channel = PollChannel::new();
    let waiter = PollWaiter::new();
    let node = PollNode::new(IoEvents::IN, waiter.clone());
    channel.register(&node);

    let dropper = thread::spawn(move || drop(channel));

    // The destructor reports the hangup before it starts draining.
    waiter.wait_uninterruptible();
    assert!(node.revents().contains(IoEvents::HUP));
    thread::sleep(Duration::from_millis(20));
    assert!(!dropper.is_finished());

    node.cancel();
    dropper.join().unwrap();
}

#[test]
fn test_channel_drop_races_with_cancel() {
    for _ in 0..50 {
        let channel = PollChannel::new();
        let node = PollNode::new(IoEvents::IN, PollWaiter::new());
        channel.register(&node);

        let barrier = Arc::new(Barrier::new(2));
        let dropper = {
            let barrier = barrier.clone();
            thread::spawn(move || {
                barrier.wait();
                drop(channel);
            })
        };
        let canceler = {
            let barrier = barrier.clone();
            thread::spawn(move || {
                barrier.wait();
                node.cancel();
            })
        };
        canceler.join().unwrap();
        dropper.join().unwrap();
    }
}
