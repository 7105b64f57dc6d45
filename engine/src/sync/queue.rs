//! Unbounded multi-producer / multi-consumer FIFO.
//!
//! The queue owns both ends of a crossbeam channel, so it can never become
//! disconnected while it is alive. That turns the channel into a plain
//! thread-safe queue with blocking and non-blocking pops:
//!
//! - [`Queue::push`] never blocks and wakes at most one blocked popper.
//! - [`Queue::pop`] blocks until an item is available.
//! - [`Queue::try_pop`] returns `None` immediately when empty.
//!
//! Items from a single producer are popped in the order they were pushed. No
//! ordering is promised between different producers.

use std::time::Duration;

use crossbeam::channel::{Receiver, RecvTimeoutError, Sender, unbounded};

pub struct Queue<T> {
    sender: Sender<T>,
    receiver: Receiver<T>,
}

impl<T> Queue<T> {
    pub fn new() -> Self {
        let (sender, receiver) = unbounded();
        Self { sender, receiver }
    }

    /// Enqueue an item.
    pub fn push(&self, item: T) {
        // Cannot fail: the receiving half lives as long as `self`.
        let _ = self.sender.send(item);
    }

    /// Dequeue the next item, blocking until one is available.
    pub fn pop(&self) -> T {
        match self.receiver.recv() {
            Ok(item) => item,
            Err(_) => unreachable!("queue owns its sender"),
        }
    }

    /// Dequeue the next item if there is one.
    pub fn try_pop(&self) -> Option<T> {
        self.receiver.try_recv().ok()
    }

    /// Dequeue the next item, waiting at most `timeout` for one to arrive.
    pub fn pop_timeout(&self, timeout: Duration) -> Option<T> {
        match self.receiver.recv_timeout(timeout) {
            Ok(item) => Some(item),
            Err(RecvTimeoutError::Timeout) => None,
            Err(RecvTimeoutError::Disconnected) => unreachable!("queue owns its sender"),
        }
    }

    /// Take every item currently queued, in order.
    pub fn drain(&self) -> Vec<T> {
        self.receiver.try_iter().collect()
    }

    pub fn size(&self) -> usize {
        self.receiver.len()
    }

    pub fn empty(&self) -> bool {
        self.receiver.is_empty()
    }
}

impl<T> Default for Queue<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> std::fmt::Debug for Queue<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Queue").field("size", &self.size()).finish()
    }
}
