// Copyright (c) 2024 Linaro LTD
// SPDX-License-Identifier: Apache-2.0

//! Waitable queues
//!
//! A [`Queue`] is a bounded FIFO whose readiness bit lives in the owning task's event.  Unlike a
//! flag, the bit is level triggered: it is set exactly when the queue holds at least one item.
//! Waiting for a queue therefore never consumes anything.  The owning task has to [`read`] items
//! out of it, and the bit drops only once the last one has been taken.
//!
//! Producers write from any thread, using a clone of the queue:
//!
//! ```
//! use rtsync::{config::TaskConfig, queue::Queue, task::Task};
//!
//! let mut task = Task::new(TaskConfig::new("consumer"));
//! let rx: Queue<u32, 4> = Queue::new(&mut task);
//! let tx = rx.clone();
//!
//! assert!(tx.write(7));
//! task.wait(&rx);
//! assert_eq!(rx.read(), 7);
//! assert!(rx.is_empty());
//! ```
//!
//! [`read`]: Queue::read

use core::fmt;
use std::sync::{Arc, Mutex};

use crate::sys::queue::Queue as Fifo;
use crate::task::Task;
use crate::time::{Forever, NoWait, Timeout};
use crate::waitable::{Slot, Waitable, WaitableKind};

struct Shared<T, const N: usize> {
    fifo: Fifo<T, N>,
    slot: Slot,
    /// Serializes recomputing the readiness bit.
    gate: Mutex<()>,
    block_when_full: bool,
}

/// A bounded FIFO of up to `N` items of `T`, that its owning task can wait on.
pub struct Queue<T, const N: usize> {
    shared: Arc<Shared<T, N>>,
}

impl<T, const N: usize> Clone for Queue<T, N> {
    fn clone(&self) -> Self {
        Queue {
            shared: self.shared.clone(),
        }
    }
}

impl<T: Send, const N: usize> Queue<T, N> {
    /// Create a queue owned by `task`.  Writing to a full queue fails immediately.
    pub fn new(task: &mut Task) -> Queue<T, N> {
        Self::build(task, false)
    }

    /// Create a queue owned by `task`, where writing to a full queue waits for room instead.
    pub fn with_blocking_write(task: &mut Task) -> Queue<T, N> {
        Self::build(task, true)
    }

    fn build(task: &mut Task, block_when_full: bool) -> Queue<T, N> {
        let slot = task.register_waitable(WaitableKind::Queue);
        log::debug!(
            "task {}: queue of {} on bit {}{}",
            task.name(),
            N,
            slot.bit(),
            if block_when_full { ", blocking" } else { "" }
        );
        Queue {
            shared: Arc::new(Shared {
                fifo: Fifo::new(),
                slot,
                gate: Mutex::new(()),
                block_when_full,
            }),
        }
    }

    /// Append an item.
    ///
    /// Returns false, dropping nothing but the item, if the queue is full and was not created with
    /// a blocking write.
    pub fn write(&self, item: T) -> bool {
        let timeout: Timeout = if self.shared.block_when_full {
            Forever.into()
        } else {
            NoWait.into()
        };
        let sent = self.shared.fifo.send(item, timeout).is_ok();
        if sent {
            self.refresh();
        }
        sent
    }

    /// Take the item at the head of the queue, waiting for one if the queue is empty.
    pub fn read(&self) -> T {
        let item = loop {
            if let Ok(item) = self.shared.fifo.recv(Forever) {
                break item;
            }
        };
        self.refresh();
        item
    }

    /// Take the item at the head of the queue, if there is one.
    pub fn try_read(&self) -> Option<T> {
        let item = self.shared.fifo.recv(NoWait).ok();
        if item.is_some() {
            self.refresh();
        }
        item
    }

    /// Discard everything in the queue.
    pub fn clear(&self) {
        while self.shared.fifo.recv(NoWait).is_ok() {}
        self.refresh();
    }

    /// Recompute the readiness bit from the occupancy.
    ///
    /// Each FIFO operation is followed by a refresh, and refreshes are serialized, so the last one
    /// to run always sees the final occupancy.
    fn refresh(&self) {
        let _gate = self.shared.gate.lock().unwrap_or_else(|e| e.into_inner());
        if self.shared.fifo.is_empty() {
            self.shared.slot.clear();
        } else {
            self.shared.slot.set();
        }
    }
}

impl<T, const N: usize> Queue<T, N> {
    /// Number of items waiting.
    pub fn len(&self) -> usize {
        self.shared.fifo.len()
    }

    /// Is the queue empty.
    pub fn is_empty(&self) -> bool {
        self.shared.fifo.is_empty()
    }

    /// Maximum number of items.
    pub const fn capacity(&self) -> usize {
        N
    }
}

impl<T, const N: usize> Waitable for Queue<T, N> {
    fn slot(&self) -> &Slot {
        &self.shared.slot
    }

    fn kind(&self) -> WaitableKind {
        WaitableKind::Queue
    }
}

impl<T, const N: usize> fmt::Debug for Queue<T, N> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Queue {:?} {}/{}", self.shared.slot, self.len(), N)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TaskConfig;

    fn owned<const N: usize>() -> (Task, Queue<u32, N>) {
        let mut task = Task::new(TaskConfig::new("queue"));
        let q = Queue::new(&mut task);
        (task, q)
    }

    #[test]
    fn write_succeeds_until_full() {
        let (_task, q) = owned::<3>();
        assert!(!q.slot().is_set());
        assert!(q.write(1));
        assert!(q.slot().is_set());
        assert!(q.write(2));
        assert!(q.write(3));
        assert!(!q.write(4));
        assert_eq!(q.len(), 3);
    }

    #[test]
    fn reads_are_fifo_and_drop_the_bit_at_empty() {
        let (_task, q) = owned::<4>();
        for i in 0..4 {
            assert!(q.write(i));
        }
        for i in 0..4 {
            assert!(q.slot().is_set());
            assert_eq!(q.read(), i);
        }
        assert!(!q.slot().is_set());
        assert_eq!(q.try_read(), None);
    }

    #[test]
    fn clear_drains() {
        let (_task, q) = owned::<4>();
        q.write(1);
        q.write(2);
        q.clear();
        assert!(q.is_empty());
        assert!(!q.slot().is_set());
    }

    #[test]
    fn wait_all_keeps_bit_while_items_remain() {
        let (task, q) = owned::<4>();
        q.write(1);
        q.write(2);
        task.wait(&q);
        assert!(q.slot().is_set());
        assert_eq!(q.read(), 1);
        task.wait(&q);
        assert_eq!(q.read(), 2);
        assert!(!task.wait_any_timeout(&q, NoWait));
    }

    #[test]
    fn blocking_write_waits_for_room() {
        let mut task = Task::new(TaskConfig::new("blocking"));
        let q: Queue<u32, 1> = Queue::with_blocking_write(&mut task);
        assert!(q.write(1));
        let tx = q.clone();
        let producer = std::thread::spawn(move || tx.write(2));
        std::thread::sleep(std::time::Duration::from_millis(10));
        assert_eq!(q.read(), 1);
        assert!(producer.join().unwrap());
        assert_eq!(q.read(), 2);
    }
}
