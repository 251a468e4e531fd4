// Copyright (c) 2024 Linaro LTD
// SPDX-License-Identifier: Apache-2.0

//! Bounded kernel FIFO.
//!
//! A fixed capacity message queue.  The storage is allocated once, up front, with room for `N`
//! messages, so sending never allocates.  Both sending and receiving can wait, with a
//! [`Timeout`].
//!
//! This is mainly intended to be used by the implementation of [`crate::queue`], which adds the
//! readiness bit that lets a task multiplex the queue with its other waitables.

use core::fmt;
use std::sync::{Condvar, Mutex, MutexGuard};

use arraydeque::ArrayDeque;

use crate::error::{to_result, Result};
use crate::time::Timeout;

/// Error returned from [`Queue::send`] when the message could not be queued.  The message is
/// given back.
pub struct SendError<T>(pub T);

impl<T> fmt::Debug for SendError<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SendError(..)")
    }
}

/// A bounded FIFO of up to `N` messages.
pub struct Queue<T, const N: usize> {
    items: Mutex<ArrayDeque<T, N>>,
    not_empty: Condvar,
    not_full: Condvar,
}

impl<T, const N: usize> Queue<T, N> {
    /// Create a new, empty, queue.
    pub fn new() -> Queue<T, N> {
        assert!(N > 0, "Zero capacity queues are not supported");
        Queue {
            items: Mutex::new(ArrayDeque::new()),
            not_empty: Condvar::new(),
            not_full: Condvar::new(),
        }
    }

    fn locked(&self) -> MutexGuard<'_, ArrayDeque<T, N>> {
        self.items.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Append a message to the end of the queue.
    ///
    /// If the queue is full, waits up to `timeout` for room.  On failure, the message is returned
    /// inside the error.
    pub fn send<D>(&self, msg: T, timeout: D) -> core::result::Result<(), SendError<T>>
    where
        D: Into<Timeout>,
    {
        let deadline = timeout.into().deadline();
        let mut items = self.locked();
        while items.is_full() {
            items = match deadline {
                None => self.not_full.wait(items).unwrap_or_else(|e| e.into_inner()),
                Some(deadline) => {
                    let now = std::time::Instant::now();
                    if now >= deadline {
                        return Err(SendError(msg));
                    }
                    self.not_full
                        .wait_timeout(items, deadline - now)
                        .unwrap_or_else(|e| e.into_inner())
                        .0
                }
            };
        }
        // Room was checked for under the same lock.
        if let Err(e) = items.push_back(msg) {
            return Err(SendError(e.element));
        }
        self.not_empty.notify_one();
        Ok(())
    }

    /// Remove the first message from the queue.
    ///
    /// The timeout value can be [`Forever`] to block until there is a message, [`NoWait`] to
    /// check and immediately return if there is no message, or a [`Duration`] to indicate a
    /// specific timeout.
    ///
    /// [`Forever`]: crate::time::Forever
    /// [`NoWait`]: crate::time::NoWait
    /// [`Duration`]: crate::time::Duration
    pub fn recv<D>(&self, timeout: D) -> Result<T>
    where
        D: Into<Timeout>,
    {
        let timeout: Timeout = timeout.into();
        let deadline = timeout.deadline();
        let mut items = self.locked();
        let msg = loop {
            if let Some(msg) = items.pop_front() {
                self.not_full.notify_one();
                break Some(msg);
            }
            items = match deadline {
                None => self.not_empty.wait(items).unwrap_or_else(|e| e.into_inner()),
                Some(deadline) => {
                    let now = std::time::Instant::now();
                    if now >= deadline {
                        break None;
                    }
                    self.not_empty
                        .wait_timeout(items, deadline - now)
                        .unwrap_or_else(|e| e.into_inner())
                        .0
                }
            };
        };
        to_result(msg, timeout.is_no_wait())
    }

    /// Number of messages waiting in the queue.
    pub fn len(&self) -> usize {
        self.locked().len()
    }

    /// Is the queue empty.
    pub fn is_empty(&self) -> bool {
        self.locked().is_empty()
    }

    /// The fixed capacity of the queue.
    pub const fn capacity(&self) -> usize {
        N
    }
}

impl<T, const N: usize> Default for Queue<T, N> {
    fn default() -> Self {
        Queue::new()
    }
}

impl<T, const N: usize> fmt::Debug for Queue<T, N> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "sys::Queue {}/{}", self.len(), N)
    }
}
