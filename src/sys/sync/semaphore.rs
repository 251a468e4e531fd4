// Copyright (c) 2024 Linaro LTD
// SPDX-License-Identifier: Apache-2.0

//! Kernel Semaphore support
//!
//! This is one of the few of the `sys` primitives that is actually perfectly usable on its own,
//! without needing additional wrappers.
//!
//! These are counting semaphores, with both an upper and lower bound on the count.  Note that
//! calling 'give' on a semaphore that is at the maximum count will discard the 'give' operation,
//! which in situation where counting is actually desired, will result in the count being
//! incorrect.

use core::fmt;
use std::sync::{Arc, Condvar, Mutex, MutexGuard};

use crate::{
    error::{to_result, Result},
    time::Timeout,
};

struct SemState {
    count: u32,
    limit: u32,
}

struct SemInner {
    state: Mutex<SemState>,
    given: Condvar,
}

/// A kernel counting semaphore.
///
/// Clones refer to the same semaphore, so it can be handed to other threads directly.
#[derive(Clone)]
pub struct Semaphore {
    inner: Arc<SemInner>,
}

impl Semaphore {
    /// Create a new semaphore.
    ///
    /// `initial_count` is the count the semaphore starts with, and `limit` the maximum the count
    /// can reach.
    pub fn new(initial_count: u32, limit: u32) -> Semaphore {
        assert!(limit > 0, "semaphore limit must be nonzero");
        assert!(initial_count <= limit, "semaphore initial count above limit");
        Semaphore {
            inner: Arc::new(SemInner {
                state: Mutex::new(SemState {
                    count: initial_count,
                    limit,
                }),
                given: Condvar::new(),
            }),
        }
    }

    fn locked(&self) -> MutexGuard<'_, SemState> {
        self.inner.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Take a semaphore.
    ///
    /// Can be called from a timer callback if called with [`NoWait`].
    ///
    /// [`NoWait`]: crate::time::NoWait
    pub fn take<T>(&self, timeout: T) -> Result<()>
    where
        T: Into<Timeout>,
    {
        let timeout: Timeout = timeout.into();
        let deadline = timeout.deadline();
        let mut state = self.locked();
        let taken = loop {
            if state.count > 0 {
                state.count -= 1;
                break Some(());
            }
            state = match deadline {
                None => self.inner.given.wait(state).unwrap_or_else(|e| e.into_inner()),
                Some(deadline) => {
                    let now = std::time::Instant::now();
                    if now >= deadline {
                        break None;
                    }
                    self.inner
                        .given
                        .wait_timeout(state, deadline - now)
                        .unwrap_or_else(|e| e.into_inner())
                        .0
                }
            };
        };
        to_result(taken, timeout.is_no_wait())
    }

    /// Give a semaphore.
    ///
    /// This routine gives to the semaphore, unless the semaphore is already at its maximum
    /// permitted count.
    pub fn give(&self) {
        let mut state = self.locked();
        if state.count < state.limit {
            state.count += 1;
            self.inner.given.notify_one();
        }
    }

    /// Resets a semaphore's count to zero.
    pub fn reset(&self) {
        self.locked().count = 0;
    }

    /// Get a semaphore's count.
    ///
    /// Returns the current count.
    pub fn count_get(&self) -> usize {
        self.locked().count as usize
    }
}

impl fmt::Debug for Semaphore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "sys::Semaphore")
    }
}
