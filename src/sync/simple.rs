// Copyright (c) 2024 Linaro LTD
// SPDX-License-Identifier: Apache-2.0

//! A mutex outside of the ordering discipline.

use core::fmt;
use core::marker::PhantomData;

use super::mutex::{acquire, LockStrategy};
use crate::sys::sync::Semaphore;
use crate::time::NoWait;

/// A plain spin-yield lock, with no id and no ordering checks.
///
/// Only suitable for short sections that don't take any other lock while held.
pub struct SimpleMutex {
    sem: Semaphore,
}

/// An RAII implementation of a "scoped lock" of a [`SimpleMutex`].  The lock is released when the
/// guard is dropped.
pub struct SimpleMutexGuard<'a> {
    lock: &'a SimpleMutex,
    // Released by the thread that took it.
    _nosend: PhantomData<*const ()>,
}

impl SimpleMutex {
    /// Create an unlocked mutex.
    pub fn new() -> SimpleMutex {
        SimpleMutex {
            sem: Semaphore::new(1, 1),
        }
    }

    /// Take the lock, spinning and yielding until it is free.
    pub fn lock(&self) -> SimpleMutexGuard<'_> {
        acquire(&self.sem, LockStrategy::SpinYield);
        SimpleMutexGuard {
            lock: self,
            _nosend: PhantomData,
        }
    }

    /// Take the lock only if it is free.
    pub fn try_lock(&self) -> Option<SimpleMutexGuard<'_>> {
        self.sem.take(NoWait).ok().map(|()| SimpleMutexGuard {
            lock: self,
            _nosend: PhantomData,
        })
    }

    /// Is the lock held.
    pub fn is_locked(&self) -> bool {
        self.sem.count_get() == 0
    }
}

impl Default for SimpleMutex {
    fn default() -> Self {
        SimpleMutex::new()
    }
}

impl fmt::Debug for SimpleMutex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SimpleMutex locked:{}", self.is_locked())
    }
}

impl Drop for SimpleMutexGuard<'_> {
    fn drop(&mut self) {
        self.lock.sem.give();
    }
}
