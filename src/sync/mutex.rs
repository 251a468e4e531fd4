// Copyright (c) 2024 Linaro LTD
// SPDX-License-Identifier: Apache-2.0

//! Hierarchical mutexes.

use core::cell::RefCell;
use core::fmt;

use crate::config::MAX_MUTEX_NESTING;
use crate::sys::sync::Semaphore;
use crate::sys::yield_now;
use crate::task::Task;
use crate::time::{Forever, NoWait};

/// How a mutex waits for a lock held by another task.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum LockStrategy {
    /// Poll, yielding the thread between attempts.
    #[default]
    SpinYield,
    /// Block in the kernel until the lock is released.
    Block,
}

/// The ids of the mutexes a task holds, most recent on top.
pub(crate) struct MutexStack {
    held: RefCell<heapless::Vec<u32, MAX_MUTEX_NESTING>>,
}

impl MutexStack {
    pub(crate) fn new() -> MutexStack {
        MutexStack {
            held: RefCell::new(heapless::Vec::new()),
        }
    }

    /// Check that `id` may be locked next.
    fn check_lock(&self, id: u32) {
        let held = self.held.borrow();
        if let Some(&top) = held.last() {
            assert!(
                id >= top,
                "mutex {} locked while holding mutex {}: locks must be taken in increasing order",
                id,
                top
            );
        }
        assert!(
            !held.is_full(),
            "more than {} nested mutexes",
            MAX_MUTEX_NESTING
        );
    }

    fn push(&self, id: u32) {
        if self.held.borrow_mut().push(id).is_err() {
            panic!("more than {} nested mutexes", MAX_MUTEX_NESTING);
        }
    }

    fn pop(&self, id: u32) {
        match self.held.borrow_mut().pop() {
            Some(top) => assert!(
                top == id,
                "unlock of mutex {} while mutex {} was locked after it",
                id,
                top
            ),
            None => panic!("unlock of mutex {} which is not locked", id),
        }
    }

    pub(crate) fn depth(&self) -> usize {
        self.held.borrow().len()
    }
}

pub(crate) fn acquire(sem: &Semaphore, strategy: LockStrategy) {
    match strategy {
        LockStrategy::SpinYield => {
            while sem.take(NoWait).is_err() {
                yield_now();
            }
        }
        LockStrategy::Block => while sem.take(Forever).is_err() {},
    }
}

/// A mutex that takes part in the lock ordering discipline.
///
/// Clones refer to the same lock.
#[derive(Clone)]
pub struct Mutex {
    id: u32,
    sem: Semaphore,
    strategy: LockStrategy,
}

impl Mutex {
    /// Create a mutex with the given ordering id, using the default [`LockStrategy`].
    ///
    /// # Panics
    ///
    /// If `id` is zero, which is reserved.
    pub fn new(id: u32) -> Mutex {
        Mutex::with_strategy(id, LockStrategy::default())
    }

    /// Create a mutex with the given ordering id and lock strategy.
    pub fn with_strategy(id: u32, strategy: LockStrategy) -> Mutex {
        assert!(id != 0, "mutex id 0 is reserved");
        Mutex {
            id,
            sem: Semaphore::new(1, 1),
            strategy,
        }
    }

    /// The ordering id.
    pub fn id(&self) -> u32 {
        self.id
    }

    /// Lock the mutex on behalf of `task`, waiting for other tasks to release it.
    ///
    /// The ordering is checked before waiting, so a violation panics even if the lock is free.
    /// Locking a mutex that `task` already holds deadlocks.
    ///
    /// # Panics
    ///
    /// If `task` holds a mutex with a higher id, or already holds the maximum number of mutexes.
    pub fn lock(&self, task: &Task) {
        let stack = task.mutex_stack();
        stack.check_lock(self.id);
        acquire(&self.sem, self.strategy);
        stack.push(self.id);
    }

    /// Release the mutex, which must be the one `task` locked most recently.
    ///
    /// # Panics
    ///
    /// If this is not the most recently locked mutex of `task`.
    pub fn unlock(&self, task: &Task) {
        task.mutex_stack().pop(self.id);
        self.sem.give();
    }

    /// Is the mutex held by any task.
    pub fn is_locked(&self) -> bool {
        self.sem.count_get() == 0
    }
}

impl fmt::Debug for Mutex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Mutex {} {:?} locked:{}", self.id, self.strategy, self.is_locked())
    }
}

/// A mutex locked for the lifetime of this guard.
pub struct MutexSection<'a> {
    mutex: &'a Mutex,
    task: &'a Task,
}

impl<'a> MutexSection<'a> {
    /// Lock `mutex` for `task` until the section is dropped.
    pub fn new(mutex: &'a Mutex, task: &'a Task) -> MutexSection<'a> {
        mutex.lock(task);
        MutexSection { mutex, task }
    }
}

impl Drop for MutexSection<'_> {
    fn drop(&mut self) {
        self.mutex.unlock(self.task);
    }
}
