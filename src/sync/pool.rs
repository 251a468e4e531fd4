// Copyright (c) 2024 Linaro LTD
// SPDX-License-Identifier: Apache-2.0

//! A single shared value, guarded by a [`SimpleMutex`].

use core::cell::UnsafeCell;
use core::fmt;

use super::SimpleMutex;

/// One value of `T` shared between tasks.
///
/// Writers replace the whole value and readers get a copy of it, so no reference into the value
/// ever escapes the lock.
pub struct Pool<T> {
    lock: SimpleMutex,
    value: UnsafeCell<T>,
}

// SAFETY: The value is only reached while holding `lock`, and only by value, so sharing the pool
// is sound whenever the value itself can move between threads.
unsafe impl<T: Send> Sync for Pool<T> {}

impl<T> Pool<T> {
    /// Create a pool holding `value`.
    pub fn new(value: T) -> Pool<T> {
        Pool {
            lock: SimpleMutex::new(),
            value: UnsafeCell::new(value),
        }
    }

    /// Replace the value.
    pub fn write(&self, value: T) {
        let old = {
            let _guard = self.lock.lock();
            // SAFETY: Exclusive under the lock.
            unsafe { core::mem::replace(&mut *self.value.get(), value) }
        };
        drop(old);
    }

    /// Consume the pool, returning the value.
    pub fn into_inner(self) -> T {
        self.value.into_inner()
    }
}

impl<T: Clone> Pool<T> {
    /// A copy of the current value.
    pub fn read(&self) -> T {
        let _guard = self.lock.lock();
        // SAFETY: Exclusive under the lock.
        unsafe { (*self.value.get()).clone() }
    }
}

impl<T: Default> Default for Pool<T> {
    fn default() -> Self {
        Pool::new(T::default())
    }
}

impl<T> fmt::Debug for Pool<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Pool<{}> {:?}", core::any::type_name::<T>(), self.lock)
    }
}
