// Copyright (c) 2024 Linaro LTD
// SPDX-License-Identifier: Apache-2.0

//! Kernel event bitsets.
//!
//! An [`Event`] is a small set of bits that threads can block on.  Bits can be set from any thread
//! as well as from timer callback context, and a waiting thread can ask for any or all of a mask of
//! bits, and optionally have the bits it waited for cleared atomically as it wakes.
//!
//! Only the low [`EVENT_BITS`] bits are usable.  The remaining bits are reserved, as they are on the
//! kernels that provide this primitive natively.

use std::sync::{Condvar, Mutex, MutexGuard};

use bitflags::bitflags;

use crate::time::Timeout;

/// Number of usable bits in an [`Event`].
pub const EVENT_BITS: u32 = 24;

/// Mask of the usable bits in an [`Event`].
pub const EVENT_BITS_MASK: u32 = (1 << EVENT_BITS) - 1;

bitflags! {
    /// Options for [`Event::wait`].
    #[derive(Clone, Copy, Debug, PartialEq, Eq)]
    pub struct WaitFlags: u8 {
        /// Wait for all of the bits in the mask, instead of any of them.
        const ALL = 0b01;
        /// Clear the bits of the mask as the wait is satisfied.
        const CLEAR = 0b10;
    }
}

/// A kernel event bitset.
pub struct Event {
    bits: Mutex<u32>,
    changed: Condvar,
}

impl Event {
    /// Create a new event, with all bits clear.
    pub const fn new() -> Event {
        Event {
            bits: Mutex::new(0),
            changed: Condvar::new(),
        }
    }

    fn locked(&self) -> MutexGuard<'_, u32> {
        // Nothing panics while holding this lock, so poisoning can't carry meaning.
        self.bits.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Set the given bits, waking any waiter whose condition is now satisfied.
    ///
    /// Usable from timer callbacks.
    pub fn set(&self, mask: u32) {
        check_mask(mask);
        let mut bits = self.locked();
        *bits |= mask;
        self.changed.notify_all();
    }

    /// Clear the given bits.
    pub fn clear(&self, mask: u32) {
        check_mask(mask);
        let mut bits = self.locked();
        *bits &= !mask;
    }

    /// Read the current bits.
    pub fn get(&self) -> u32 {
        *self.locked()
    }

    /// Wait for bits in `mask` to become set.
    ///
    /// With [`WaitFlags::ALL`], waits for every bit of the mask, otherwise for at least one.  With
    /// [`WaitFlags::CLEAR`], the bits of `mask` are cleared in the same atomic step that satisfies
    /// the wait.
    ///
    /// Returns the full set of bits as they were at the moment the wait was satisfied, before any
    /// clear, or `None` if the timeout expired first.
    pub fn wait<T>(&self, mask: u32, flags: WaitFlags, timeout: T) -> Option<u32>
    where
        T: Into<Timeout>,
    {
        let clear = if flags.contains(WaitFlags::CLEAR) { mask } else { 0 };
        self.wait_clearing(mask, flags.contains(WaitFlags::ALL), clear, timeout)
    }

    /// Like [`wait`], but clears exactly the bits of `clear` as the wait is satisfied, whatever the
    /// mask waited for.
    ///
    /// [`wait`]: Event::wait
    pub fn wait_clearing<T>(&self, mask: u32, all: bool, clear: u32, timeout: T) -> Option<u32>
    where
        T: Into<Timeout>,
    {
        check_mask(mask);
        check_mask(clear);
        let timeout: Timeout = timeout.into();
        let deadline = timeout.deadline();

        let mut bits = self.locked();
        loop {
            let current = *bits;
            let satisfied = if all {
                current & mask == mask
            } else {
                current & mask != 0
            };
            if satisfied {
                *bits &= !clear;
                return Some(current);
            }

            bits = match deadline {
                None => self.changed.wait(bits).unwrap_or_else(|e| e.into_inner()),
                Some(deadline) => {
                    let now = std::time::Instant::now();
                    if now >= deadline {
                        return None;
                    }
                    self.changed
                        .wait_timeout(bits, deadline - now)
                        .unwrap_or_else(|e| e.into_inner())
                        .0
                }
            };
        }
    }
}

impl Default for Event {
    fn default() -> Self {
        Event::new()
    }
}

impl core::fmt::Debug for Event {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "sys::Event {:#08x}", self.get())
    }
}

fn check_mask(mask: u32) {
    assert!(
        mask & !EVENT_BITS_MASK == 0,
        "event mask {:#x} uses reserved bits",
        mask
    );
}
