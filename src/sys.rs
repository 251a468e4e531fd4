// Copyright (c) 2024 Linaro LTD
// SPDX-License-Identifier: Apache-2.0

//! Kernel 'sys' module.
//!
//! The primitives the rest of the crate is built on: an event bitset with blocking waits, counting
//! semaphores, bounded FIFOs, threads and one-shot/periodic timers.  On a hosted target these are
//! implemented on operating system threads, with the same narrow interfaces a small RTOS kernel
//! would offer.
//!
//! This module contains thin, safe wrappers that stay as close to those kernel semantics as
//! possible.  The modules at the crate root ([`task`], [`sync`], ...) provide the higher level
//! interfaces that applications are meant to use.
//!
//! [`task`]: crate::task
//! [`sync`]: crate::sync

pub mod event;
pub mod queue;
pub mod sync;
pub mod thread;
pub mod timer;

pub use thread::yield_now;
pub use crate::time::sleep;

/// Return the current uptime of the system in ms.
#[inline]
pub fn uptime_get() -> i64 {
    (crate::time::now().ticks() / 1000) as i64
}

/// Busy wait.
///
/// Spin the current thread for the given number of microseconds, without giving up the CPU.
pub fn busy_wait(usec_to_wait: u32) {
    let start = crate::time::now();
    let wait = crate::time::Duration::micros(usec_to_wait as u64);
    while crate::time::now() - start < wait {
        core::hint::spin_loop();
    }
}
