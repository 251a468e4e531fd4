// Copyright (c) 2024 Linaro LTD
// SPDX-License-Identifier: Apache-2.0

//! Higher level synchronization primitives.
//!
//! Deadlocks between tasks are avoided with a global lock ordering discipline.  Every [`Mutex`]
//! has a numeric id, and a task may only lock mutexes in non-decreasing id order.  Each task keeps
//! the ids it holds on a small stack, and an out of order lock, or an unlock that doesn't match the
//! most recent lock, panics at the point of the mistake rather than deadlocking some time later.
//!
//! [`SimpleMutex`] and [`Pool`] sit outside of that discipline.  They are meant for short, leaf
//! level critical sections that never take another lock while held.

mod mutex;
mod pool;
mod simple;

pub use mutex::{LockStrategy, Mutex, MutexSection};
pub(crate) use mutex::MutexStack;
pub use pool::Pool;
pub use simple::{SimpleMutex, SimpleMutexGuard};
