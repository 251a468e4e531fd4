// Copyright (c) 2024 Linaro LTD
// SPDX-License-Identifier: Apache-2.0

//! # Low-level synchronization primitives.
//!
//! These are as direct an interface to the kernel's synchronization objects as possible.  The
//! [`crate::sync`] module builds the lock ordering protocol and the data guarding conveniences on
//! top of them, and will generally provide much more usable interfaces.

pub mod semaphore;

pub use semaphore::Semaphore;
