// Copyright (c) 2024 Linaro LTD
// SPDX-License-Identifier: Apache-2.0

//! Kernel threads
//!
//! This is a fairly low level (but still safe) interface to threads.  A [`Thread`] is configured
//! with the attributes an embedded kernel asks for at creation time (name, priority, stack size
//! and the core to run on) and then started with [`Thread::spawn`].
//!
//! ```
//! use rtsync::sys::thread::Thread;
//!
//! let mut thread = Thread::new("worker");
//! thread.set_priority(5).set_stack_size(4096);
//! let child = thread.spawn(move || {
//!     // thread code...
//! }).unwrap();
//! child.join().unwrap();
//! ```
//!
//! On a hosted target, the priority and core are recorded and reported, but the host scheduler
//! decides where and when the thread actually runs.

use core::fmt;

use crate::config::DEFAULT_STACK_SIZE;
use crate::error::{Error, Result, ENOMEM};

/// Smallest stack given to a host thread.  Smaller budgets are raised to this, as the host
/// runtime needs room of its own on every thread.
pub const HOST_MIN_STACK_SIZE: usize = 32 * 1024;

/// A thread that has been configured, but not yet started.
pub struct Thread {
    name: String,
    /// The initial priority of this thread.
    priority: u32,
    /// Stack size in bytes.
    stack_size: usize,
    /// The execution unit this thread is meant to be pinned to.
    core: u32,
}

impl Thread {
    /// Start describing a new thread with default attributes.
    pub fn new(name: impl Into<String>) -> Thread {
        Thread {
            name: name.into(),
            priority: 0,
            stack_size: DEFAULT_STACK_SIZE,
            core: 0,
        }
    }

    /// Set the priority the thread will start with.
    pub fn set_priority(&mut self, priority: u32) -> &mut Self {
        self.priority = priority;
        self
    }

    /// Set the stack size, in bytes.
    pub fn set_stack_size(&mut self, stack_size: usize) -> &mut Self {
        self.stack_size = stack_size;
        self
    }

    /// Set the core the thread should run on.
    pub fn set_core(&mut self, core: u32) -> &mut Self {
        self.core = core;
        self
    }

    /// Start the thread, running `child`.
    ///
    /// Fails only if the host cannot create another thread.
    pub fn spawn<F>(self, child: F) -> Result<ThreadHandle>
    where
        F: FnOnce() + Send + 'static,
    {
        log::debug!(
            "spawn thread {} (prio {}, stack {}, core {})",
            self.name,
            self.priority,
            self.stack_size,
            self.core
        );
        let inner = std::thread::Builder::new()
            .name(self.name.clone())
            .stack_size(self.stack_size.max(HOST_MIN_STACK_SIZE))
            .spawn(child)
            .map_err(|_| Error(ENOMEM))?;
        Ok(ThreadHandle {
            name: self.name,
            inner,
        })
    }
}

impl fmt::Debug for Thread {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "sys::Thread {} prio:{}", self.name, self.priority)
    }
}

/// A handle to a running thread.
pub struct ThreadHandle {
    name: String,
    inner: std::thread::JoinHandle<()>,
}

impl ThreadHandle {
    /// The name the thread was created with.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Has the thread finished running.
    pub fn is_finished(&self) -> bool {
        self.inner.is_finished()
    }

    /// Wait for the thread to exit.
    ///
    /// Returns the panic payload if the thread panicked.
    pub fn join(self) -> std::thread::Result<()> {
        self.inner.join()
    }
}

impl fmt::Debug for ThreadHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "sys::ThreadHandle {}", self.name)
    }
}

/// Give up the CPU to any other ready thread.
#[inline]
pub fn yield_now() {
    std::thread::yield_now();
}
