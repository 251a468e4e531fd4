// Copyright (c) 2024 Linaro LTD
// SPDX-License-Identifier: Apache-2.0

//! Build configuration.
//!
//! Fixed limits of the synchronization layer, and the attributes a [`Task`] is created with.
//!
//! [`Task`]: crate::task::Task

/// Maximum number of waitables a single task can own.  Each one reserves a bit of the task's
/// event bitset, and the kernel only provides this many.
pub const MAX_WAITABLES: usize = crate::sys::event::EVENT_BITS as usize;

/// Maximum depth of nested mutex locks within one task.
pub const MAX_MUTEX_NESTING: usize = 20;

/// Shortest duration a timer can be started with, in microseconds.  Shorter intervals are
/// dominated by the overhead of the timer callback itself.
pub const MIN_TIMER_DURATION_US: u64 = 50;

/// Stack size, in bytes, for threads that don't ask for one.
pub const DEFAULT_STACK_SIZE: usize = 64 * 1024;

/// Mutex id reserved for locks taken while logging.  It is high, so that logging can happen
/// while holding almost any other lock.
pub const LOGGER_MUTEX_ID: u32 = 1 << 30;

/// The attributes a task's thread is created with.
#[derive(Clone, Debug)]
pub struct TaskConfig {
    /// Name, for humans.
    pub name: String,
    /// Scheduler priority.
    pub priority: u32,
    /// Stack budget in bytes.
    pub stack_size: usize,
    /// The execution unit the task should run on.
    pub core: u32,
}

impl TaskConfig {
    /// A configuration with the given name and default values for everything else.
    pub fn new(name: impl Into<String>) -> Self {
        TaskConfig {
            name: name.into(),
            ..TaskConfig::default_values()
        }
    }

    /// Like `Default::default`, but without a name.
    pub fn default_values() -> Self {
        TaskConfig {
            name: String::new(),
            priority: 1,
            stack_size: DEFAULT_STACK_SIZE,
            core: 0,
        }
    }

    /// Set the priority.
    pub fn priority(mut self, priority: u32) -> Self {
        self.priority = priority;
        self
    }

    /// Set the stack budget.
    pub fn stack_size(mut self, stack_size: usize) -> Self {
        self.stack_size = stack_size;
        self
    }

    /// Set the core.
    pub fn core(mut self, core: u32) -> Self {
        self.core = core;
        self
    }
}

impl Default for TaskConfig {
    fn default() -> Self {
        TaskConfig::default_values()
    }
}
