// Copyright (c) 2024 Linaro LTD
// SPDX-License-Identifier: Apache-2.0

//! Flags
//!
//! A [`Flag`] is the simplest waitable: a notification without payload.  Any thread can set it,
//! and the owning task waits for it.  Setting a flag that is already set has no further effect,
//! so a flag does not count how often it was set.

use core::fmt;

use crate::task::Task;
use crate::waitable::{Slot, Waitable, WaitableKind};

/// A notification bit owned by a task.
///
/// Cloning the flag gives another handle to the same bit, which can be moved to the thread that
/// will be setting it.
#[derive(Clone)]
pub struct Flag {
    slot: Slot,
}

impl Flag {
    /// Create a new flag, reserving one of the bits of `task`.
    pub fn new(task: &mut Task) -> Flag {
        Flag {
            slot: task.register_waitable(WaitableKind::Flag),
        }
    }

    /// Raise the flag, waking the owning task if it is waiting for it.
    pub fn set(&self) {
        self.slot.set();
    }

    /// Lower the flag without waiting for it.
    pub fn clear(&self) {
        self.slot.clear();
    }

    /// Is the flag currently raised.
    pub fn is_set(&self) -> bool {
        self.slot.is_set()
    }
}

impl Waitable for Flag {
    fn slot(&self) -> &Slot {
        &self.slot
    }

    fn kind(&self) -> WaitableKind {
        WaitableKind::Flag
    }
}

impl fmt::Debug for Flag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Flag {:?} set:{}", self.slot, self.is_set())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TaskConfig;

    #[test]
    fn set_is_idempotent() {
        let mut task = Task::new(TaskConfig::new("flag"));
        let flag = Flag::new(&mut task);
        flag.set();
        flag.set();
        task.wait(&flag);
        assert!(!flag.is_set());
    }

    #[test]
    fn clear_lowers_without_waiting() {
        let mut task = Task::new(TaskConfig::new("flag"));
        let flag = Flag::new(&mut task);
        flag.set();
        assert!(flag.is_set());
        flag.clear();
        assert!(!flag.is_set());
        assert!(!task.wait_any_timeout(&flag, crate::time::NoWait));
    }

    #[test]
    fn set_from_another_thread() {
        let mut task = Task::new(TaskConfig::new("flag"));
        let flag = Flag::new(&mut task);
        let remote = flag.clone();
        let setter = std::thread::spawn(move || remote.set());
        task.wait(&flag);
        setter.join().unwrap();
    }
}
