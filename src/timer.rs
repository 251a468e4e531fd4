// Copyright (c) 2024 Linaro LTD
// SPDX-License-Identifier: Apache-2.0

//! Waitable timers
//!
//! A [`Timer`] sets its bit in the owning task's event each time it expires.  The expiry is
//! delivered from timer context, which is only ever given a [`BitSetter`] for the one bit, so it
//! can't touch anything else of the task.
//!
//! Timers are edge triggered like flags: waiting for the timer consumes the expiry.  The simplest
//! use is [`Timer::sleep`], which starts the timer and waits for it.  A periodic timer combined
//! with [`Task::wait_any`] gives a task a steady tick while it also serves its queues.
//!
//! [`Task::wait_any`]: crate::task::Task::wait_any

use core::fmt;

use crate::config::MIN_TIMER_DURATION_US;
use crate::error::Result;
use crate::sys::timer::{Callback, HwTimer};
use crate::task::Task;
use crate::time::Duration;
use crate::waitable::{BitSetter, Slot, Waitable, WaitableKind};

/// A one-shot or periodic timer owned by a task.
pub struct Timer {
    hw: HwTimer<BitSetter>,
    slot: Slot,
}

fn expired(bit: &BitSetter) {
    bit.set();
}

fn check_duration(duration: Duration) {
    assert!(
        duration.ticks() >= MIN_TIMER_DURATION_US,
        "timer duration {}us is below the minimum of {}us",
        duration.ticks(),
        MIN_TIMER_DURATION_US
    );
}

impl Timer {
    /// Create a stopped timer owned by `task`.
    ///
    /// Fails if the kernel can't provide another timer.
    pub fn new(task: &mut Task) -> Result<Timer> {
        let slot = task.register_waitable(WaitableKind::Timer);
        let name = format!("{}:{}", task.name(), slot.bit());
        let hw = HwTimer::new(
            &name,
            Callback {
                call: expired,
                data: slot.setter(),
            },
        )?;
        log::debug!("task {}: timer on bit {}", task.name(), slot.bit());
        Ok(Timer { hw, slot })
    }

    /// Fire once, `duration` from now.
    ///
    /// Restarting a running timer replaces its schedule, and an expiry that has not been waited
    /// for yet is discarded.
    ///
    /// # Panics
    ///
    /// If `duration` is shorter than [`MIN_TIMER_DURATION_US`].
    pub fn start(&self, duration: Duration) {
        check_duration(duration);
        self.hw.stop();
        self.slot.clear();
        self.hw.start_once(duration);
    }

    /// Fire every `period`, starting one period from now.
    ///
    /// # Panics
    ///
    /// If `period` is shorter than [`MIN_TIMER_DURATION_US`].
    pub fn start_periodic(&self, period: Duration) {
        check_duration(period);
        self.hw.stop();
        self.slot.clear();
        self.hw.start_periodic(period);
    }

    /// Stop the timer.  An expiry that was already delivered stays pending.
    pub fn stop(&self) {
        self.hw.stop();
    }

    /// Is the timer scheduled to fire.
    pub fn is_active(&self) -> bool {
        self.hw.is_active()
    }

    /// Block `task` for `duration`.
    pub fn sleep(&self, task: &Task, duration: Duration) {
        self.start(duration);
        task.wait(self);
    }

    /// Block `task` for `us` microseconds.
    pub fn sleep_us(&self, task: &Task, us: u64) {
        self.sleep(task, Duration::micros(us));
    }
}

impl Waitable for Timer {
    fn slot(&self) -> &Slot {
        &self.slot
    }

    fn kind(&self) -> WaitableKind {
        WaitableKind::Timer
    }
}

impl fmt::Debug for Timer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Timer {:?} {:?}", self.slot, self.hw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TaskConfig;
    use crate::time::now;

    #[test]
    fn sleep_waits_at_least_the_duration() {
        let mut task = Task::new(TaskConfig::new("sleeper"));
        let timer = Timer::new(&mut task).unwrap();
        let start = now();
        timer.sleep_us(&task, 5_000);
        assert!(now() - start >= Duration::micros(5_000));
        assert!(!timer.is_active());
    }

    #[test]
    fn periodic_timer_ticks() {
        let mut task = Task::new(TaskConfig::new("ticker"));
        let timer = Timer::new(&mut task).unwrap();
        timer.start_periodic(Duration::millis(2));
        for _ in 0..5 {
            task.wait(&timer);
        }
        assert!(timer.is_active());
        timer.stop();
        assert!(!timer.is_active());
    }

    #[test]
    fn minimum_duration_is_accepted() {
        let mut task = Task::new(TaskConfig::new("short"));
        let timer = Timer::new(&mut task).unwrap();
        timer.sleep(&task, Duration::micros(MIN_TIMER_DURATION_US));
    }

    #[test]
    #[should_panic(expected = "below the minimum")]
    fn too_short_panics() {
        let mut task = Task::new(TaskConfig::new("short"));
        let timer = Timer::new(&mut task).unwrap();
        timer.start(Duration::micros(49));
    }
}
