// Copyright (c) 2024 Linaro LTD
// SPDX-License-Identifier: Apache-2.0

//! Kernel one-shot and periodic timers.
//!
//! A [`HwTimer`] calls a [`Callback`] each time it expires.  The callback runs in the timer's own
//! context, never on the thread that started the timer, so it has the same restrictions as an
//! interrupt handler: it must be short and must not block.  Useful things to do from the callback
//! are setting event bits or giving a semaphore.
//!
//! On a hosted target each timer is served by a dedicated thread.  Expirations are scheduled from
//! absolute deadlines, so a periodic timer does not drift when a callback is late.  The callback
//! runs with the timer's state locked, which means that once [`HwTimer::stop`] (or a restart)
//! returns, no expiration of the previous schedule can still be delivered.

use core::fmt;
use std::sync::{Arc, Condvar, Mutex, MutexGuard};
use std::thread::JoinHandle;
use std::time::Instant as StdInstant;

use crate::error::{Error, Result, ENOMEM};
use crate::time::{to_std, Duration};

/// A timer callback.  The function will be called in timer context being passed the given data.
///
/// Note that the timer owns the data, but passes a reference to the handler.
pub struct Callback<T: Send + Sync> {
    /// The callback function.
    pub call: fn(data: &T),
    /// The data passed into the callback.
    pub data: T,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Schedule {
    Idle,
    Once { deadline: StdInstant },
    Periodic { next: StdInstant, period: std::time::Duration },
}

struct TimerState {
    schedule: Schedule,
    shutdown: bool,
}

struct TimerShared<T: Send + Sync> {
    state: Mutex<TimerState>,
    changed: Condvar,
    callback: Callback<T>,
}

impl<T: Send + Sync> TimerShared<T> {
    fn locked(&self) -> MutexGuard<'_, TimerState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }
}

/// A kernel timer that calls a callback each time it expires.
pub struct HwTimer<T: Send + Sync + 'static> {
    shared: Arc<TimerShared<T>>,
    service: Option<JoinHandle<()>>,
}

impl<T: Send + Sync + 'static> HwTimer<T> {
    /// Create a new timer, which is not running.
    pub fn new(name: &str, callback: Callback<T>) -> Result<HwTimer<T>> {
        let shared = Arc::new(TimerShared {
            state: Mutex::new(TimerState {
                schedule: Schedule::Idle,
                shutdown: false,
            }),
            changed: Condvar::new(),
            callback,
        });

        let service = {
            let shared = shared.clone();
            std::thread::Builder::new()
                .name(format!("timer:{}", name))
                .spawn(move || Self::service(&shared))
                .map_err(|_| Error(ENOMEM))?
        };

        Ok(HwTimer {
            shared,
            service: Some(service),
        })
    }

    /// Start the timer to fire once, `delay` from now.
    ///
    /// A timer that is already running is stopped first.
    pub fn start_once(&self, delay: Duration) {
        let mut state = self.shared.locked();
        state.schedule = Schedule::Once {
            deadline: StdInstant::now() + to_std(delay),
        };
        self.shared.changed.notify_all();
    }

    /// Start the timer to fire every `period`, the first time one `period` from now.
    ///
    /// A timer that is already running is stopped first.
    pub fn start_periodic(&self, period: Duration) {
        let period = to_std(period);
        let mut state = self.shared.locked();
        state.schedule = Schedule::Periodic {
            next: StdInstant::now() + period,
            period,
        };
        self.shared.changed.notify_all();
    }

    /// Stop the timer.  It is not an error to stop a timer that isn't running.
    pub fn stop(&self) {
        let mut state = self.shared.locked();
        state.schedule = Schedule::Idle;
        self.shared.changed.notify_all();
    }

    /// Is the timer currently scheduled to fire.
    pub fn is_active(&self) -> bool {
        self.shared.locked().schedule != Schedule::Idle
    }

    /// The service loop, run on the timer's own thread.
    fn service(shared: &TimerShared<T>) {
        let mut state = shared.locked();
        loop {
            if state.shutdown {
                return;
            }
            let now = StdInstant::now();
            let wake_at = match state.schedule {
                Schedule::Idle => None,
                Schedule::Once { deadline } => {
                    if now >= deadline {
                        state.schedule = Schedule::Idle;
                        (shared.callback.call)(&shared.callback.data);
                        continue;
                    }
                    Some(deadline)
                }
                Schedule::Periodic { next, period } => {
                    if now >= next {
                        // Deadlines advance by whole periods, so late callbacks don't
                        // accumulate drift.
                        let mut next = next + period;
                        while next <= now {
                            next += period;
                        }
                        state.schedule = Schedule::Periodic { next, period };
                        (shared.callback.call)(&shared.callback.data);
                        continue;
                    }
                    Some(next)
                }
            };

            state = match wake_at {
                None => shared.changed.wait(state).unwrap_or_else(|e| e.into_inner()),
                Some(at) => {
                    shared
                        .changed
                        .wait_timeout(state, at - now)
                        .unwrap_or_else(|e| e.into_inner())
                        .0
                }
            };
        }
    }
}

impl<T: Send + Sync + 'static> Drop for HwTimer<T> {
    fn drop(&mut self) {
        {
            let mut state = self.shared.locked();
            state.schedule = Schedule::Idle;
            state.shutdown = true;
            self.shared.changed.notify_all();
        }
        if let Some(service) = self.service.take() {
            let _ = service.join();
        }
    }
}

impl<T: Send + Sync + 'static> fmt::Debug for HwTimer<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "sys::HwTimer {:?}", self.shared.locked().schedule)
    }
}
