// Copyright (c) 2024 Linaro LTD
// SPDX-License-Identifier: Apache-2.0

//! Time types.
//!
//! Time is kept with the [`fugit`] crate, using a fixed microsecond tick.  The timers in this crate
//! are specified in microseconds, so using a microsecond base avoids any conversion on the way to
//! the kernel layer.
//!
//! Calls into the kernel that can block take a [`Timeout`].  Anything that converts into a
//! `Timeout` can be passed: a [`Duration`], or one of the two markers [`Forever`] and [`NoWait`].

use std::sync::OnceLock;
use std::time::Instant as StdInstant;

/// The tick rate of all time values: one tick per microsecond.
pub const SYS_FREQUENCY: u32 = 1_000_000;

/// The underlying tick value.
pub type Tick = u64;

/// A duration in microsecond ticks.
pub type Duration = fugit::Duration<Tick, 1, SYS_FREQUENCY>;

/// An instant in microsecond ticks, measured from the first use of the clock.
pub type Instant = fugit::Instant<Tick, 1, SYS_FREQUENCY>;

static EPOCH: OnceLock<StdInstant> = OnceLock::new();

/// Return the current uptime as an [`Instant`].
///
/// The epoch is the first call to any time function in the process, so values are only meaningful
/// relative to each other.
pub fn now() -> Instant {
    let epoch = EPOCH.get_or_init(StdInstant::now);
    Instant::from_ticks(epoch.elapsed().as_micros() as Tick)
}

/// Convert one of our durations into the one the host kernel uses.
pub(crate) fn to_std(duration: Duration) -> std::time::Duration {
    std::time::Duration::from_micros(duration.ticks())
}

/// How long a blocking kernel call is allowed to wait.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Timeout {
    /// Return immediately if the operation can't be performed.
    NoWait,
    /// Wait at most this long.
    After(Duration),
    /// Wait as long as necessary.
    Forever,
}

impl Timeout {
    /// Is this the `NoWait` timeout.
    pub fn is_no_wait(&self) -> bool {
        matches!(self, Timeout::NoWait)
    }

    /// The deadline this timeout corresponds to, if any, relative to the host clock.
    pub(crate) fn deadline(&self) -> Option<StdInstant> {
        match self {
            Timeout::NoWait => Some(StdInstant::now()),
            Timeout::After(d) => Some(StdInstant::now() + to_std(*d)),
            Timeout::Forever => None,
        }
    }
}

/// A sentinel value that can be used as a [`Timeout`] to indicate the operation should wait as
/// long as needed.
#[derive(Clone, Copy, Debug)]
pub struct Forever;

impl From<Forever> for Timeout {
    fn from(_: Forever) -> Timeout {
        Timeout::Forever
    }
}

/// A sentinel value that can be used as a [`Timeout`] to indicate the operation should not wait
/// at all.
#[derive(Clone, Copy, Debug)]
pub struct NoWait;

impl From<NoWait> for Timeout {
    fn from(_: NoWait) -> Timeout {
        Timeout::NoWait
    }
}

impl From<Duration> for Timeout {
    fn from(value: Duration) -> Timeout {
        if value.ticks() == 0 {
            Timeout::NoWait
        } else {
            Timeout::After(value)
        }
    }
}

/// Put the current thread to sleep for the given duration.
pub fn sleep(duration: Duration) {
    std::thread::sleep(to_std(duration));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_duration_is_no_wait() {
        let t: Timeout = Duration::from_ticks(0).into();
        assert!(t.is_no_wait());
        let t: Timeout = Duration::millis(3).into();
        assert_eq!(t, Timeout::After(Duration::micros(3000)));
    }

    #[test]
    fn clock_is_monotonic() {
        let a = now();
        sleep(Duration::millis(2));
        let b = now();
        assert!(b - a >= Duration::millis(2));
    }
}
