// Copyright (c) 2024 Linaro LTD
// SPDX-License-Identifier: Apache-2.0

//! # Kernel errors
//!
//! This module contains an `Error` and `Result` type for the calls into the kernel layer in
//! [`sys`].  Only the operations that can give up (a timed out take, a full queue with no wait)
//! return these.  Misuse of the synchronization primitives themselves (bit space exhausted, wrong
//! lock order, and so on) is a design defect in the caller and panics instead.
//!
//! Like the errno values the kernel primitives are modeled after, the error just wraps the numeric
//! code.
//!
//! [`sys`]: crate::sys

use core::fmt;

/// Operation did not complete before its timeout.
pub const EAGAIN: u32 = 11;

/// Not enough resources to create a kernel object.
pub const ENOMEM: u32 = 12;

/// Operation was asked not to wait, and would have had to.
pub const EBUSY: u32 = 16;

/// A kernel error.
///
/// Represents an error result returned from the kernel layer.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct Error(pub u32);

impl Error {
    /// Was this error caused by a timeout expiring.
    pub fn is_timeout(&self) -> bool {
        self.0 == EAGAIN
    }

    /// Was this error caused by a `NoWait` call that would have blocked.
    pub fn would_block(&self) -> bool {
        self.0 == EBUSY
    }
}

impl core::error::Error for Error {}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "kernel error errno:{}", self.0)
    }
}

impl fmt::Debug for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "kernel error errno:{}", self.0)
    }
}

/// Wraps a value with a possible kernel error.
pub type Result<T> = core::result::Result<T, Error>;

/// Map the outcome of a wait into a Result.
///
/// When the wait gave up, a `NoWait` request reports `EBUSY` and a bounded wait reports `EAGAIN`.
#[inline(always)]
pub(crate) fn to_result<T>(value: Option<T>, no_wait: bool) -> Result<T> {
    match value {
        Some(v) => Ok(v),
        None if no_wait => Err(Error(EBUSY)),
        None => Err(Error(EAGAIN)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn maps_wait_outcomes() {
        assert_eq!(to_result(Some(3), true), Ok(3));
        assert!(to_result::<()>(None, true).unwrap_err().would_block());
        assert!(to_result::<()>(None, false).unwrap_err().is_timeout());
    }

    #[test]
    fn display_includes_errno() {
        assert_eq!(Error(EAGAIN).to_string(), "kernel error errno:11");
    }
}
