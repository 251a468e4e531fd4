// Copyright (c) 2024 Linaro LTD
// SPDX-License-Identifier: Apache-2.0

//! Logging
//!
//! Everything in this crate logs through the [`log`] facade, and nothing is printed until a logger
//! is installed.  Applications can install any `log` backend, or call [`set_logger`] for the
//! built-in one, which writes each record to the console through `printkln!`.
//!
//! Messages are formatted eagerly on the logging thread.  A logging call therefore costs the
//! formatting time whenever its level is enabled, which matters inside [`Handler`] listeners.
//!
//! [`Handler`]: crate::handler::Handler

use std::sync::OnceLock;

use log::{LevelFilter, Log, SetLoggerError};

use crate::config::LOGGER_MUTEX_ID;
use crate::sync::Mutex;

mod impl_printk;

// The log crate has different entry points based on whether or not the target has atomic
// pointers.  Without them, installing the logger is only sound before other threads start.
cfg_if::cfg_if! {
    if #[cfg(target_has_atomic = "ptr")] {
        /// Install the console logger, with the given maximum level.
        pub fn set_logger_with_level(level: LevelFilter) -> Result<(), SetLoggerError> {
            set_logger_internal(&impl_printk::PRINTK_LOGGER, level)
        }

        fn set_logger_internal(logger: &'static dyn Log, level: LevelFilter) -> Result<(), SetLoggerError> {
            log::set_logger(logger)?;
            log::set_max_level(level);
            Ok(())
        }
    } else {
        /// Install the console logger, with the given maximum level.
        ///
        /// # Safety
        ///
        /// Must be called before any other thread is started.
        pub unsafe fn set_logger_with_level(level: LevelFilter) -> Result<(), SetLoggerError> {
            set_logger_internal(&impl_printk::PRINTK_LOGGER, level)
        }

        unsafe fn set_logger_internal(logger: &'static dyn Log, level: LevelFilter) -> Result<(), SetLoggerError> {
            log::set_logger_racy(logger)?;
            log::set_max_level_racy(level);
            Ok(())
        }
    }
}

cfg_if::cfg_if! {
    if #[cfg(target_has_atomic = "ptr")] {
        /// Install the console logger at `Info` level.
        pub fn set_logger() -> Result<(), SetLoggerError> {
            set_logger_with_level(LevelFilter::Info)
        }
    } else {
        /// Install the console logger at `Info` level.
        ///
        /// # Safety
        ///
        /// Must be called before any other thread is started.
        pub unsafe fn set_logger() -> Result<(), SetLoggerError> {
            set_logger_with_level(LevelFilter::Info)
        }
    }
}

/// The mutex guarding multi-line console output.
///
/// Its id is [`LOGGER_MUTEX_ID`], above any application mutex, so a task can take it while
/// holding its other locks.  Records from the console logger don't take it; it is for tasks that
/// print several lines that must stay together.
pub fn console_mutex() -> &'static Mutex {
    static CONSOLE: OnceLock<Mutex> = OnceLock::new();
    CONSOLE.get_or_init(|| Mutex::new(LOGGER_MUTEX_ID))
}
