// Copyright (c) 2024 Linaro LTD
// SPDX-License-Identifier: Apache-2.0

//! Logging through printk
//!
//! A log handler (for the [`log`] crate) that writes each record to the console, prefixed with the
//! uptime in milliseconds and the name of the logging thread.

use log::{Log, Metadata, Record};

use crate::printkln;

/// A simple log handler, built around printk.
pub(super) struct PrintkLogger;

impl Log for PrintkLogger {
    fn enabled(&self, metadata: &Metadata<'_>) -> bool {
        metadata.level() <= log::max_level()
    }

    fn log(&self, record: &Record<'_>) {
        if !self.enabled(record.metadata()) {
            return;
        }
        let thread = std::thread::current();
        printkln!(
            "[{:>8}] {} {}: {}: {}",
            crate::sys::uptime_get(),
            thread.name().unwrap_or("-"),
            record.level(),
            record.target(),
            record.args()
        );
    }

    // Every record is flushed as it is written.
    fn flush(&self) {}
}

pub(super) static PRINTK_LOGGER: PrintkLogger = PrintkLogger;
