// Copyright (c) 2024 Linaro LTD
// SPDX-License-Identifier: Apache-2.0

//! Console output.
//!
//! `printk!` and `printkln!` write straight to the console, with the same syntax as std's
//! [`print!`] and [`println!`].  Each call holds the console for the whole message, so output from
//! different tasks never interleaves within a message.
//!
//! Write errors are dropped: there is nowhere left to report them.

use std::fmt::Arguments;
use std::io::Write;

/// Print to the console, without a newline.
#[macro_export]
macro_rules! printk {
    ($($arg:tt)*) => {{
        $crate::printk::printk(format_args!($($arg)*));
    }};
}

/// Print to the console, with a newline.
#[macro_export]
macro_rules! printkln {
    ($($arg:tt)*) => {{
        $crate::printk::printkln(format_args!($($arg)*));
    }};
}

#[doc(hidden)]
pub fn printk(args: Arguments<'_>) {
    let mut console = std::io::stdout().lock();
    let _ = console.write_fmt(args);
    let _ = console.flush();
}

#[doc(hidden)]
pub fn printkln(args: Arguments<'_>) {
    let mut console = std::io::stdout().lock();
    let _ = console.write_fmt(args);
    let _ = console.write_all(b"\n");
    let _ = console.flush();
}
