// Copyright (c) 2024 Linaro LTD
// SPDX-License-Identifier: Apache-2.0

//! Waitable multiplexing and lock ordering for multitasking applications
//!
//! This crate lets independently scheduled tasks block on many event sources at once, and keeps
//! the mutexes they share free of deadlock.
//!
//! - A [`Task`] owns a small event bitset.  Each [`Flag`], [`Queue`] and [`Timer`] created for
//!   the task reserves one bit of it, and the task waits for any or all of them with a single
//!   call.
//! - A [`Mutex`] carries an ordering id.  Each task tracks the mutexes it holds, and locking them
//!   out of order panics at the point of the mistake.
//! - A [`Handler`] runs many small periodic listeners from a single task.
//!
//! The kernel objects all of this is built on live in [`sys`].
//!
//! [`Task`]: task::Task
//! [`Flag`]: flag::Flag
//! [`Queue`]: queue::Queue
//! [`Timer`]: timer::Timer
//! [`Mutex`]: sync::Mutex
//! [`Handler`]: handler::Handler

#![deny(missing_docs)]

pub mod config;
pub mod error;
pub mod flag;
pub mod handler;
pub mod logging;
pub mod printk;
pub mod queue;
pub mod sync;
pub mod sys;
pub mod task;
pub mod time;
pub mod timer;
pub mod waitable;

pub use error::{Error, Result};

pub use logging::set_logger;
