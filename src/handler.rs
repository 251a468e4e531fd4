// Copyright (c) 2024 Linaro LTD
// SPDX-License-Identifier: Apache-2.0

//! Listener batching
//!
//! Many activities only need a little work done at a fixed rate.  Giving each of them a task of its
//! own costs a stack and a thread apiece.  A [`Handler`] instead runs them all from one task: each
//! period it calls [`HandlerListener::update`] on every registered listener, in the order they were
//! added, and then sleeps until the next period.
//!
//! With a batch budget, a pass that runs long yields the thread once the budget is used up, so
//! that other tasks at the same priority are not starved by a long list of listeners.  The pass
//! then carries on where it left off.
//!
//! ```
//! use std::sync::Arc;
//! use rtsync::config::TaskConfig;
//! use rtsync::handler::{Handler, HandlerListener};
//! use rtsync::time::Duration;
//!
//! struct Blink;
//!
//! impl HandlerListener for Blink {
//!     fn update(&self) {
//!         // toggle something
//!     }
//! }
//!
//! let config = TaskConfig::new("leds").priority(3);
//! let mut handler: Handler<4> = Handler::new(config, Duration::millis(10)).unwrap();
//! handler.add_listener(Arc::new(Blink));
//! let running = handler.start().unwrap();
//! std::thread::sleep(std::time::Duration::from_millis(35));
//! running.stop().unwrap();
//! ```

use core::fmt;
use std::sync::Arc;

use portable_atomic::{AtomicU64, Ordering};

use crate::config::{TaskConfig, MIN_TIMER_DURATION_US};
use crate::error::Result;
use crate::flag::Flag;
use crate::sys::yield_now;
use crate::task::{Task, TaskHandle};
use crate::time::{now, Duration, Instant};
use crate::timer::Timer;
use crate::waitable::Waitable;

/// A periodic activity run by a [`Handler`].
pub trait HandlerListener: Send + Sync {
    /// Do this period's work.  Should return quickly.
    fn update(&self);
}

/// Counters kept by a running handler.
#[derive(Default)]
pub struct HandlerStats {
    passes: AtomicU64,
    yields: AtomicU64,
    overruns: AtomicU64,
}

impl HandlerStats {
    /// Completed passes over the listeners.
    pub fn passes(&self) -> u64 {
        self.passes.load(Ordering::Acquire)
    }

    /// Mid-pass yields caused by the batch budget running out.
    pub fn yields(&self) -> u64 {
        self.yields.load(Ordering::Acquire)
    }

    /// Passes that took at least a whole period.
    pub fn overruns(&self) -> u64 {
        self.overruns.load(Ordering::Acquire)
    }
}

impl fmt::Debug for HandlerStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "HandlerStats passes:{} yields:{} overruns:{}",
            self.passes(),
            self.yields(),
            self.overruns()
        )
    }
}

/// A task that periodically updates up to `MAX` listeners.
pub struct Handler<const MAX: usize> {
    task: Task,
    period: Duration,
    batch: Option<Duration>,
    listeners: heapless::Vec<Arc<dyn HandlerListener>, MAX>,
    timer: Timer,
    stop: Flag,
}

impl<const MAX: usize> Handler<MAX> {
    /// Stack budget of the handler's task.
    pub const STACK_SIZE: usize = 3500 + MAX * core::mem::size_of::<usize>();

    /// A handler that runs a full pass each period, without ever yielding mid-pass.
    ///
    /// The task takes its name, priority and core from `config`.  Its stack size is always
    /// [`STACK_SIZE`].
    ///
    /// [`STACK_SIZE`]: Handler::STACK_SIZE
    pub fn new(config: TaskConfig, period: Duration) -> Result<Handler<MAX>> {
        Self::build(config, period, None)
    }

    /// A handler that yields whenever a pass has run for longer than `batch`.
    pub fn with_batch(
        config: TaskConfig,
        period: Duration,
        batch: Duration,
    ) -> Result<Handler<MAX>> {
        Self::build(config, period, Some(batch))
    }

    fn build(
        config: TaskConfig,
        period: Duration,
        batch: Option<Duration>,
    ) -> Result<Handler<MAX>> {
        let config = config.stack_size(Self::STACK_SIZE);
        log::debug!(
            "handler {}: priority {}, core {}, period {}us",
            config.name,
            config.priority,
            config.core,
            period.ticks()
        );
        let mut task = Task::new(config);
        let timer = Timer::new(&mut task)?;
        let stop = Flag::new(&mut task);
        Ok(Handler {
            task,
            period,
            batch,
            listeners: heapless::Vec::new(),
            timer,
            stop,
        })
    }

    /// The handler's name.
    pub fn name(&self) -> &str {
        self.task.name()
    }

    /// The configuration the handler's task will be started with.
    pub fn config(&self) -> &TaskConfig {
        self.task.config()
    }

    /// Register a listener, to be updated after those already registered.
    ///
    /// Adding the same listener again has no effect.
    ///
    /// # Panics
    ///
    /// If `MAX` listeners are already registered.
    pub fn add_listener(&mut self, listener: Arc<dyn HandlerListener>) {
        if self.listeners.iter().any(|l| Arc::ptr_eq(l, &listener)) {
            return;
        }
        if self.listeners.push(listener).is_err() {
            panic!("handler {} has more than {} listeners", self.task.name(), MAX);
        }
    }

    /// Number of registered listeners.
    pub fn nof_listeners(&self) -> usize {
        self.listeners.len()
    }

    /// Start the handler's task.
    pub fn start(self) -> Result<RunningHandler> {
        let Handler {
            task,
            period,
            batch,
            listeners,
            timer,
            stop,
        } = self;
        let stats = Arc::new(HandlerStats::default());
        let control = stop.clone();
        let runner = Runner {
            period,
            batch,
            listeners,
            timer,
            stop,
            stats: stats.clone(),
        };
        let handle = task.start(move |task: &mut Task| runner.run(task))?;
        Ok(RunningHandler {
            stop: control,
            stats,
            handle,
        })
    }
}

impl<const MAX: usize> fmt::Debug for Handler<MAX> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Handler {} {}/{} listeners, period {}us",
            self.task.name(),
            self.listeners.len(),
            MAX,
            self.period.ticks()
        )
    }
}

/// The state moved into the handler's task.
struct Runner<const MAX: usize> {
    period: Duration,
    batch: Option<Duration>,
    listeners: heapless::Vec<Arc<dyn HandlerListener>, MAX>,
    timer: Timer,
    stop: Flag,
    stats: Arc<HandlerStats>,
}

impl<const MAX: usize> Runner<MAX> {
    fn run(self, task: &Task) {
        let shortest = Duration::micros(MIN_TIMER_DURATION_US);
        loop {
            let pass_start = now();
            self.pass(pass_start);
            self.stats.passes.fetch_add(1, Ordering::AcqRel);

            let elapsed = now() - pass_start;
            if elapsed >= self.period {
                self.stats.overruns.fetch_add(1, Ordering::AcqRel);
                log::warn!(
                    "handler {}: pass took {}us, period is {}us",
                    task.name(),
                    elapsed.ticks(),
                    self.period.ticks()
                );
                if self.stop.is_set() {
                    break;
                }
                continue;
            }

            let remaining = self.period - elapsed;
            self.timer
                .start(if remaining < shortest { shortest } else { remaining });
            task.wait_any(self.stop.mask() | &self.timer);
            if task.has_fired(&self.stop) {
                self.timer.stop();
                break;
            }
            task.has_fired(&self.timer);
        }
        log::debug!("handler {} stopped", task.name());
    }

    fn pass(&self, start: Instant) {
        let mut batch_start = start;
        for (i, listener) in self.listeners.iter().enumerate() {
            if let Some(budget) = self.batch {
                if i > 0 && now() - batch_start > budget {
                    yield_now();
                    self.stats.yields.fetch_add(1, Ordering::AcqRel);
                    batch_start = now();
                }
            }
            listener.update();
        }
    }
}

/// A handler whose task is running.
///
/// Dropping this without calling [`stop`] leaves the handler running.
///
/// [`stop`]: RunningHandler::stop
pub struct RunningHandler {
    stop: Flag,
    stats: Arc<HandlerStats>,
    handle: TaskHandle,
}

impl RunningHandler {
    /// The handler's counters.
    pub fn stats(&self) -> &HandlerStats {
        &self.stats
    }

    /// Stop the handler after its current pass, and wait for its task to exit.
    ///
    /// Returns the panic payload if a listener panicked.
    pub fn stop(self) -> std::thread::Result<()> {
        self.stop.set();
        self.handle.join()
    }
}

impl fmt::Debug for RunningHandler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "RunningHandler {:?}", self.stats)
    }
}
