// Copyright (c) 2024 Linaro LTD
// SPDX-License-Identifier: Apache-2.0

//! Tasks
//!
//! A [`Task`] is one logical concurrent activity: a thread, plus the event bitset that the
//! thread blocks on, plus the bookkeeping for the mutexes it holds.
//!
//! A task is built in two steps.  First the [`Task`] is constructed, and the waitables it will
//! wait for are constructed against it ([`Flag::new`], [`Queue::new`], [`Timer::new`]).  Each
//! of those reserves one bit of the task's bitset.  Then [`Task::start`] moves the task onto its
//! own thread and runs its [`TaskMain`].  Flags and queues are cheap handles, so clones of them
//! can be given to other tasks, which then use them to notify this one.
//!
//! ```
//! use rtsync::{config::TaskConfig, flag::Flag, task::Task};
//!
//! let mut task = Task::new(TaskConfig::new("blinky").priority(3));
//! let go = Flag::new(&mut task);
//! let notify = go.clone();
//!
//! let handle = task.start(move |task: &mut Task| {
//!     task.wait(&go);
//! }).unwrap();
//!
//! notify.set();
//! handle.join().unwrap();
//! ```
//!
//! Once started, a `Task` only exists on its own thread: it is `Send`, but not `Sync`.  The result
//! of the last wait and the stack of held mutexes are therefore only ever touched by that thread,
//! without any locking.
//!
//! [`Flag::new`]: crate::flag::Flag::new
//! [`Queue::new`]: crate::queue::Queue::new
//! [`Timer::new`]: crate::timer::Timer::new

use core::cell::Cell;
use core::fmt;
use std::sync::Arc;

use crate::config::{TaskConfig, MAX_WAITABLES};
use crate::error::Result;
use crate::sync::MutexStack;
use crate::sys::event::{Event, WaitFlags};
use crate::sys::thread::{Thread, ThreadHandle};
use crate::time::{Forever, Timeout};
use crate::waitable::{Slot, WaitMask, Waitable, WaitableKind};

/// The handle returned from [`Task::start`].
pub type TaskHandle = ThreadHandle;

/// The entry point of a task.
///
/// Any `FnOnce(&mut Task)` closure is a `TaskMain`, but a type holding the task's state can also
/// implement it directly.
pub trait TaskMain: Send + 'static {
    /// Run the task.  The task's thread exits when this returns.
    fn main(self, task: &mut Task);
}

impl<F> TaskMain for F
where
    F: FnOnce(&mut Task) + Send + 'static,
{
    fn main(self, task: &mut Task) {
        self(task)
    }
}

/// A task, with its event bitset and the waitables registered with it.
pub struct Task {
    config: TaskConfig,
    event: Arc<Event>,
    /// One entry per reserved bit, indexed by bit number.
    slots: heapless::Vec<WaitableKind, MAX_WAITABLES>,
    /// The event bits as of the last completed wait, minus those already consumed by
    /// `has_fired`.
    latest: Cell<u32>,
    mutexes: MutexStack,
}

impl Task {
    /// Create a new task.  It does not run until [`start`] is called.
    ///
    /// [`start`]: Task::start
    pub fn new(config: TaskConfig) -> Task {
        log::debug!("new task {}", config.name);
        Task {
            config,
            event: Arc::new(Event::new()),
            slots: heapless::Vec::new(),
            latest: Cell::new(0),
            mutexes: MutexStack::new(),
        }
    }

    /// The name of this task.
    pub fn name(&self) -> &str {
        &self.config.name
    }

    /// The attributes the task was created with.
    pub fn config(&self) -> &TaskConfig {
        &self.config
    }

    /// Reserve the next free bit of this task's event for a waitable of the given kind.
    ///
    /// Called once from the constructor of each waitable.
    ///
    /// # Panics
    ///
    /// If all [`MAX_WAITABLES`] bits are already taken.  The bit space is a hard limit of the
    /// kernel, so running out is a design error of the application.
    pub fn register_waitable(&mut self, kind: WaitableKind) -> Slot {
        let bit = self.slots.len();
        if self.slots.push(kind).is_err() {
            panic!(
                "task {} has more than {} waitables",
                self.config.name, MAX_WAITABLES
            );
        }
        log::debug!("task {}: bit {} is a {:?}", self.config.name, bit, kind);
        Slot::new(self.event.clone(), bit as u8)
    }

    /// Number of waitables registered so far.
    pub fn nof_waitables(&self) -> usize {
        self.slots.len()
    }

    fn bits_where(&self, pred: impl Fn(WaitableKind) -> bool) -> u32 {
        self.slots
            .iter()
            .enumerate()
            .filter(|(_, k)| pred(**k))
            .fold(0, |mask, (bit, _)| mask | (1 << bit))
    }

    /// Bits that belong to queues.
    pub fn queues_mask(&self) -> WaitMask {
        WaitMask::from_bits(self.bits_where(|k| k == WaitableKind::Queue))
    }

    /// Bits that belong to flags.
    pub fn flags_mask(&self) -> WaitMask {
        WaitMask::from_bits(self.bits_where(|k| k == WaitableKind::Flag))
    }

    /// Bits that belong to timers.
    pub fn timers_mask(&self) -> WaitMask {
        WaitMask::from_bits(self.bits_where(|k| k == WaitableKind::Timer))
    }

    fn registered_bits(&self) -> u32 {
        self.bits_where(|_| true)
    }

    /// The bits of `fired` that a waiter is allowed to clear.
    ///
    /// Level triggered (queue) bits are excluded: they may only be cleared by the queue itself,
    /// once it has been read down to empty.
    fn consumable(&self, fired: u32) -> u32 {
        fired & !self.bits_where(WaitableKind::is_level_triggered)
    }

    fn check_mask(&self, mask: WaitMask) -> u32 {
        let bits = mask.bits();
        assert!(bits != 0, "task {}: wait on an empty mask", self.config.name);
        assert!(
            bits & !self.registered_bits() == 0,
            "task {}: wait on bits {:#x} not registered with this task",
            self.config.name,
            bits
        );
        bits
    }

    fn check_owner(&self, slot: &Slot) {
        assert!(
            slot.belongs_to(&self.event),
            "waitable does not belong to task {}",
            self.config.name
        );
    }

    /// Wait for a single waitable.
    ///
    /// Same as [`wait_all`] with only this waitable's bit.
    ///
    /// [`wait_all`]: Task::wait_all
    pub fn wait<W: Waitable + ?Sized>(&self, waitable: &W) {
        self.check_owner(waitable.slot());
        self.wait_all(waitable.mask());
    }

    /// Wait until all of the given waitables have fired.
    ///
    /// The bits are cleared as the wait completes, apart from queue bits, which stay set as long as
    /// their queue holds anything.  There is no need to check with [`has_fired`] afterwards.
    ///
    /// [`has_fired`]: Task::has_fired
    pub fn wait_all(&self, mask: impl Into<WaitMask>) {
        self.wait_all_timeout(mask, Forever);
    }

    /// Like [`wait_all`], but gives up after `timeout`.
    ///
    /// Returns true if all bits were set in time.  On timeout nothing is cleared, and the result
    /// seen by [`has_fired`] is empty.
    ///
    /// [`wait_all`]: Task::wait_all
    /// [`has_fired`]: Task::has_fired
    pub fn wait_all_timeout<T>(&self, mask: impl Into<WaitMask>, timeout: T) -> bool
    where
        T: Into<Timeout>,
    {
        let bits = self.check_mask(mask.into());
        // Edge bits are consumed in the same step that satisfies the wait, so a set arriving right
        // after is kept for the next wait.  Queue bits are left alone.
        let consumed = self.consumable(bits);
        match self.event.wait_clearing(bits, true, consumed, timeout) {
            Some(result) => {
                self.latest.set(result & !consumed);
                true
            }
            None => {
                self.latest.set(0);
                false
            }
        }
    }

    /// Wait until at least one of the given waitables has fired.
    ///
    /// Nothing is cleared.  Use [`has_fired`] to find out which waitable fired, which also
    /// consumes its event.  Several may have fired at the same time; a clean design handles one of
    /// them per wait, and picks up the others on the next one.
    ///
    /// [`has_fired`]: Task::has_fired
    pub fn wait_any(&self, mask: impl Into<WaitMask>) {
        self.wait_any_timeout(mask, Forever);
    }

    /// Like [`wait_any`], but gives up after `timeout`.
    ///
    /// Returns true if a bit was set in time.
    ///
    /// [`wait_any`]: Task::wait_any
    pub fn wait_any_timeout<T>(&self, mask: impl Into<WaitMask>, timeout: T) -> bool
    where
        T: Into<Timeout>,
    {
        let bits = self.check_mask(mask.into());
        match self.event.wait(bits, WaitFlags::empty(), timeout) {
            Some(result) => {
                self.latest.set(result);
                true
            }
            None => {
                self.latest.set(0);
                false
            }
        }
    }

    /// Did this waitable fire in the last wait.
    ///
    /// Returns true at most once per wait for each waitable.  A fired flag or timer has its event
    /// consumed.  A fired queue keeps its bit, the queue has to be read to clear it.
    pub fn has_fired<W: Waitable + ?Sized>(&self, waitable: &W) -> bool {
        self.check_owner(waitable.slot());
        let bits = waitable.mask().bits();
        let latest = self.latest.get();
        if latest & bits == 0 {
            return false;
        }
        self.latest.set(latest & !bits);
        let consumed = self.consumable(bits);
        if consumed != 0 {
            self.event.clear(consumed);
        }
        true
    }

    /// The event bits not yet consumed from the last wait.
    pub fn fired(&self) -> WaitMask {
        WaitMask::from_bits(self.latest.get() & self.registered_bits())
    }

    pub(crate) fn mutex_stack(&self) -> &MutexStack {
        &self.mutexes
    }

    /// Number of ordered mutexes this task currently holds.
    pub fn locks_held(&self) -> usize {
        self.mutexes.depth()
    }

    /// Start the task on its own thread, running `main`.
    ///
    /// Consumes the task, which is handed to `main` on the new thread.
    pub fn start<M: TaskMain>(self, main: M) -> Result<TaskHandle> {
        let mut thread = Thread::new(self.config.name.clone());
        thread
            .set_priority(self.config.priority)
            .set_stack_size(self.config.stack_size)
            .set_core(self.config.core);

        log::info!(
            "starting task {} with {} waitables",
            self.config.name,
            self.slots.len()
        );
        let mut task = self;
        thread.spawn(move || {
            main.main(&mut task);
            log::debug!("task {} finished", task.name());
        })
    }
}

impl fmt::Debug for Task {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Task {} ({} waitables, {:?})",
            self.config.name,
            self.slots.len(),
            self.event
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::time::{Duration, NoWait};

    struct Stub(Slot, WaitableKind);

    impl Waitable for Stub {
        fn slot(&self) -> &Slot {
            &self.0
        }

        fn kind(&self) -> WaitableKind {
            self.1
        }
    }

    fn stub(task: &mut Task, kind: WaitableKind) -> Stub {
        Stub(task.register_waitable(kind), kind)
    }

    #[test]
    fn bits_are_handed_out_in_order() {
        let mut task = Task::new(TaskConfig::new("alloc"));
        let a = stub(&mut task, WaitableKind::Flag);
        let b = stub(&mut task, WaitableKind::Queue);
        let c = stub(&mut task, WaitableKind::Timer);
        assert_eq!((a.0.bit(), b.0.bit(), c.0.bit()), (0, 1, 2));
        assert_eq!(task.flags_mask().bits(), 0b001);
        assert_eq!(task.queues_mask().bits(), 0b010);
        assert_eq!(task.timers_mask().bits(), 0b100);
        assert_eq!(task.nof_waitables(), 3);
    }

    #[test]
    fn twenty_four_waitables_fit() {
        let mut task = Task::new(TaskConfig::new("full"));
        for _ in 0..MAX_WAITABLES {
            stub(&mut task, WaitableKind::Flag);
        }
        assert_eq!(task.flags_mask().bits(), 0x00ff_ffff);
    }

    #[test]
    #[should_panic(expected = "more than 24 waitables")]
    fn twenty_fifth_waitable_panics() {
        let mut task = Task::new(TaskConfig::new("overfull"));
        for _ in 0..=MAX_WAITABLES {
            stub(&mut task, WaitableKind::Flag);
        }
    }

    #[test]
    fn wait_any_leaves_bits_for_has_fired() {
        let mut task = Task::new(TaskConfig::new("any"));
        let a = stub(&mut task, WaitableKind::Flag);
        let b = stub(&mut task, WaitableKind::Flag);
        a.0.set();
        task.wait_any(a.mask() | &b);
        assert!(a.0.is_set());
        assert!(!task.has_fired(&b));
        assert!(task.has_fired(&a));
        assert!(!a.0.is_set());
        assert!(!task.has_fired(&a));
    }

    #[test]
    fn has_fired_keeps_queue_bits() {
        let mut task = Task::new(TaskConfig::new("level"));
        let q = stub(&mut task, WaitableKind::Queue);
        q.0.set();
        task.wait_any(&q);
        assert!(task.has_fired(&q));
        assert!(q.0.is_set());
    }

    #[test]
    fn wait_all_clears_edges_and_keeps_levels() {
        let mut task = Task::new(TaskConfig::new("all"));
        let f = stub(&mut task, WaitableKind::Flag);
        let q = stub(&mut task, WaitableKind::Queue);
        f.0.set();
        q.0.set();
        task.wait_all(f.mask() | &q);
        assert!(!f.0.is_set());
        assert!(q.0.is_set());
    }

    #[test]
    fn set_after_wait_all_is_not_lost() {
        let mut task = Task::new(TaskConfig::new("again"));
        let f = stub(&mut task, WaitableKind::Flag);
        f.0.set();
        task.wait(&f);
        assert!(task.fired().is_empty());
        f.0.set();
        assert!(!task.has_fired(&f));
        assert!(f.0.is_set());
        task.wait(&f);
        assert!(!f.0.is_set());
    }

    #[test]
    fn wait_all_reports_only_queue_bits() {
        let mut task = Task::new(TaskConfig::new("report"));
        let f = stub(&mut task, WaitableKind::Flag);
        let q = stub(&mut task, WaitableKind::Queue);
        f.0.set();
        q.0.set();
        task.wait_all(f.mask() | &q);
        assert_eq!(task.fired(), q.mask());
        assert!(q.0.is_set());
        assert!(task.has_fired(&q));
        assert!(q.0.is_set());
    }

    #[test]
    fn wait_all_waits_for_every_bit() {
        let mut task = Task::new(TaskConfig::new("partial"));
        let a = stub(&mut task, WaitableKind::Flag);
        let b = stub(&mut task, WaitableKind::Flag);
        a.0.set();
        assert!(!task.wait_all_timeout(a.mask() | &b, Duration::millis(5)));
        assert!(a.0.is_set());
        assert!(task.fired().is_empty());
        b.0.set();
        assert!(task.wait_all_timeout(a.mask() | &b, NoWait));
        assert!(!a.0.is_set() && !b.0.is_set());
    }

    #[test]
    #[should_panic(expected = "does not belong")]
    fn foreign_waitable_panics() {
        let mut mine = Task::new(TaskConfig::new("mine"));
        let mut other = Task::new(TaskConfig::new("other"));
        let _own = stub(&mut mine, WaitableKind::Flag);
        let theirs = stub(&mut other, WaitableKind::Flag);
        mine.has_fired(&theirs);
    }

    #[test]
    #[should_panic(expected = "not registered")]
    fn unregistered_bits_panic() {
        let mut task = Task::new(TaskConfig::new("bits"));
        let _a = stub(&mut task, WaitableKind::Flag);
        task.wait_any_timeout(WaitMask::from_bit(4), NoWait);
    }
}
