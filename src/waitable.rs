// Copyright (c) 2024 Linaro LTD
// SPDX-License-Identifier: Apache-2.0

//! Waitables
//!
//! A waitable is anything a [`Task`] can block on.  Every waitable owns exactly one bit of its
//! task's event bitset, handed out when the waitable is constructed.  Which bit it is, and which
//! task's bitset it lives in, is captured in a [`Slot`].
//!
//! The bits do not all behave the same way:
//!
//! - [`Flag`] and [`Timer`] bits are edge triggered.  The bit records that something happened,
//!   and is consumed once the task has seen it.
//! - [`Queue`] bits are level triggered.  The bit reflects whether the queue holds anything, and
//!   only reading the queue down to empty may clear it.
//!
//! Several waitables are combined into a single wait with a [`WaitMask`]:
//!
//! ```ignore
//! task.wait_any(flag.mask() | &queue | &timer);
//! ```
//!
//! [`Task`]: crate::task::Task
//! [`Flag`]: crate::flag::Flag
//! [`Timer`]: crate::timer::Timer
//! [`Queue`]: crate::queue::Queue

use core::fmt;
use core::ops::{BitOr, BitOrAssign};
use std::sync::Arc;

use crate::sys::event::{Event, EVENT_BITS, EVENT_BITS_MASK};

/// The kinds of waitable, which decide how their bit is consumed.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WaitableKind {
    /// An edge triggered notification, with no payload.
    Flag,
    /// A level triggered bit, set as long as the queue is not empty.
    Queue,
    /// An edge triggered bit, set from timer context on expiry.
    Timer,
}

impl WaitableKind {
    /// Does this bit reflect state (rather than an event), so that only the waitable itself may
    /// clear it.
    pub const fn is_level_triggered(self) -> bool {
        matches!(self, WaitableKind::Queue)
    }
}

/// A set of event bits to wait for.
#[derive(Clone, Copy, Default, PartialEq, Eq)]
pub struct WaitMask(u32);

impl WaitMask {
    /// A mask with no bits.
    pub const fn empty() -> WaitMask {
        WaitMask(0)
    }

    /// The mask with just the given bit.
    pub(crate) fn from_bit(bit: u8) -> WaitMask {
        // Checked before shifting, so a bit past the end can't silently wrap.
        assert!((bit as u32) < EVENT_BITS, "event bit {} out of range", bit);
        WaitMask(1 << bit)
    }

    pub(crate) fn from_bits(bits: u32) -> WaitMask {
        assert!(bits & !EVENT_BITS_MASK == 0, "event bits {:#x} out of range", bits);
        WaitMask(bits)
    }

    /// The raw bits.
    pub const fn bits(self) -> u32 {
        self.0
    }

    /// Is this the empty mask.
    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// Are all bits of `other` also in this mask.
    pub const fn contains(self, other: WaitMask) -> bool {
        self.0 & other.0 == other.0
    }
}

impl BitOr for WaitMask {
    type Output = WaitMask;

    fn bitor(self, rhs: WaitMask) -> WaitMask {
        WaitMask(self.0 | rhs.0)
    }
}

impl<W: Waitable + ?Sized> BitOr<&W> for WaitMask {
    type Output = WaitMask;

    fn bitor(self, rhs: &W) -> WaitMask {
        self | rhs.mask()
    }
}

impl BitOrAssign for WaitMask {
    fn bitor_assign(&mut self, rhs: WaitMask) {
        self.0 |= rhs.0;
    }
}

impl<W: Waitable + ?Sized> From<&W> for WaitMask {
    fn from(value: &W) -> WaitMask {
        value.mask()
    }
}

impl fmt::Debug for WaitMask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "WaitMask({:#08x})", self.0)
    }
}

/// The bit a waitable owns, within the event of the task that owns it.
#[derive(Clone)]
pub struct Slot {
    event: Arc<Event>,
    bit: u8,
}

impl Slot {
    pub(crate) fn new(event: Arc<Event>, bit: u8) -> Slot {
        Slot { event, bit }
    }

    /// The bit number within the owning task's event.
    pub fn bit(&self) -> u8 {
        self.bit
    }

    /// The mask with only this slot's bit.
    pub fn mask(&self) -> WaitMask {
        WaitMask::from_bit(self.bit)
    }

    pub(crate) fn set(&self) {
        self.event.set(self.mask().bits());
    }

    pub(crate) fn clear(&self) {
        self.event.clear(self.mask().bits());
    }

    pub(crate) fn is_set(&self) -> bool {
        self.event.get() & self.mask().bits() != 0
    }

    /// A capability that can only set this slot's bit.
    pub(crate) fn setter(&self) -> BitSetter {
        BitSetter {
            event: self.event.clone(),
            mask: self.mask().bits(),
        }
    }

    /// Is this slot part of the given event.
    pub(crate) fn belongs_to(&self, event: &Arc<Event>) -> bool {
        Arc::ptr_eq(&self.event, event)
    }
}

impl fmt::Debug for Slot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Slot(bit {})", self.bit)
    }
}

/// The one operation allowed from timer context: setting a single, fixed, event bit.
///
/// Clearing bits, reading them, or anything touching the owning task's other state is not
/// reachable through this type.
#[derive(Clone)]
pub struct BitSetter {
    event: Arc<Event>,
    mask: u32,
}

impl BitSetter {
    /// Set the bit.
    pub fn set(&self) {
        self.event.set(self.mask);
    }
}

/// Anything a task can wait on.
pub trait Waitable {
    /// The bit owned by this waitable.
    fn slot(&self) -> &Slot;

    /// What kind of waitable this is.
    fn kind(&self) -> WaitableKind;

    /// The mask to wait for this waitable.
    fn mask(&self) -> WaitMask {
        self.slot().mask()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Stub(Slot);

    impl Waitable for Stub {
        fn slot(&self) -> &Slot {
            &self.0
        }

        fn kind(&self) -> WaitableKind {
            WaitableKind::Flag
        }
    }

    #[test]
    fn masks_combine() {
        let ev = Arc::new(Event::new());
        let a = Stub(Slot::new(ev.clone(), 0));
        let b = Stub(Slot::new(ev.clone(), 5));
        let mask = a.mask() | &b;
        assert_eq!(mask.bits(), 0b10_0001);
        assert!(mask.contains(WaitMask::from(&b)));
        assert!(!WaitMask::empty().contains(mask));
    }

    #[test]
    fn setter_only_sets_its_bit() {
        let ev = Arc::new(Event::new());
        let slot = Slot::new(ev.clone(), 3);
        slot.setter().set();
        assert_eq!(ev.get(), 1 << 3);
        assert!(slot.is_set());
        slot.clear();
        assert!(!slot.is_set());
    }

    #[test]
    #[should_panic(expected = "out of range")]
    fn bit_past_the_end() {
        let _ = WaitMask::from_bit(24);
    }

    #[test]
    fn only_queues_are_level_triggered() {
        assert!(WaitableKind::Queue.is_level_triggered());
        assert!(!WaitableKind::Flag.is_level_triggered());
        assert!(!WaitableKind::Timer.is_level_triggered());
    }
}
