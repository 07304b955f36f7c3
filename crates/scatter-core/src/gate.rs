//! Re-entrancy guards.
//!
//! Internal writes (fan-out, cache refreshes, triggers) re-enter the dispatcher
//! synchronously. The gate records which update paths are currently disabled;
//! every disable goes through a guard that releases its facets on drop,
//! unwinding included.

use bitflags::bitflags;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct Suppress: u8 {
        /// Every dispatch is a no-op.
        const DISPATCH = 0b0001;
        /// Alt-held batch fan-out.
        const BATCH = 0b0010;
        /// Timing coalescing; writes dispatch immediately.
        const DELAY = 0b0100;
        /// Synchronization channel propagation.
        const SYNC = 0b1000;

        const FAN_OUT = Self::BATCH.bits() | Self::DELAY.bits() | Self::SYNC.bits();
    }
}

const FACETS: usize = 4;

/// Holder count per facet. A facet is active while any guard holds it, so
/// guards may be released in any order.
#[derive(Debug, Default)]
pub struct UpdateGate {
    holders: [AtomicU32; FACETS],
}

impl UpdateGate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn active(&self) -> Suppress {
        self.holders
            .iter()
            .enumerate()
            .filter(|(_, count)| count.load(Ordering::Acquire) > 0)
            .fold(Suppress::empty(), |acc, (bit, _)| {
                acc | Suppress::from_bits_truncate(1 << bit)
            })
    }

    pub fn is_suppressed(&self, flags: Suppress) -> bool {
        self.active().intersects(flags)
    }

    #[must_use = "suppression ends when the guard is dropped"]
    pub fn suppress(&self, flags: Suppress) -> SuppressionGuard<'_> {
        for bit in facets(flags) {
            self.holders[bit].fetch_add(1, Ordering::AcqRel);
        }
        SuppressionGuard { gate: self, flags }
    }
}

fn facets(flags: Suppress) -> impl Iterator<Item = usize> {
    (0..FACETS).filter(move |bit| flags.bits() & (1 << bit) != 0)
}

pub struct SuppressionGuard<'a> {
    gate: &'a UpdateGate,
    flags: Suppress,
}

impl Drop for SuppressionGuard<'_> {
    fn drop(&mut self) {
        for bit in facets(self.flags) {
            self.gate.holders[bit].fetch_sub(1, Ordering::AcqRel);
        }
    }
}

/// Single-entry flag for work that must not recurse into itself.
#[derive(Debug, Default)]
pub struct ReentryFlag {
    active: AtomicBool,
}

impl ReentryFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::Acquire)
    }

    /// `None` while another guard is alive.
    pub fn try_enter(&self) -> Option<ReentryGuard<'_>> {
        self.active
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| ReentryGuard { flag: self })
    }
}

pub struct ReentryGuard<'a> {
    flag: &'a ReentryFlag,
}

impl Drop for ReentryGuard<'_> {
    fn drop(&mut self) {
        self.flag.active.store(false, Ordering::Release);
    }
}
