//! Bounded edge-triggered polling.
//!
//! The foreground never blocks on the interrupt handler. It spins on a slot
//! index until the value moves away from the last one acted upon, or until
//! the iteration ceiling runs out.

/// Result of a bounded spin on a shared value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum WaitOutcome<T> {
    /// The value moved; carries the new value and the iterations spent
    Advanced {
        /// Value observed when the edge was detected
        value: T,
        /// Iterations spent before the edge
        spins: u32,
    },
    /// The ceiling ran out; carries the value read after giving up
    TimedOut {
        /// Value read after the ceiling was exhausted
        value: T,
    },
}

impl<T: Copy> WaitOutcome<T> {
    /// The value to act on, regardless of how the wait ended
    #[inline]
    pub fn value(&self) -> T {
        match *self {
            WaitOutcome::Advanced { value, .. } | WaitOutcome::TimedOut { value } => value,
        }
    }

    /// Whether the ceiling ran out before an edge was seen
    #[inline]
    pub fn timed_out(&self) -> bool {
        matches!(self, WaitOutcome::TimedOut { .. })
    }

    /// Iterations spent (the full ceiling when timed out)
    #[inline]
    pub fn spins(&self, ceiling: u32) -> u32 {
        match *self {
            WaitOutcome::Advanced { spins, .. } => spins,
            WaitOutcome::TimedOut { .. } => ceiling,
        }
    }
}

/// Spin until `read()` differs from `last`, at most `ceiling` iterations.
///
/// `read` is evaluated once before the first spin, so an edge that already
/// happened is reported with zero spins.
pub(crate) fn spin_until_changed<T, F>(mut read: F, last: T, ceiling: u32) -> WaitOutcome<T>
where
    T: Copy + PartialEq,
    F: FnMut() -> T,
{
    let mut spins = 0u32;
    loop {
        let value = read();
        if value != last {
            return WaitOutcome::Advanced { value, spins };
        }
        if spins >= ceiling {
            return WaitOutcome::TimedOut { value };
        }
        spins += 1;
        core::hint::spin_loop();
    }
}
