//! Buffer slot ownership shared between the DMA interrupt and the foreground.
//!
//! [`BufferSlots`] holds two single-bit indices: the half the DMA engine is
//! filling (producer) and the half the USB side may read (consumer). The
//! interrupt handler is the only writer and reaches the slots through the
//! unique [`CompletionHandle`]. The foreground only loads them.
//!
//! Only atomic loads and stores are used, never read-modify-write, so the
//! handoff also works on cores without CAS instructions.

use core::sync::atomic::{AtomicBool, AtomicU8, AtomicU32, Ordering};

use super::error::{ConfigError, ConfigResult};
use crate::internal::constants::{HALF_COUNT, INITIAL_CONSUMER_SLOT, INITIAL_PRODUCER_SLOT};

/// One of the two halves of a backing array
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum SlotIndex {
    /// Lower half
    Half0 = 0,
    /// Upper half
    Half1 = 1,
}

impl SlotIndex {
    /// Decode from the low bit of a raw value
    #[inline(always)]
    pub const fn from_bit(bit: u8) -> Self {
        if bit & 1 == 0 {
            SlotIndex::Half0
        } else {
            SlotIndex::Half1
        }
    }

    /// The opposite half
    #[inline(always)]
    #[must_use]
    pub const fn other(self) -> Self {
        match self {
            SlotIndex::Half0 => SlotIndex::Half1,
            SlotIndex::Half1 => SlotIndex::Half0,
        }
    }

    /// Index into the `[half; 2]` backing array
    #[inline(always)]
    pub const fn index(self) -> usize {
        self as usize
    }

    /// Byte offset of this half in a backing array with halves of `half_len`
    #[inline(always)]
    pub const fn offset(self, half_len: usize) -> usize {
        self.index() * half_len
    }
}

/// Snapshot of both slots, for diagnostics and tests
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct SlotSnapshot {
    /// Half the DMA engine is filling
    pub producer: SlotIndex,
    /// Half the USB side may read
    pub consumer: SlotIndex,
    /// Completion events seen so far (wrapping)
    pub completions: u32,
}

/// Shared slot indices for the double-buffer handshake.
///
/// `const`-constructible so it can live in a `static` shared with the
/// interrupt handler.
pub struct BufferSlots {
    producer: AtomicU8,
    consumer: AtomicU8,
    completions: AtomicU32,
    handler_registered: AtomicBool,
}

impl BufferSlots {
    /// Create slots in the power-up assignment (producer = 1, consumer = 0)
    pub const fn new() -> Self {
        Self {
            producer: AtomicU8::new(INITIAL_PRODUCER_SLOT),
            consumer: AtomicU8::new(INITIAL_CONSUMER_SLOT),
            completions: AtomicU32::new(0),
            handler_registered: AtomicBool::new(false),
        }
    }

    /// Hand out the completion handler.
    ///
    /// Succeeds exactly once. The returned handle is the only way to mutate
    /// the slots; bind it to the DMA transfer-complete interrupt before the
    /// first pipeline cycle.
    ///
    /// The check-then-set is not atomic as a pair; registration is expected
    /// to happen once from the foreground during bring-up.
    pub fn register_completion_handler(&self) -> ConfigResult<CompletionHandle<'_>> {
        if self.handler_registered.load(Ordering::Acquire) {
            return Err(ConfigError::HandlerAlreadyRegistered);
        }
        self.handler_registered.store(true, Ordering::Release);

        #[cfg(feature = "defmt")]
        defmt::info!("DMA completion handler registered");

        Ok(CompletionHandle { slots: self })
    }

    /// Whether the completion handler has been handed out
    #[inline]
    pub fn is_handler_registered(&self) -> bool {
        self.handler_registered.load(Ordering::Acquire)
    }

    /// Half the DMA engine is currently filling
    #[inline]
    pub fn producer(&self) -> SlotIndex {
        SlotIndex::from_bit(self.producer.load(Ordering::Acquire))
    }

    /// Half the USB side may currently read
    #[inline]
    pub fn consumer(&self) -> SlotIndex {
        SlotIndex::from_bit(self.consumer.load(Ordering::Acquire))
    }

    /// Completion events seen so far (wrapping)
    #[inline]
    pub fn completions(&self) -> u32 {
        self.completions.load(Ordering::Acquire)
    }

    /// Read both slots.
    ///
    /// The loads are independent; a completion may land between them.
    pub fn snapshot(&self) -> SlotSnapshot {
        SlotSnapshot {
            producer: self.producer(),
            consumer: self.consumer(),
            completions: self.completions(),
        }
    }

    fn advance(&self) {
        let finished = self.producer.load(Ordering::Relaxed) & 1;
        self.consumer.store(finished, Ordering::Release);
        self.producer
            .store(((HALF_COUNT as u8) - 1) - finished, Ordering::Release);
        let count = self.completions.load(Ordering::Relaxed);
        self.completions
            .store(count.wrapping_add(1), Ordering::Release);
    }
}

impl Default for BufferSlots {
    fn default() -> Self {
        Self::new()
    }
}

/// The single writer of [`BufferSlots`].
///
/// Not `Clone`: holding the handle is what makes the interrupt handler the
/// only mutator.
pub struct CompletionHandle<'a> {
    slots: &'a BufferSlots,
}

impl CompletionHandle<'_> {
    /// DMA transfer-complete callback.
    ///
    /// Interrupt context, O(1): the half the producer just finished becomes
    /// readable and the producer flips to the other half.
    #[inline]
    pub fn on_transfer_complete(&mut self) {
        self.slots.advance();
    }

    /// The slots this handle writes
    #[inline]
    pub fn slots(&self) -> &BufferSlots {
        self.slots
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    extern crate std;
    use std::vec::Vec;

    use super::*;

    #[test]
    fn slot_index_other_flips() {
        assert_eq!(SlotIndex::Half0.other(), SlotIndex::Half1);
        assert_eq!(SlotIndex::Half1.other(), SlotIndex::Half0);
    }

    #[test]
    fn slot_index_offset() {
        assert_eq!(SlotIndex::Half0.offset(32), 0);
        assert_eq!(SlotIndex::Half1.offset(32), 32);
    }

    #[test]
    fn slot_index_from_bit_uses_low_bit() {
        assert_eq!(SlotIndex::from_bit(0), SlotIndex::Half0);
        assert_eq!(SlotIndex::from_bit(1), SlotIndex::Half1);
        assert_eq!(SlotIndex::from_bit(2), SlotIndex::Half0);
    }

    #[test]
    fn initial_assignment() {
        let slots = BufferSlots::new();
        assert_eq!(slots.producer(), SlotIndex::Half1);
        assert_eq!(slots.consumer(), SlotIndex::Half0);
        assert_eq!(slots.completions(), 0);
        assert!(!slots.is_handler_registered());
    }

    #[test]
    fn handler_registers_once() {
        let slots = BufferSlots::new();
        let first = slots.register_completion_handler();
        assert!(first.is_ok());
        assert!(slots.is_handler_registered());
        assert!(matches!(
            slots.register_completion_handler(),
            Err(ConfigError::HandlerAlreadyRegistered)
        ));
    }

    #[test]
    fn completion_hands_off_finished_half() {
        let slots = BufferSlots::new();
        let mut handle = slots.register_completion_handler().unwrap();

        handle.on_transfer_complete();

        assert_eq!(slots.consumer(), SlotIndex::Half1);
        assert_eq!(slots.producer(), SlotIndex::Half0);
        assert_eq!(slots.completions(), 1);
    }

    #[test]
    fn consumer_after_event_equals_producer_before_event() {
        let slots = BufferSlots::new();
        let mut handle = slots.register_completion_handler().unwrap();

        for _ in 0..100 {
            let producer_before = slots.producer();
            handle.on_transfer_complete();
            assert_eq!(slots.consumer(), producer_before);
            assert_ne!(slots.consumer(), slots.producer());
        }
    }

    #[test]
    fn producer_strictly_alternates() {
        let slots = BufferSlots::new();
        let mut handle = slots.register_completion_handler().unwrap();

        let seen: Vec<SlotIndex> = (0..8)
            .map(|_| {
                handle.on_transfer_complete();
                slots.producer()
            })
            .collect();

        for pair in seen.windows(2) {
            assert_ne!(pair[0], pair[1]);
        }
        assert_eq!(seen[0], SlotIndex::Half0);
        assert_eq!(seen[1], SlotIndex::Half1);
    }

    #[test]
    fn snapshot_reflects_state() {
        let slots = BufferSlots::new();
        let mut handle = slots.register_completion_handler().unwrap();
        handle.on_transfer_complete();
        handle.on_transfer_complete();

        let snap = handle.slots().snapshot();
        assert_eq!(
            snap,
            SlotSnapshot {
                producer: SlotIndex::Half1,
                consumer: SlotIndex::Half0,
                completions: 2,
            }
        );
    }

    #[test]
    fn static_slots() {
        static SLOTS: BufferSlots = BufferSlots::new();
        assert_eq!(SLOTS.producer(), SlotIndex::Half1);
    }
}
