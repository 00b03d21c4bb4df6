//! Source and Sink backing arrays.
//!
//! Each array is split into two equal halves. The sampling peripheral fills
//! Source, the DMA engine copies one Source half into the matching Sink
//! half, and the USB side reads completed Sink halves. Which half each actor
//! may touch is decided by [`BufferSlots`](super::slots::BufferSlots); the
//! arrays themselves carry no locking.

use core::cell::UnsafeCell;

use super::slots::SlotIndex;
use crate::internal::constants::{HALF_BUFFER_LEN, HALF_COUNT};

/// Source and Sink arrays, each `2 * HALF_LEN` bytes.
///
/// Suitable for a `static` in DMA-capable memory. All access to halves goes
/// through raw pointers or `unsafe` accessors because the DMA engine writes
/// Sink behind the compiler's back.
#[repr(C)]
pub struct StreamBuffers<const HALF_LEN: usize = HALF_BUFFER_LEN> {
    source: UnsafeCell<[[u8; HALF_LEN]; HALF_COUNT]>,
    sink: UnsafeCell<[[u8; HALF_LEN]; HALF_COUNT]>,
}

// SAFETY: halves are handed out by the slot protocol; a half is written by at
// most one actor while no other actor reads it.
unsafe impl<const HALF_LEN: usize> Sync for StreamBuffers<HALF_LEN> {}

impl<const HALF_LEN: usize> StreamBuffers<HALF_LEN> {
    /// Zeroed buffers. Const-compatible.
    pub const fn new() -> Self {
        Self::with_source([[0u8; HALF_LEN]; HALF_COUNT])
    }

    /// Buffers with a pre-filled Source (e.g. a fixed test pattern)
    pub const fn with_source(source: [[u8; HALF_LEN]; HALF_COUNT]) -> Self {
        Self {
            source: UnsafeCell::new(source),
            sink: UnsafeCell::new([[0u8; HALF_LEN]; HALF_COUNT]),
        }
    }

    /// Length of one half in bytes
    #[inline(always)]
    pub const fn half_len(&self) -> usize {
        HALF_LEN
    }

    /// Total memory usage in bytes
    #[must_use]
    pub const fn memory_usage() -> usize {
        2 * HALF_COUNT * HALF_LEN
    }

    /// Address of a Source half
    #[inline]
    pub fn source_ptr(&self, slot: SlotIndex) -> *const u8 {
        self.source
            .get()
            .cast::<u8>()
            .wrapping_add(slot.offset(HALF_LEN))
            .cast_const()
    }

    /// Address of a Sink half
    #[inline]
    pub fn sink_ptr(&self, slot: SlotIndex) -> *mut u8 {
        self.sink
            .get()
            .cast::<u8>()
            .wrapping_add(slot.offset(HALF_LEN))
    }

    /// Borrow a completed Sink half for transmission.
    ///
    /// # Safety
    ///
    /// No DMA transfer may target `slot` for as long as the returned slice
    /// is alive. The consumer slot of a correctly driven pipeline satisfies
    /// this.
    #[inline]
    pub unsafe fn sink_half(&self, slot: SlotIndex) -> &[u8] {
        // SAFETY: caller guarantees no concurrent writer for this half.
        unsafe { &(*self.sink.get())[slot.index()] }
    }

    /// Mutably borrow a Source half so the sampling peripheral can fill it.
    ///
    /// # Safety
    ///
    /// No DMA transfer may read `slot` and no other reference to it may be
    /// alive while the returned slice is.
    #[inline]
    #[allow(clippy::mut_from_ref)]
    pub unsafe fn source_half_mut(&self, slot: SlotIndex) -> &mut [u8] {
        // SAFETY: caller guarantees exclusive access to this half.
        unsafe { &mut (*self.source.get())[slot.index()] }
    }

    /// Exclusive view of the Sink, available only while nothing else holds
    /// the buffers.
    pub fn sink_mut(&mut self) -> &mut [[u8; HALF_LEN]; HALF_COUNT] {
        self.sink.get_mut()
    }

    /// Exclusive view of the Source
    pub fn source_mut(&mut self) -> &mut [[u8; HALF_LEN]; HALF_COUNT] {
        self.source.get_mut()
    }
}

impl<const HALF_LEN: usize> Default for StreamBuffers<HALF_LEN> {
    fn default() -> Self {
        Self::new()
    }
}

/// Default buffers: two 32-byte halves per array
pub type StreamBuffersDefault = StreamBuffers<HALF_BUFFER_LEN>;

// =============================================================================
// Unit Tests
// =============================================================================
