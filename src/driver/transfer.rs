//! Producer side: wait for the DMA engine to move on, then arm the next
//! Source-to-Sink transfer into the free half.

use super::buffer::StreamBuffers;
use super::config::{PipelineConfig, TimeoutPolicy};
use super::error::{DmaError, DmaResult};
use super::slots::{BufferSlots, SlotIndex};
use crate::internal::constants::INITIAL_PRODUCER_SLOT;
use crate::internal::spin::spin_until_changed;

/// A memory-to-memory transfer of one half
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransferRequest {
    /// Half being filled
    pub slot: SlotIndex,
    /// Byte offset of the half inside Source
    pub source_offset: usize,
    /// Byte offset of the half inside Sink
    pub destination_offset: usize,
    /// Bytes to copy
    pub len: usize,
    /// Address of the Source half
    pub source: *const u8,
    /// Address of the Sink half
    pub destination: *mut u8,
}

impl TransferRequest {
    /// Build the request that fills `slot` of `buffers`
    pub fn for_slot<const HALF_LEN: usize>(
        buffers: &StreamBuffers<HALF_LEN>,
        slot: SlotIndex,
    ) -> Self {
        let offset = slot.offset(HALF_LEN);
        Self {
            slot,
            source_offset: offset,
            destination_offset: offset,
            len: HALF_LEN,
            source: buffers.source_ptr(slot),
            destination: buffers.sink_ptr(slot),
        }
    }
}

/// The DMA engine refused to start
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct DmaStartError;

/// Non-blocking DMA start primitive.
///
/// Start the transfer and return immediately. When the transfer finishes,
/// the transfer-complete interrupt must call
/// [`CompletionHandle::on_transfer_complete`](super::slots::CompletionHandle::on_transfer_complete).
pub trait DmaStart {
    /// Start `request` with the completion interrupt enabled
    fn start(&mut self, request: TransferRequest) -> Result<(), DmaStartError>;
}

impl<T: DmaStart + ?Sized> DmaStart for &mut T {
    fn start(&mut self, request: TransferRequest) -> Result<(), DmaStartError> {
        (**self).start(request)
    }
}

/// A transfer that was started
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Armed {
    /// Half the DMA engine is now filling
    pub slot: SlotIndex,
    /// Iterations spent waiting for the producer slot to advance
    pub spins: u32,
    /// The wait timed out and the transfer was started anyway
    pub stale: bool,
}

/// Foreground-private producer state: the last half armed.
#[derive(Debug)]
pub struct TransferDriver {
    last_armed: SlotIndex,
}

impl TransferDriver {
    /// Start out having armed the power-up producer half.
    pub const fn new() -> Self {
        Self {
            last_armed: SlotIndex::from_bit(INITIAL_PRODUCER_SLOT),
        }
    }

    /// The last half a transfer was started into
    #[inline]
    pub fn last_armed(&self) -> SlotIndex {
        self.last_armed
    }

    /// Start a transfer into the current producer half without waiting.
    ///
    /// Used once at start-up, before any completion can happen.
    pub fn prime<M, const HALF_LEN: usize>(
        &mut self,
        slots: &BufferSlots,
        buffers: &StreamBuffers<HALF_LEN>,
        dma: &mut M,
    ) -> DmaResult<Armed>
    where
        M: DmaStart + ?Sized,
    {
        let slot = slots.producer();
        start(dma, buffers, slot)?;
        self.last_armed = slot;
        Ok(Armed {
            slot,
            spins: 0,
            stale: false,
        })
    }

    /// Wait for the producer slot to advance, then arm that half.
    ///
    /// A refused start is [`DmaError::StartRejected`], which is fatal.
    pub fn rearm<M, const HALF_LEN: usize>(
        &mut self,
        slots: &BufferSlots,
        buffers: &StreamBuffers<HALF_LEN>,
        dma: &mut M,
        config: &PipelineConfig,
    ) -> DmaResult<Armed>
    where
        M: DmaStart + ?Sized,
    {
        let wait = spin_until_changed(|| slots.producer(), self.last_armed, config.spin_ceiling);
        let stale = wait.timed_out();
        if stale {
            #[cfg(feature = "defmt")]
            defmt::warn!("producer slot wait timed out ({=u32} spins)", config.spin_ceiling);

            if config.timeout_policy == TimeoutPolicy::Skip {
                return Err(DmaError::WaitTimeout);
            }
        }

        let slot = wait.value();
        start(dma, buffers, slot)?;
        self.last_armed = slot;

        Ok(Armed {
            slot,
            spins: wait.spins(config.spin_ceiling),
            stale,
        })
    }
}

impl Default for TransferDriver {
    fn default() -> Self {
        Self::new()
    }
}

fn start<M, const HALF_LEN: usize>(
    dma: &mut M,
    buffers: &StreamBuffers<HALF_LEN>,
    slot: SlotIndex,
) -> DmaResult<()>
where
    M: DmaStart + ?Sized,
{
    dma.start(TransferRequest::for_slot(buffers, slot))
        .map_err(|DmaStartError| {
            #[cfg(feature = "defmt")]
            defmt::error!("DMA engine rejected transfer into half {}", slot);
            DmaError::StartRejected
        })
}

// =============================================================================
// Unit Tests
// =============================================================================
