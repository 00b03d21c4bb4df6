//! The per-cycle orchestrator tying the USB and DMA sides together.
//!
//! [`VcpPipeline::run_cycle`] is meant to be called from the application's
//! main loop at least as often as the DMA engine completes a half. Each call
//! waits for the consumer slot to advance and drains that half over USB, then
//! waits for the producer slot to advance and re-arms the DMA engine into it.
//!
//! # Example
//!
//! ```ignore
//! use ph_vcp_dma::{BufferSlots, PipelineConfig, StreamBuffers, VcpPipeline};
//!
//! static SLOTS: BufferSlots = BufferSlots::new();
//! static BUFFERS: StreamBuffers = StreamBuffers::new();
//!
//! let handle = SLOTS.register_completion_handler()?;
//! // move `handle` into the DMA transfer-complete interrupt
//!
//! let mut pipeline = VcpPipeline::new(&SLOTS, &BUFFERS, usb, dma, delay, PipelineConfig::new())?;
//! pipeline.prime()?;
//! loop {
//!     if let Err(e) = pipeline.run_cycle() {
//!         if e.is_fatal() {
//!             error_handler();
//!         }
//!     }
//! }
//! ```

use embedded_hal::delay::DelayNs;

use super::buffer::StreamBuffers;
use super::config::PipelineConfig;
use super::error::{
    ConfigError, ConfigResult, DmaError, DmaResult, Error, Result, UsbError, UsbResult,
};
use super::slots::{BufferSlots, SlotIndex};
use super::stats::PipelineStats;
use super::transfer::{Armed, DmaStart, TransferDriver};
use super::transmit::{Drained, TransmitDriver, VcpTransmit};
use crate::internal::constants::HALF_BUFFER_LEN;

/// What one cycle did on each side.
///
/// Soft conditions such as timeouts or a dropped chunk are reported
/// here rather than as errors; fatal conditions never reach a report.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct CycleReport {
    /// Consumer-side outcome
    pub drain: UsbResult<Drained>,
    /// Producer-side outcome (never [`DmaError::StartRejected`])
    pub rearm: DmaResult<Armed>,
}

impl CycleReport {
    /// Half accepted by the USB stack this cycle, if any
    pub fn sent(&self) -> Option<SlotIndex> {
        self.drain.as_ref().ok().map(|d| d.slot)
    }

    /// Half the DMA engine was armed into this cycle, if any
    pub fn armed(&self) -> Option<SlotIndex> {
        self.rearm.as_ref().ok().map(|a| a.slot)
    }

    /// Whether either wait hit its spin ceiling
    pub fn timed_out(&self) -> bool {
        let drain = match self.drain {
            Ok(d) => d.stale,
            Err(e) => e == UsbError::WaitTimeout,
        };
        let rearm = match self.rearm {
            Ok(a) => a.stale,
            Err(e) => e == DmaError::WaitTimeout,
        };
        drain || rearm
    }
}

/// Double-buffered DMA-to-USB streaming pipeline.
///
/// # Type Parameters
/// * `U` - USB virtual serial port transmit primitive
/// * `M` - DMA engine start primitive
/// * `D` - Delay provider for busy back-off
/// * `HALF_LEN` - Size of one half-buffer in bytes
pub struct VcpPipeline<'a, U, M, D, const HALF_LEN: usize = HALF_BUFFER_LEN> {
    slots: &'a BufferSlots,
    buffers: &'a StreamBuffers<HALF_LEN>,
    usb: U,
    dma: M,
    delay: D,
    config: PipelineConfig,
    transmit: TransmitDriver,
    transfer: TransferDriver,
    stats: PipelineStats,
}

impl<'a, U, M, D, const HALF_LEN: usize> VcpPipeline<'a, U, M, D, HALF_LEN>
where
    U: VcpTransmit,
    M: DmaStart,
    D: DelayNs,
{
    /// Create a pipeline over shared slots and buffers.
    ///
    /// Fails if `config` can never make progress.
    pub fn new(
        slots: &'a BufferSlots,
        buffers: &'a StreamBuffers<HALF_LEN>,
        usb: U,
        dma: M,
        delay: D,
        config: PipelineConfig,
    ) -> ConfigResult<Self> {
        config.validate()?;
        Ok(Self {
            slots,
            buffers,
            usb,
            dma,
            delay,
            config,
            transmit: TransmitDriver::new(),
            transfer: TransferDriver::new(),
            stats: PipelineStats::new(),
        })
    }

    fn ensure_handler(&self) -> Result<()> {
        if self.slots.is_handler_registered() {
            Ok(())
        } else {
            Err(ConfigError::HandlerNotRegistered.into())
        }
    }

    /// Arm the very first transfer into the power-up producer half.
    ///
    /// Without this, no transfer is ever in flight and no completion ever
    /// arrives. Call once, after registering the completion handler.
    pub fn prime(&mut self) -> Result<Armed> {
        self.ensure_handler()?;
        let armed = self.transfer.prime(self.slots, self.buffers, &mut self.dma)?;
        self.stats.transfers_armed = self.stats.transfers_armed.wrapping_add(1);

        #[cfg(feature = "defmt")]
        defmt::info!("pipeline primed, DMA filling half {}", armed.slot);

        Ok(armed)
    }

    /// Run one drain-then-rearm cycle.
    ///
    /// Returns `Err` only for conditions the caller must act on: a rejected
    /// DMA start (fatal, see [`Error::is_fatal`]), a missing completion
    /// handler, or [`Error::Stalled`] once consecutive timeouts reach
    /// [`PipelineConfig::stall_threshold`].
    pub fn run_cycle(&mut self) -> Result<CycleReport> {
        self.ensure_handler()?;

        let drain = self.transmit.drain(
            self.slots,
            self.buffers,
            &mut self.usb,
            &mut self.delay,
            &self.config,
        );
        self.stats.record_drain(&drain, HALF_LEN);

        let rearm = self
            .transfer
            .rearm(self.slots, self.buffers, &mut self.dma, &self.config);
        self.stats.record_rearm(&rearm);
        self.stats.cycles = self.stats.cycles.wrapping_add(1);

        if let Err(DmaError::StartRejected) = rearm {
            return Err(DmaError::StartRejected.into());
        }

        let report = CycleReport { drain, rearm };
        if report.timed_out() {
            self.stats.consecutive_timeouts = self.stats.consecutive_timeouts.saturating_add(1);
        } else {
            self.stats.consecutive_timeouts = 0;
        }

        let threshold = self.config.stall_threshold;
        if threshold != 0 && self.stats.consecutive_timeouts >= threshold {
            #[cfg(feature = "defmt")]
            defmt::error!(
                "pipeline stalled: {=u32} cycles with timeouts",
                self.stats.consecutive_timeouts
            );
            return Err(Error::Stalled {
                consecutive_timeouts: self.stats.consecutive_timeouts,
            });
        }

        Ok(report)
    }

    /// Counters accumulated so far
    #[inline]
    pub fn stats(&self) -> &PipelineStats {
        &self.stats
    }

    /// Zero all counters
    pub fn reset_stats(&mut self) {
        self.stats = PipelineStats::new();
    }

    /// Active configuration
    #[inline]
    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Shared slots this pipeline polls
    #[inline]
    pub fn slots(&self) -> &BufferSlots {
        self.slots
    }

    /// Last half handed to the USB stack
    #[inline]
    pub fn last_transmitted(&self) -> SlotIndex {
        self.transmit.last_transmitted()
    }

    /// Last half a DMA transfer was started into
    #[inline]
    pub fn last_armed(&self) -> SlotIndex {
        self.transfer.last_armed()
    }

    /// Borrow the USB primitive
    pub fn usb(&self) -> &U {
        &self.usb
    }

    /// Mutably borrow the USB primitive
    pub fn usb_mut(&mut self) -> &mut U {
        &mut self.usb
    }

    /// Borrow the DMA primitive
    pub fn dma(&self) -> &M {
        &self.dma
    }

    /// Mutably borrow the DMA primitive
    pub fn dma_mut(&mut self) -> &mut M {
        &mut self.dma
    }

    /// Tear down and return the collaborators
    pub fn release(self) -> (U, M, D) {
        (self.usb, self.dma, self.delay)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
