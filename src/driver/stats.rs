//! Pipeline counters.
//!
//! Every soft condition the pipeline tolerates is counted here so that data
//! loss and staleness are visible to the application.

use super::error::{DmaError, UsbError};
use super::transfer::Armed;
use super::transmit::Drained;

/// Running totals kept by [`VcpPipeline`](super::pipeline::VcpPipeline)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct PipelineStats {
    /// Cycles run
    pub cycles: u32,
    /// Halves accepted by the USB stack
    pub chunks_sent: u32,
    /// Bytes accepted by the USB stack
    pub bytes_sent: u64,
    /// Busy responses across all transmissions
    pub busy_retries: u32,
    /// Halves dropped because the stack stayed busy
    pub busy_exhausted: u32,
    /// Halves the stack refused
    pub usb_rejected: u32,
    /// Consumer waits that hit the spin ceiling
    pub consumer_timeouts: u32,
    /// Producer waits that hit the spin ceiling
    pub producer_timeouts: u32,
    /// Halves sent after a consumer timeout (possibly stale or duplicated)
    pub stale_chunks: u32,
    /// Transfers started into the DMA engine
    pub transfers_armed: u32,
    /// Soft timeouts since the last cycle without one
    pub consecutive_timeouts: u32,
}

impl PipelineStats {
    /// All counters at zero
    pub const fn new() -> Self {
        Self {
            cycles: 0,
            chunks_sent: 0,
            bytes_sent: 0,
            busy_retries: 0,
            busy_exhausted: 0,
            usb_rejected: 0,
            consumer_timeouts: 0,
            producer_timeouts: 0,
            stale_chunks: 0,
            transfers_armed: 0,
            consecutive_timeouts: 0,
        }
    }

    pub(crate) fn record_drain(&mut self, result: &Result<Drained, UsbError>, half_len: usize) {
        match result {
            Ok(drained) => {
                self.chunks_sent = self.chunks_sent.wrapping_add(1);
                self.bytes_sent = self.bytes_sent.wrapping_add(half_len as u64);
                self.busy_retries = self.busy_retries.wrapping_add(drained.busy_retries);
                if drained.stale {
                    self.consumer_timeouts = self.consumer_timeouts.wrapping_add(1);
                    self.stale_chunks = self.stale_chunks.wrapping_add(1);
                }
            }
            Err(UsbError::WaitTimeout) => {
                self.consumer_timeouts = self.consumer_timeouts.wrapping_add(1);
            }
            Err(UsbError::BusyExhausted) => {
                self.busy_exhausted = self.busy_exhausted.wrapping_add(1);
            }
            Err(UsbError::Rejected) => {
                self.usb_rejected = self.usb_rejected.wrapping_add(1);
            }
        }
    }

    pub(crate) fn record_rearm(&mut self, result: &Result<Armed, DmaError>) {
        match result {
            Ok(armed) => {
                self.transfers_armed = self.transfers_armed.wrapping_add(1);
                if armed.stale {
                    self.producer_timeouts = self.producer_timeouts.wrapping_add(1);
                }
            }
            Err(DmaError::WaitTimeout) => {
                self.producer_timeouts = self.producer_timeouts.wrapping_add(1);
            }
            Err(DmaError::StartRejected) => {}
        }
    }

    /// Total soft timeouts on either side
    pub fn total_timeouts(&self) -> u32 {
        self.consumer_timeouts.wrapping_add(self.producer_timeouts)
    }

    /// Halves that never reached the host
    pub fn chunks_lost(&self) -> u32 {
        self.busy_exhausted.wrapping_add(self.usb_rejected)
    }
}
