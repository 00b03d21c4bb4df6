//! Testing utilities and mock implementations
//!
//! Mock USB, DMA and delay collaborators for exercising the pipeline on the
//! host without hardware access.
//!
//! Only available when running `cargo test`.

// Note: The #[cfg(test)] attribute is applied in lib.rs where this module is declared
#![allow(missing_docs)]
#![allow(clippy::std_instead_of_core, clippy::std_instead_of_alloc)]

extern crate std;

use core::cell::RefCell;
use std::collections::VecDeque;
use std::vec::Vec;

use crate::driver::transfer::{DmaStart, DmaStartError, TransferRequest};
use crate::driver::transmit::{TransmitStatus, VcpTransmit};

// =============================================================================
// Mock USB
// =============================================================================

/// Mock USB virtual serial port
///
/// Returns scripted statuses in order, then `Ok` forever. Accepted payloads
/// are recorded.
///
/// # Example
///
/// ```ignore
/// let mut usb = MockUsb::new();
/// usb.push_busy(3);
/// // the next three transmits report busy, the fourth succeeds
/// ```
#[derive(Debug, Default)]
pub struct MockUsb {
    script: VecDeque<TransmitStatus>,
    sent: Vec<Vec<u8>>,
    attempts: usize,
}

impl MockUsb {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue one status
    pub fn push_status(&mut self, status: TransmitStatus) {
        self.script.push_back(status);
    }

    /// Queue `count` busy responses
    pub fn push_busy(&mut self, count: usize) {
        for _ in 0..count {
            self.script.push_back(TransmitStatus::Busy);
        }
    }

    /// Payloads the mock accepted
    pub fn sent(&self) -> Vec<Vec<u8>> {
        self.sent.clone()
    }

    /// Calls to `transmit`, accepted or not
    pub fn attempts(&self) -> usize {
        self.attempts
    }
}

impl VcpTransmit for MockUsb {
    fn transmit(&mut self, data: &[u8]) -> TransmitStatus {
        self.attempts += 1;
        let status = self.script.pop_front().unwrap_or(TransmitStatus::Ok);
        if status == TransmitStatus::Ok {
            self.sent.push(data.to_vec());
        }
        status
    }
}

// =============================================================================
// Mock DMA
// =============================================================================

/// Mock memory-to-memory DMA engine
///
/// Records every started request. The most recent one stays pending until
/// [`MockDma::complete_pending`] performs the copy, standing in for the
/// hardware finishing the transfer.
#[derive(Debug, Default)]
pub struct MockDma {
    requests: Vec<TransferRequest>,
    pending: Option<TransferRequest>,
    reject_next: bool,
}

impl MockDma {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the next `start` fail
    pub fn reject_next(&mut self) {
        self.reject_next = true;
    }

    /// Requests started so far
    pub fn requests(&self) -> &[TransferRequest] {
        &self.requests
    }

    /// Copy the pending request's Source half into its Sink half
    pub fn complete_pending(&mut self) -> Option<TransferRequest> {
        let request = self.pending.take()?;
        // SAFETY: requests are built from live `StreamBuffers` halves of
        // `len` bytes; Source and Sink never overlap.
        unsafe {
            core::ptr::copy_nonoverlapping(request.source, request.destination, request.len);
        }
        Some(request)
    }
}

impl DmaStart for MockDma {
    fn start(&mut self, request: TransferRequest) -> Result<(), DmaStartError> {
        if self.reject_next {
            self.reject_next = false;
            return Err(DmaStartError);
        }
        self.requests.push(request);
        self.pending = Some(request);
        Ok(())
    }
}

// =============================================================================
// Mock Delay
// =============================================================================

/// Mock delay that tracks total time without sleeping
#[derive(Debug, Default)]
pub struct MockDelay {
    total_ns: RefCell<u64>,
}

impl MockDelay {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get total nanoseconds that were "delayed"
    pub fn total_ns(&self) -> u64 {
        *self.total_ns.borrow()
    }

    /// Reset the delay counter
    pub fn reset(&self) {
        *self.total_ns.borrow_mut() = 0;
    }
}

impl embedded_hal::delay::DelayNs for MockDelay {
    fn delay_ns(&mut self, ns: u32) {
        *self.total_ns.borrow_mut() += u64::from(ns);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::driver::buffer::StreamBuffers;
    use crate::driver::slots::SlotIndex;
    use embedded_hal::delay::DelayNs;

    #[test]
    fn mock_usb_scripted_then_ok() {
        let mut usb = MockUsb::new();
        usb.push_busy(1);
        assert_eq!(usb.transmit(&[1]), TransmitStatus::Busy);
        assert_eq!(usb.transmit(&[2]), TransmitStatus::Ok);
        assert_eq!(usb.attempts(), 2);
        assert_eq!(usb.sent(), [[2u8].to_vec()]);
    }

    #[test]
    fn mock_dma_copies_on_completion() {
        let buffers = StreamBuffers::<2>::with_source([[1, 2], [3, 4]]);
        let mut dma = MockDma::new();
        dma.start(TransferRequest::for_slot(&buffers, SlotIndex::Half1))
            .unwrap();
        assert!(dma.complete_pending().is_some());
        assert!(dma.complete_pending().is_none());
        // SAFETY: no transfer pending.
        assert_eq!(unsafe { buffers.sink_half(SlotIndex::Half1) }, &[3, 4]);
    }

    #[test]
    fn mock_dma_reject_once() {
        let buffers = StreamBuffers::<2>::new();
        let mut dma = MockDma::new();
        dma.reject_next();
        let request = TransferRequest::for_slot(&buffers, SlotIndex::Half0);
        assert_eq!(dma.start(request), Err(DmaStartError));
        assert_eq!(dma.start(request), Ok(()));
        assert_eq!(dma.requests().len(), 1);
    }

    #[test]
    fn mock_delay_accumulates() {
        let mut delay = MockDelay::new();
        delay.delay_ns(100);
        delay.delay_us(1);
        assert_eq!(delay.total_ns(), 1_100);
        delay.reset();
        assert_eq!(delay.total_ns(), 0);
    }
}
