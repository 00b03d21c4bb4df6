//! Consumer side: wait for a completed half, then hand it to the USB stack.

use embedded_hal::delay::DelayNs;

use super::buffer::StreamBuffers;
use super::config::{PipelineConfig, TimeoutPolicy};
use super::error::{UsbError, UsbResult};
use super::slots::{BufferSlots, SlotIndex};
use crate::internal::constants::INITIAL_CONSUMER_SLOT;
use crate::internal::spin::spin_until_changed;

/// Result of one call into the USB transmit primitive
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum TransmitStatus {
    /// Data accepted
    Ok,
    /// Endpoint still busy with the previous packet; retry
    Busy,
    /// Any other failure; not retried
    Error,
}

/// USB virtual serial port transmit primitive.
///
/// Implement this for the CDC-ACM class of your USB stack. The call must not
/// block on the host; report [`TransmitStatus::Busy`] instead.
pub trait VcpTransmit {
    /// Queue `data` for transmission
    fn transmit(&mut self, data: &[u8]) -> TransmitStatus;
}

impl<T: VcpTransmit + ?Sized> VcpTransmit for &mut T {
    fn transmit(&mut self, data: &[u8]) -> TransmitStatus {
        (**self).transmit(data)
    }
}

/// A half that was handed to the USB stack
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Drained {
    /// Half that was transmitted
    pub slot: SlotIndex,
    /// Iterations spent waiting for the consumer slot to advance
    pub spins: u32,
    /// Busy responses before the stack accepted the data
    pub busy_retries: u32,
    /// The wait timed out and the half was sent anyway
    pub stale: bool,
}

/// Foreground-private consumer state: the last half transmitted.
#[derive(Debug)]
pub struct TransmitDriver {
    last_transmitted: SlotIndex,
}

impl TransmitDriver {
    /// Start out having "transmitted" the power-up consumer half, so the
    /// first completion is seen as an edge.
    pub const fn new() -> Self {
        Self {
            last_transmitted: SlotIndex::from_bit(INITIAL_CONSUMER_SLOT),
        }
    }

    /// The last half handed to the USB stack
    #[inline]
    pub fn last_transmitted(&self) -> SlotIndex {
        self.last_transmitted
    }

    /// Wait for the consumer slot to advance, then transmit that half.
    ///
    /// `last_transmitted` is updated to the half that was attempted whether
    /// or not the stack accepted it. The only case that leaves it untouched is
    /// a timeout under [`TimeoutPolicy::Skip`], where nothing is attempted.
    pub fn drain<U, D, const HALF_LEN: usize>(
        &mut self,
        slots: &BufferSlots,
        buffers: &StreamBuffers<HALF_LEN>,
        usb: &mut U,
        delay: &mut D,
        config: &PipelineConfig,
    ) -> UsbResult<Drained>
    where
        U: VcpTransmit + ?Sized,
        D: DelayNs + ?Sized,
    {
        let wait = spin_until_changed(
            || slots.consumer(),
            self.last_transmitted,
            config.spin_ceiling,
        );
        let stale = wait.timed_out();
        if stale {
            #[cfg(feature = "defmt")]
            defmt::warn!("consumer slot wait timed out ({=u32} spins)", config.spin_ceiling);

            if config.timeout_policy == TimeoutPolicy::Skip {
                return Err(UsbError::WaitTimeout);
            }
        }

        let slot = wait.value();
        let spins = wait.spins(config.spin_ceiling);

        // SAFETY: `slot` is the consumer half; the DMA engine is only ever
        // armed into the producer half, which differs while the handshake
        // is respected.
        let data = unsafe { buffers.sink_half(slot) };
        let result = send_with_retry(usb, data, delay, config);
        self.last_transmitted = slot;

        result.map(|busy_retries| Drained {
            slot,
            spins,
            busy_retries,
            stale,
        })
    }
}

impl Default for TransmitDriver {
    fn default() -> Self {
        Self::new()
    }
}

/// Attempt to transmit, retrying while busy. Returns the busy count on success.
fn send_with_retry<U, D>(
    usb: &mut U,
    data: &[u8],
    delay: &mut D,
    config: &PipelineConfig,
) -> UsbResult<u32>
where
    U: VcpTransmit + ?Sized,
    D: DelayNs + ?Sized,
{
    let mut busy_retries = 0u32;
    loop {
        match usb.transmit(data) {
            TransmitStatus::Ok => return Ok(busy_retries),
            TransmitStatus::Error => {
                #[cfg(feature = "defmt")]
                defmt::warn!("USB stack rejected {=usize} byte chunk", data.len());
                return Err(UsbError::Rejected);
            }
            TransmitStatus::Busy => {
                busy_retries += 1;
                if busy_retries >= config.busy_retry_limit {
                    #[cfg(feature = "defmt")]
                    defmt::warn!("USB busy on {=u32} attempts, chunk dropped", busy_retries);
                    return Err(UsbError::BusyExhausted);
                }
                backoff(delay, config.retry_backoff_ns);
            }
        }
    }
}

#[inline]
fn backoff<D: DelayNs + ?Sized>(delay: &mut D, backoff_ns: u32) {
    if backoff_ns == 0 {
        core::hint::spin_loop();
    } else {
        delay.delay_ns(backoff_ns);
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{MockDelay, MockUsb};

    fn setup() -> (BufferSlots, StreamBuffers<4>) {
        let mut buffers = StreamBuffers::<4>::new();
        buffers.sink_mut()[0] = [0xA0; 4];
        buffers.sink_mut()[1] = [0xB1; 4];
        (BufferSlots::new(), buffers)
    }

    #[test]
    fn drains_half_after_completion() {
        let (slots, buffers) = setup();
        let mut handle = slots.register_completion_handler().unwrap();
        let mut usb = MockUsb::new();
        let mut delay = MockDelay::new();
        let mut driver = TransmitDriver::new();

        handle.on_transfer_complete();
        let drained = driver
            .drain(&slots, &buffers, &mut usb, &mut delay, &PipelineConfig::new())
            .unwrap();

        assert_eq!(drained.slot, SlotIndex::Half1);
        assert_eq!(drained.spins, 0);
        assert!(!drained.stale);
        assert_eq!(usb.sent(), [[0xB1u8; 4].to_vec()]);
        assert_eq!(driver.last_transmitted(), SlotIndex::Half1);
    }

    #[test]
    fn busy_k_times_then_ok_sends_once() {
        let (slots, buffers) = setup();
        let mut handle = slots.register_completion_handler().unwrap();
        let mut usb = MockUsb::new();
        usb.push_busy(7);
        let mut delay = MockDelay::new();
        let mut driver = TransmitDriver::new();

        handle.on_transfer_complete();
        let drained = driver
            .drain(&slots, &buffers, &mut usb, &mut delay, &PipelineConfig::new())
            .unwrap();

        assert_eq!(drained.busy_retries, 7);
        assert_eq!(usb.attempts(), 8);
        assert_eq!(usb.sent().len(), 1);
    }

    #[test]
    fn busy_exhaustion_is_reported() {
        let (slots, buffers) = setup();
        let mut handle = slots.register_completion_handler().unwrap();
        let mut usb = MockUsb::new();
        usb.push_busy(100);
        let mut delay = MockDelay::new();
        let mut driver = TransmitDriver::new();
        let config = PipelineConfig::new().with_busy_retry_limit(5);

        handle.on_transfer_complete();
        let result = driver.drain(&slots, &buffers, &mut usb, &mut delay, &config);

        assert_eq!(result, Err(UsbError::BusyExhausted));
        assert_eq!(usb.attempts(), 5);
        assert!(usb.sent().is_empty());
        // The half was attempted; do not retry it next cycle.
        assert_eq!(driver.last_transmitted(), SlotIndex::Half1);
    }

    #[test]
    fn non_busy_error_is_not_retried() {
        let (slots, buffers) = setup();
        let mut handle = slots.register_completion_handler().unwrap();
        let mut usb = MockUsb::new();
        usb.push_status(TransmitStatus::Error);
        let mut delay = MockDelay::new();
        let mut driver = TransmitDriver::new();

        handle.on_transfer_complete();
        let result = driver.drain(&slots, &buffers, &mut usb, &mut delay, &PipelineConfig::new());

        assert_eq!(result, Err(UsbError::Rejected));
        assert_eq!(usb.attempts(), 1);
    }

    #[test]
    fn backoff_uses_delay_when_configured() {
        let (slots, buffers) = setup();
        let mut handle = slots.register_completion_handler().unwrap();
        let mut usb = MockUsb::new();
        usb.push_busy(3);
        let mut delay = MockDelay::new();
        let mut driver = TransmitDriver::new();
        let config = PipelineConfig::new().with_retry_backoff_ns(250);

        handle.on_transfer_complete();
        driver
            .drain(&slots, &buffers, &mut usb, &mut delay, &config)
            .unwrap();

        assert_eq!(delay.total_ns(), 750);
    }

    #[test]
    fn timeout_with_proceed_sends_stale_half() {
        let (slots, buffers) = setup();
        let mut usb = MockUsb::new();
        let mut delay = MockDelay::new();
        let mut driver = TransmitDriver::new();
        let config = PipelineConfig::new().with_spin_ceiling(50);

        let drained = driver
            .drain(&slots, &buffers, &mut usb, &mut delay, &config)
            .unwrap();

        assert!(drained.stale);
        assert_eq!(drained.slot, SlotIndex::Half0);
        assert_eq!(drained.spins, 50);
        assert_eq!(usb.sent(), [[0xA0u8; 4].to_vec()]);
    }

    #[test]
    fn timeout_with_skip_sends_nothing() {
        let (slots, buffers) = setup();
        let mut usb = MockUsb::new();
        let mut delay = MockDelay::new();
        let mut driver = TransmitDriver::new();
        let config = PipelineConfig::new()
            .with_spin_ceiling(50)
            .with_timeout_policy(TimeoutPolicy::Skip);

        let result = driver.drain(&slots, &buffers, &mut usb, &mut delay, &config);

        assert_eq!(result, Err(UsbError::WaitTimeout));
        assert_eq!(usb.attempts(), 0);
    }
}
