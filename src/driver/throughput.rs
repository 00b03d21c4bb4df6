//! Throughput metering over a fixed reporting window.
//!
//! The meter does not read a clock. Feed it byte counts together with a
//! monotonic microsecond timestamp from whatever timer the target has; once
//! a window has elapsed it yields a [`ThroughputSample`].

use crate::internal::constants::{MICROS_PER_SEC, THROUGHPUT_WINDOW_US};

/// Rate measured over one window
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ThroughputSample {
    /// Bytes recorded since the meter started
    pub total_bytes: u64,
    /// Microseconds since the meter started
    pub elapsed_us: u64,
    /// Average rate since the meter started
    pub bytes_per_sec: u64,
}

/// Cumulative byte-rate meter
#[derive(Debug, Clone, Copy)]
pub struct ThroughputMeter {
    window_us: u64,
    start_us: Option<u64>,
    last_report_us: u64,
    total_bytes: u64,
}

impl ThroughputMeter {
    /// Meter with the default 10 s window
    pub const fn new() -> Self {
        Self::with_window_us(THROUGHPUT_WINDOW_US)
    }

    /// Meter with a custom window
    pub const fn with_window_us(window_us: u64) -> Self {
        Self {
            window_us,
            start_us: None,
            last_report_us: 0,
            total_bytes: 0,
        }
    }

    /// Record `bytes` delivered at `now_us`.
    ///
    /// The first call only starts the clock; its bytes are not counted,
    /// since there is no interval to attribute them to. Returns a sample
    /// when the window has elapsed since the previous report.
    pub fn record(&mut self, bytes: usize, now_us: u64) -> Option<ThroughputSample> {
        let Some(start_us) = self.start_us else {
            self.start_us = Some(now_us);
            self.last_report_us = now_us;
            return None;
        };

        self.total_bytes = self.total_bytes.wrapping_add(bytes as u64);

        if now_us.saturating_sub(self.last_report_us) < self.window_us {
            return None;
        }
        self.last_report_us = now_us;

        let elapsed_us = now_us.saturating_sub(start_us);
        if elapsed_us == 0 {
            return None;
        }

        Some(ThroughputSample {
            total_bytes: self.total_bytes,
            elapsed_us,
            bytes_per_sec: self.total_bytes.saturating_mul(MICROS_PER_SEC) / elapsed_us,
        })
    }

    /// Bytes recorded so far
    pub fn total_bytes(&self) -> u64 {
        self.total_bytes
    }

    /// Forget everything and wait for a new first sample
    pub fn reset(&mut self) {
        *self = Self::with_window_us(self.window_us);
    }
}

impl Default for ThroughputMeter {
    fn default() -> Self {
        Self::new()
    }
}
