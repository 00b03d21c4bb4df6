//! Centralized Constants
//!
//! Single source of truth for the buffer geometry and polling budgets used
//! throughout the pipeline.
//!
//! # Organization
//!
//! - **Buffer geometry**: half-buffer and backing array sizes
//! - **Polling budgets**: spin ceilings and busy retry limits
//! - **Initial slot assignment**: which half each side owns at power-up
//! - **Throughput metering**: reporting window

// =============================================================================
// Buffer Geometry
// =============================================================================

/// Size of one half-buffer in bytes (the unit of one USB transmission)
pub const HALF_BUFFER_LEN: usize = 32;

/// Size of a full backing array (two halves)
pub const FULL_BUFFER_LEN: usize = 2 * HALF_BUFFER_LEN;

/// Number of halves in a backing array
pub const HALF_COUNT: usize = 2;

// =============================================================================
// Polling Budgets
// =============================================================================

/// Maximum iterations spent polling a slot index before the wait is abandoned
///
/// The value is calibrated to the clock of the target, not to wall-clock time.
pub const SPIN_CEILING: u32 = 0xFFF0;

/// Maximum transmit attempts while the USB stack reports busy
pub const BUSY_RETRY_LIMIT: u32 = 0xFFF0;

/// Default back-off between busy retries in nanoseconds (0 = spin hint only)
pub const DEFAULT_RETRY_BACKOFF_NS: u32 = 0;

/// Default consecutive soft timeouts before escalation (0 = never escalate)
pub const DEFAULT_STALL_THRESHOLD: u32 = 0;

// =============================================================================
// Initial Slot Assignment
// =============================================================================

/// Half-buffer the DMA engine fills first
pub const INITIAL_PRODUCER_SLOT: u8 = 1;

/// Half-buffer the USB side is allowed to read at power-up
pub const INITIAL_CONSUMER_SLOT: u8 = 0;

// =============================================================================
// Throughput Metering
// =============================================================================

/// Default throughput reporting window in microseconds (10 s)
pub const THROUGHPUT_WINDOW_US: u64 = 10_000_000;

/// Microseconds per second
pub const MICROS_PER_SEC: u64 = 1_000_000;
