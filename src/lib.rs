//! DMA-to-VCP Streaming Pipeline
//!
//! A `no_std`, `no_alloc` double-buffered pipeline that streams data from a
//! DMA engine to a USB virtual serial port (CDC-ACM) in fixed-size chunks,
//! without tearing.
//!
//! # Architecture
//!
//! Two backing arrays, Source and Sink, are each split into two halves. The
//! DMA engine copies one Source half into the matching Sink half while the
//! USB side transmits the other Sink half. Ownership is decided by two
//! single-bit indices:
//!
//! 1. **Slots** ([`BufferSlots`]): producer (DMA) and consumer (USB) half,
//!    written only by the transfer-complete interrupt through the unique
//!    [`CompletionHandle`]
//! 2. **Drivers** ([`TransmitDriver`], [`TransferDriver`]): edge-triggered
//!    polling of the slots, bounded by a spin ceiling
//! 3. **Pipeline** ([`VcpPipeline`]): one drain-then-rearm cycle per call
//!
//! The USB stack and the DMA engine are collaborators behind the
//! [`VcpTransmit`] and [`DmaStart`] traits.
//!
//! # Error Model
//!
//! - Soft timeouts and USB busy exhaustion are counted in [`PipelineStats`]
//!   and reported per cycle in [`CycleReport`]
//! - A rejected DMA start is fatal: [`VcpPipeline::run_cycle`] returns an
//!   error with [`Error::is_fatal`] set and the caller halts or resets
//!
//! # Features
//!
//! - `defmt`: Enable defmt logging and formatting for public types
//! - `critical-section`: Enable [`sync::SharedCompletion`] for parking the
//!   completion handler where the interrupt can reach it
//!
//! # Example
//!
//! ```ignore
//! use ph_vcp_dma::{BufferSlots, PipelineConfig, StreamBuffers, VcpPipeline};
//! use ph_vcp_dma::sync::SharedCompletion;
//!
//! static SLOTS: BufferSlots = BufferSlots::new();
//! static BUFFERS: StreamBuffers = StreamBuffers::new();
//! static COMPLETION: SharedCompletion = SharedCompletion::new();
//!
//! COMPLETION.register(&SLOTS).unwrap();
//!
//! let mut pipeline =
//!     VcpPipeline::new(&SLOTS, &BUFFERS, usb, dma, delay, PipelineConfig::new()).unwrap();
//! pipeline.prime().unwrap();
//!
//! loop {
//!     match pipeline.run_cycle() {
//!         Ok(_) => {}
//!         Err(e) if e.is_fatal() => error_handler(),
//!         Err(_) => {}
//!     }
//! }
//!
//! #[interrupt]
//! fn DMA_IRQ() {
//!     COMPLETION.notify();
//! }
//! ```
//!
//! # Memory Requirements
//!
//! With the default 32-byte halves: 128 bytes of DMA-capable SRAM for the
//! two backing arrays.

#![no_std]
#![deny(missing_docs)]
#![allow(unsafe_code)]
#![deny(unsafe_op_in_unsafe_fn)]
// Clippy lint levels live here; thresholds and config are in Cargo.toml.
#![deny(clippy::correctness)]
#![warn(
    clippy::suspicious,
    clippy::style,
    clippy::complexity,
    clippy::perf,
    clippy::cloned_instead_of_copied,
    clippy::explicit_iter_loop,
    clippy::implicit_clone,
    clippy::inconsistent_struct_constructor,
    clippy::manual_assert,
    clippy::manual_let_else,
    clippy::match_same_arms,
    clippy::needless_pass_by_value,
    clippy::semicolon_if_nothing_returned,
    clippy::uninlined_format_args,
    clippy::unnested_or_patterns,
    clippy::std_instead_of_core,
    clippy::std_instead_of_alloc,
    clippy::alloc_instead_of_core
)]
#![allow(
    clippy::mod_module_files,
    clippy::self_named_module_files,
    clippy::similar_names,
    clippy::too_many_arguments,
    clippy::must_use_candidate,
    clippy::assertions_on_constants,
    clippy::cast_possible_truncation,
    clippy::cast_lossless,
    clippy::panic_in_result_fn,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::module_name_repetitions,
    clippy::wildcard_imports,
    clippy::items_after_statements
)]

// =============================================================================
// Modules
// =============================================================================

pub mod driver;

// Internal implementation details (pub(crate) only)
mod internal;

#[cfg(feature = "critical-section")]
#[cfg_attr(docsrs, doc(cfg(feature = "critical-section")))]
pub mod sync;

// Test utilities (only available during testing)
#[cfg(test)]
pub mod testing;

// =============================================================================
// Re-exports
// =============================================================================

pub use driver::buffer::{StreamBuffers, StreamBuffersDefault};
pub use driver::config::{PipelineConfig, TimeoutPolicy};
pub use driver::error::{
    ConfigError, ConfigResult, DmaError, DmaResult, Error, Result, UsbError, UsbResult,
};
pub use driver::pipeline::{CycleReport, VcpPipeline};
pub use driver::slots::{BufferSlots, CompletionHandle, SlotIndex, SlotSnapshot};
pub use driver::stats::PipelineStats;
pub use driver::throughput::{ThroughputMeter, ThroughputSample};
pub use driver::transfer::{Armed, DmaStart, DmaStartError, TransferDriver, TransferRequest};
pub use driver::transmit::{Drained, TransmitDriver, TransmitStatus, VcpTransmit};
pub use internal::spin::WaitOutcome;

// Re-export sync types when critical-section is enabled
#[cfg(feature = "critical-section")]
pub use sync::{CriticalSectionCell, SharedCompletion};

/// Shared pipeline constants.
///
/// Grouped into a dedicated module to keep the top-level facade focused on
/// pipeline types.
pub mod constants {
    pub use crate::internal::constants::{
        // Polling budgets
        BUSY_RETRY_LIMIT,
        DEFAULT_RETRY_BACKOFF_NS,
        DEFAULT_STALL_THRESHOLD,
        // Buffer geometry
        FULL_BUFFER_LEN,
        HALF_BUFFER_LEN,
        HALF_COUNT,
        // Initial slot assignment
        INITIAL_CONSUMER_SLOT,
        INITIAL_PRODUCER_SLOT,
        SPIN_CEILING,
        // Throughput metering
        THROUGHPUT_WINDOW_US,
    };
}

// =============================================================================
// Macro Helpers
// =============================================================================

/// Declare the static slots, buffers and completion holder for a pipeline.
///
/// Buffers are placed in the section named by the optional last argument,
/// for targets where only some SRAM is reachable by DMA.
///
/// # Examples
///
/// ```ignore
/// ph_vcp_dma::vcp_statics!(SLOTS, BUFFERS, COMPLETION);
///
/// COMPLETION.register(&SLOTS).unwrap();
/// let pipeline = VcpPipeline::new(&SLOTS, &BUFFERS, usb, dma, delay, PipelineConfig::new());
/// ```
#[cfg(feature = "critical-section")]
#[macro_export]
macro_rules! vcp_statics {
    ($slots:ident, $buffers:ident, $completion:ident) => {
        $crate::vcp_statics!($slots, $buffers, $completion, 32);
    };
    ($slots:ident, $buffers:ident, $completion:ident, $half:expr) => {
        static $slots: $crate::BufferSlots = $crate::BufferSlots::new();
        static $buffers: $crate::StreamBuffers<{ $half }> = $crate::StreamBuffers::new();
        static $completion: $crate::sync::SharedCompletion = $crate::sync::SharedCompletion::new();
    };
    ($slots:ident, $buffers:ident, $completion:ident, $half:expr, $section:literal) => {
        static $slots: $crate::BufferSlots = $crate::BufferSlots::new();
        #[unsafe(link_section = $section)]
        static $buffers: $crate::StreamBuffers<{ $half }> = $crate::StreamBuffers::new();
        static $completion: $crate::sync::SharedCompletion = $crate::sync::SharedCompletion::new();
    };
}

#[cfg(all(test, feature = "critical-section"))]
mod macro_tests {
    use crate::SlotIndex;

    crate::vcp_statics!(SLOTS, BUFFERS, COMPLETION, 8);

    #[test]
    fn statics_wire_up() {
        COMPLETION.register(&SLOTS).unwrap();
        assert_eq!(BUFFERS.half_len(), 8);
        assert!(COMPLETION.notify());
        assert_eq!(SLOTS.consumer(), SlotIndex::Half1);
    }
}
