//! Core pipeline components.
//!
//! - [`slots`] - Shared slot indices and the completion handler
//! - [`buffer`] - Source and Sink backing arrays
//! - [`transmit`] - Consumer side: USB transmit with busy retry
//! - [`transfer`] - Producer side: DMA re-arm
//! - [`pipeline`] - The per-cycle orchestrator
//! - [`config`] - Configuration and builder
//! - [`error`] - Error types and result aliases
//! - [`stats`] - Pipeline counters
//! - [`throughput`] - Byte-rate metering
//!
//! # Example
//!
//! ```ignore
//! use ph_vcp_dma::driver::{PipelineConfig, TimeoutPolicy};
//!
//! let config = PipelineConfig::new()
//!     .with_timeout_policy(TimeoutPolicy::Skip)
//!     .with_stall_threshold(8);
//! ```

// Submodules
pub mod buffer;
pub mod config;
pub mod error;
pub mod pipeline;
pub mod slots;
pub mod stats;
pub mod throughput;
pub mod transfer;
pub mod transmit;

// Re-exports for convenience
pub use buffer::{StreamBuffers, StreamBuffersDefault};
pub use config::{PipelineConfig, TimeoutPolicy};
pub use error::{
    ConfigError, ConfigResult, DmaError, DmaResult, Error, Result, UsbError, UsbResult,
};
pub use pipeline::{CycleReport, VcpPipeline};
pub use slots::{BufferSlots, CompletionHandle, SlotIndex, SlotSnapshot};
pub use stats::PipelineStats;
pub use throughput::{ThroughputMeter, ThroughputSample};
pub use transfer::{Armed, DmaStart, DmaStartError, TransferDriver, TransferRequest};
pub use transmit::{Drained, TransmitDriver, TransmitStatus, VcpTransmit};
