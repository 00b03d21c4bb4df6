//! Synchronization and Concurrency Support
//!
//! - **Primitives** (`primitives`): [`CriticalSectionCell`], ISR-safe
//!   interior mutability
//! - **Shared holders** (`shared`): [`SharedCompletion`], the static home of
//!   the DMA completion handler
//!
//! The slot handoff itself does not need a critical section; it is built on
//! single-writer atomics in [`crate::driver::slots`]. This module only covers
//! getting the handler into the interrupt.
//!
//! # Feature Flags
//!
//! - `critical-section`: Enables this module
//!
//! # Example
//!
//! ```ignore
//! use ph_vcp_dma::sync::SharedCompletion;
//!
//! static SLOTS: BufferSlots = BufferSlots::new();
//! static COMPLETION: SharedCompletion = SharedCompletion::new();
//!
//! fn main() {
//!     COMPLETION.register(&SLOTS).unwrap();
//!     // build and prime the pipeline, then loop on run_cycle()
//! }
//!
//! #[interrupt]
//! fn DMA_IRQ() {
//!     COMPLETION.notify();
//! }
//! ```

mod primitives;

pub use primitives::CriticalSectionCell;

mod shared;

pub use shared::SharedCompletion;
