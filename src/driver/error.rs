//! Error types for the DMA-to-VCP pipeline
//!
//! Errors are organized by domain for better diagnostics:
//! - [`ConfigError`]: Setup and registration failures
//! - [`UsbError`]: Consumer-side (USB transmit) failures, all recoverable
//! - [`DmaError`]: Producer-side (DMA start) failures, one of them fatal
//!
//! The unified [`Error`] enum wraps all domain errors. Use
//! [`Error::is_fatal`] to decide whether the supervising loop must halt.

// =============================================================================
// Configuration Errors
// =============================================================================

/// Configuration and registration errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ConfigError {
    /// The completion handler was already handed out
    HandlerAlreadyRegistered,
    /// A cycle ran before the completion handler was registered
    HandlerNotRegistered,
    /// Spin ceiling of zero would never observe an edge
    ZeroSpinCeiling,
    /// Busy retry limit of zero would never transmit
    ZeroRetryLimit,
}

impl core::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl ConfigError {
    /// Returns a human-readable description of the error
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            ConfigError::HandlerAlreadyRegistered => "completion handler already registered",
            ConfigError::HandlerNotRegistered => "completion handler not registered",
            ConfigError::ZeroSpinCeiling => "spin ceiling must be non-zero",
            ConfigError::ZeroRetryLimit => "busy retry limit must be non-zero",
        }
    }
}

// =============================================================================
// USB Errors
// =============================================================================

/// Consumer-side errors
///
/// None of these stop the pipeline. Each one means a chunk may have been
/// dropped or sent stale.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum UsbError {
    /// Consumer slot never advanced and the policy is to skip
    WaitTimeout,
    /// The stack reported busy on every attempt
    BusyExhausted,
    /// The stack reported a non-busy failure
    Rejected,
}

impl core::fmt::Display for UsbError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl UsbError {
    /// Returns a human-readable description of the error
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            UsbError::WaitTimeout => "consumer slot wait timed out",
            UsbError::BusyExhausted => "USB stack busy, retries exhausted",
            UsbError::Rejected => "USB stack rejected transmission",
        }
    }
}

// =============================================================================
// DMA Errors
// =============================================================================

/// Producer-side errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum DmaError {
    /// Producer slot never advanced and the policy is to skip
    WaitTimeout,
    /// The DMA engine refused to start a transfer (fatal)
    StartRejected,
}

impl core::fmt::Display for DmaError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl DmaError {
    /// Returns a human-readable description of the error
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            DmaError::WaitTimeout => "producer slot wait timed out",
            DmaError::StartRejected => "DMA engine rejected transfer start",
        }
    }
}

// =============================================================================
// Unified Error Type
// =============================================================================

/// This enum wraps all domain-specific errors for unified error handling.
///
/// ```ignore
/// match pipeline.run_cycle() {
///     Err(e) if e.is_fatal() => halt(),
///     Err(Error::Stalled { .. }) => reset_link(),
///     _ => {}
/// }
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Error {
    /// Configuration error
    Config(ConfigError),
    /// USB error
    Usb(UsbError),
    /// DMA error
    Dma(DmaError),
    /// Soft timeouts reached the configured stall threshold
    Stalled {
        /// Consecutive soft timeouts observed
        consecutive_timeouts: u32,
    },
}

impl Error {
    /// Whether the error must stop the pipeline.
    ///
    /// Only a rejected DMA start is fatal: it means the engine is
    /// misconfigured, not that the link is slow.
    #[must_use]
    pub const fn is_fatal(&self) -> bool {
        matches!(self, Error::Dma(DmaError::StartRejected))
    }
}

impl core::fmt::Display for Error {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Error::Config(e) => write!(f, "config: {}", e.as_str()),
            Error::Usb(e) => write!(f, "usb: {}", e.as_str()),
            Error::Dma(e) => write!(f, "dma: {}", e.as_str()),
            Error::Stalled {
                consecutive_timeouts,
            } => write!(f, "stalled after {consecutive_timeouts} consecutive timeouts"),
        }
    }
}

// From impls for automatic conversion
impl From<ConfigError> for Error {
    fn from(e: ConfigError) -> Self {
        Error::Config(e)
    }
}

impl From<UsbError> for Error {
    fn from(e: UsbError) -> Self {
        Error::Usb(e)
    }
}

impl From<DmaError> for Error {
    fn from(e: DmaError) -> Self {
        Error::Dma(e)
    }
}

/// Result type alias for pipeline operations
pub type Result<T> = core::result::Result<T, Error>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = core::result::Result<T, ConfigError>;

/// Result type alias for USB drain operations
pub type UsbResult<T> = core::result::Result<T, UsbError>;

/// Result type alias for DMA re-arm operations
pub type DmaResult<T> = core::result::Result<T, DmaError>;

// =============================================================================
// Unit Tests
// =============================================================================
