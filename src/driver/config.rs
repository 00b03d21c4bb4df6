//! Configuration types for the DMA-to-VCP pipeline

use super::error::{ConfigError, ConfigResult};
use crate::internal::constants::{
    BUSY_RETRY_LIMIT, DEFAULT_RETRY_BACKOFF_NS, DEFAULT_STALL_THRESHOLD, SPIN_CEILING,
};

/// What to do when a slot wait exhausts its spin ceiling
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum TimeoutPolicy {
    /// Act on the current slot anyway (may send a stale or duplicate chunk)
    #[default]
    Proceed,
    /// Skip the action and report the timeout
    Skip,
}

/// Pipeline configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct PipelineConfig {
    /// Iterations spent polling a slot before the wait is abandoned
    pub spin_ceiling: u32,
    /// Transmit attempts while the USB stack reports busy
    pub busy_retry_limit: u32,
    /// Delay between busy retries in nanoseconds (0 = spin hint only)
    pub retry_backoff_ns: u32,
    /// Behavior when a slot wait times out
    pub timeout_policy: TimeoutPolicy,
    /// Consecutive soft timeouts that escalate to [`Error::Stalled`] (0 = never)
    ///
    /// [`Error::Stalled`]: super::error::Error::Stalled
    pub stall_threshold: u32,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl PipelineConfig {
    /// Create a new configuration with defaults
    #[must_use]
    pub const fn new() -> Self {
        Self {
            spin_ceiling: SPIN_CEILING,
            busy_retry_limit: BUSY_RETRY_LIMIT,
            retry_backoff_ns: DEFAULT_RETRY_BACKOFF_NS,
            timeout_policy: TimeoutPolicy::Proceed,
            stall_threshold: DEFAULT_STALL_THRESHOLD,
        }
    }

    // =========================================================================
    // Builder Methods
    // =========================================================================

    /// Set the slot wait spin ceiling
    #[must_use]
    pub const fn with_spin_ceiling(mut self, ceiling: u32) -> Self {
        self.spin_ceiling = ceiling;
        self
    }

    /// Set the busy retry limit
    #[must_use]
    pub const fn with_busy_retry_limit(mut self, limit: u32) -> Self {
        self.busy_retry_limit = limit;
        self
    }

    /// Set the back-off between busy retries
    #[must_use]
    pub const fn with_retry_backoff_ns(mut self, backoff_ns: u32) -> Self {
        self.retry_backoff_ns = backoff_ns;
        self
    }

    /// Set the soft timeout policy
    #[must_use]
    pub const fn with_timeout_policy(mut self, policy: TimeoutPolicy) -> Self {
        self.timeout_policy = policy;
        self
    }

    /// Set the stall escalation threshold
    #[must_use]
    pub const fn with_stall_threshold(mut self, threshold: u32) -> Self {
        self.stall_threshold = threshold;
        self
    }

    /// Check the configuration for values that can never make progress
    pub const fn validate(&self) -> ConfigResult<()> {
        if self.spin_ceiling == 0 {
            return Err(ConfigError::ZeroSpinCeiling);
        }
        if self.busy_retry_limit == 0 {
            return Err(ConfigError::ZeroRetryLimit);
        }
        Ok(())
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_constants() {
        let config = PipelineConfig::default();
        assert_eq!(config.spin_ceiling, 65_520);
        assert_eq!(config.busy_retry_limit, 65_520);
        assert_eq!(config.retry_backoff_ns, 0);
        assert_eq!(config.timeout_policy, TimeoutPolicy::Proceed);
        assert_eq!(config.stall_threshold, 0);
    }

    #[test]
    fn new_equals_default() {
        assert_eq!(PipelineConfig::new(), PipelineConfig::default());
    }

    #[test]
    fn builder_sets_fields() {
        let config = PipelineConfig::new()
            .with_spin_ceiling(10)
            .with_busy_retry_limit(20)
            .with_retry_backoff_ns(500)
            .with_timeout_policy(TimeoutPolicy::Skip)
            .with_stall_threshold(3);

        assert_eq!(config.spin_ceiling, 10);
        assert_eq!(config.busy_retry_limit, 20);
        assert_eq!(config.retry_backoff_ns, 500);
        assert_eq!(config.timeout_policy, TimeoutPolicy::Skip);
        assert_eq!(config.stall_threshold, 3);
    }

    #[test]
    fn validate_rejects_zero_budgets() {
        assert_eq!(
            PipelineConfig::new().with_spin_ceiling(0).validate(),
            Err(ConfigError::ZeroSpinCeiling)
        );
        assert_eq!(
            PipelineConfig::new().with_busy_retry_limit(0).validate(),
            Err(ConfigError::ZeroRetryLimit)
        );
        assert_eq!(PipelineConfig::new().validate(), Ok(()));
    }

    #[test]
    fn const_config_usable_in_static() {
        static CONFIG: PipelineConfig = PipelineConfig::new().with_spin_ceiling(1);
        assert_eq!(CONFIG.spin_ceiling, 1);
    }
}
