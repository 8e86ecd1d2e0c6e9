//! Shared types for the sui-interface-fetcher workspace.
//!
//! This crate sits at the bottom of the dependency graph so the transport
//! and the fetcher can agree on [`Network`], [`FetchedModule`] and
//! [`RetryConfig`] without depending on each other.

pub mod env_utils;
pub mod fetched;
pub mod network;

pub use env_utils::{env_bool_or, env_string, env_string_or, env_var, env_var_or};
pub use fetched::{FetchedModule, SourceStatus};
pub use network::{Network, UnknownNetwork};

use std::time::Duration;

/// Configuration for retry behavior on network operations.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct RetryConfig {
    /// Total attempts per call, including the first one.
    pub max_attempts: u32,
    /// Delay before the first retry; doubles on every further retry.
    pub base_delay: Duration,
    /// Upper bound on any single delay.
    pub max_delay: Duration,
    /// Whether `PackageNotFound`/`ModuleNotFound` are retried like transient errors.
    pub retry_not_found: bool,
}

impl RetryConfig {
    /// Create a new RetryConfig with the specified parameters.
    pub fn new(max_attempts: u32, base_delay_ms: u64, max_delay_ms: u64) -> Self {
        Self {
            max_attempts,
            base_delay: Duration::from_millis(base_delay_ms),
            max_delay: Duration::from_millis(max_delay_ms),
            retry_not_found: true,
        }
    }

    /// Backoff before the retry that follows failed attempt `attempt` (1-based).
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let exp = attempt.saturating_sub(1).min(31);
        self.base_delay
            .saturating_mul(1u32 << exp)
            .min(self.max_delay)
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self::new(3, 250, 5000)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_delay_doubles_until_cap() {
        let cfg = RetryConfig::new(6, 100, 1000);
        assert_eq!(cfg.delay_for(1), Duration::from_millis(100));
        assert_eq!(cfg.delay_for(2), Duration::from_millis(200));
        assert_eq!(cfg.delay_for(3), Duration::from_millis(400));
        assert_eq!(cfg.delay_for(4), Duration::from_millis(800));
        assert_eq!(cfg.delay_for(5), Duration::from_millis(1000));
        assert_eq!(cfg.delay_for(40), Duration::from_millis(1000));
    }

    #[test]
    fn test_default_retries_not_found() {
        let cfg = RetryConfig::default();
        assert_eq!(cfg.max_attempts, 3);
        assert!(cfg.retry_not_found);
    }
}
