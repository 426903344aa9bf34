//! Lifecycle configuration.

use std::time::Duration;

/// Configuration for the lifecycle controller and provisioning orchestrator.
#[derive(Debug, Clone)]
pub struct LifecycleConfig {
    /// Provisioning attempts allowed before `retry-setup` is refused
    /// (default: 3).
    pub max_setup_attempts: u32,
    /// Deadline for the external permission check in milliseconds
    /// (default: 10_000).
    pub permission_timeout_ms: u64,
    /// Deadline for a single external provisioning call in milliseconds
    /// (default: 30_000).
    pub step_timeout_ms: u64,
    /// Extra attempts for a provisioning call that failed transiently
    /// (default: 2).
    pub transport_retries: u32,
    /// First backoff delay between transport retries in milliseconds
    /// (default: 500). Doubles on each retry.
    pub initial_backoff_ms: u64,
    /// Upper bound for the backoff delay in milliseconds (default: 8_000).
    pub max_backoff_ms: u64,
    /// Role assigned to the CEO identity in the access-control service.
    pub ceo_role: String,
}

impl Default for LifecycleConfig {
    fn default() -> Self {
        Self {
            max_setup_attempts: 3,
            permission_timeout_ms: 10_000,
            step_timeout_ms: 30_000,
            transport_retries: 2,
            initial_backoff_ms: 500,
            max_backoff_ms: 8_000,
            ceo_role: "fpo-ceo".into(),
        }
    }
}

impl LifecycleConfig {
    pub fn permission_timeout(&self) -> Duration {
        Duration::from_millis(self.permission_timeout_ms)
    }

    pub fn step_timeout(&self) -> Duration {
        Duration::from_millis(self.step_timeout_ms)
    }

    /// Backoff before retry number `retry` (1-based).
    pub fn backoff(&self, retry: u32) -> Duration {
        let factor = 2u64.saturating_pow(retry.saturating_sub(1));
        Duration::from_millis(
            self.initial_backoff_ms
                .saturating_mul(factor)
                .min(self.max_backoff_ms),
        )
    }
}
