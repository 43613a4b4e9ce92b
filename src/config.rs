//! # Service hosting settings.
//!
//! [`ServiceHostingSettings`] is supplied once when the host starts and is
//! read-only afterwards. It is used in three places:
//! 1. **Registration**: name/display name/description go to the platform adapter.
//! 2. **Lifecycle controller**: `shutdown_timeout`, `can_pause_continue`, queue sizes.
//! 3. **Worker loops**: `error_backoff` via [`ServiceHostingSettings::recovery_policy`].
//!
//! ## Sentinel values
//! - `display_name = ""` → falls back to `service_name`
//! - `bus_capacity` / `control_queue` below 1 are clamped to 1

use std::time::Duration;

use crate::error::HostError;
use crate::policies::RecoveryPolicy;

/// Immutable configuration for one hosted service.
///
/// ## Field semantics
/// - `service_name`: identifier registered with the service manager (required)
/// - `display_name`: human-readable name shown by the service manager
/// - `description`: free-form description
/// - `shutdown_timeout`: max wait for the worker after a stop request (`> 0`)
/// - `error_backoff`: wait after a transient worker error before retrying
/// - `can_pause_continue`: whether Pause/Continue requests are accepted
/// - `bus_capacity`: event bus ring buffer size
/// - `control_queue`: capacity of the control request queue
#[derive(Clone, Debug)]
pub struct ServiceHostingSettings {
    /// Name registered with the service manager.
    pub service_name: String,
    /// Human-readable name.
    pub display_name: String,
    /// Service description.
    pub description: String,
    /// Maximum time to wait for the worker to exit after a stop request.
    ///
    /// When exceeded the worker thread is detached and the stop is reported as forced.
    pub shutdown_timeout: Duration,
    /// Backoff between a failed unit of work and the next attempt.
    pub error_backoff: Duration,
    /// Accept Pause/Continue requests.
    pub can_pause_continue: bool,
    /// Capacity of the event bus broadcast channel.
    pub bus_capacity: usize,
    /// Capacity of the control request queue.
    pub control_queue: usize,
}

impl ServiceHostingSettings {
    /// Settings for `service_name` with every other field at its default.
    pub fn new(service_name: impl Into<String>) -> Self {
        Self {
            service_name: service_name.into(),
            ..Self::default()
        }
    }

    /// Sets the display name.
    pub fn with_display_name(mut self, name: impl Into<String>) -> Self {
        self.display_name = name.into();
        self
    }

    /// Sets the description.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Sets the shutdown timeout.
    pub fn with_shutdown_timeout(mut self, timeout: Duration) -> Self {
        self.shutdown_timeout = timeout;
        self
    }

    /// Sets the error backoff.
    pub fn with_error_backoff(mut self, backoff: Duration) -> Self {
        self.error_backoff = backoff;
        self
    }

    /// Enables or disables Pause/Continue.
    pub fn with_pause_continue(mut self, enabled: bool) -> Self {
        self.can_pause_continue = enabled;
        self
    }

    /// Checks the invariants a host run relies on.
    ///
    /// - `service_name` must not be empty or whitespace
    /// - `shutdown_timeout` must be greater than zero
    pub fn validate(&self) -> Result<(), HostError> {
        if self.service_name.trim().is_empty() {
            return Err(HostError::InvalidSettings {
                reason: "service_name must not be empty".into(),
            });
        }
        if self.shutdown_timeout.is_zero() {
            return Err(HostError::InvalidSettings {
                reason: "shutdown_timeout must be greater than zero".into(),
            });
        }
        Ok(())
    }

    /// Display name, falling back to the service name.
    #[inline]
    pub fn effective_display_name(&self) -> &str {
        if self.display_name.is_empty() {
            &self.service_name
        } else {
            &self.display_name
        }
    }

    /// Fixed recovery policy built from `error_backoff`.
    #[inline]
    pub fn recovery_policy(&self) -> RecoveryPolicy {
        RecoveryPolicy::fixed(self.error_backoff)
    }

    /// Bus capacity clamped to a minimum of 1.
    #[inline]
    pub fn bus_capacity_clamped(&self) -> usize {
        self.bus_capacity.max(1)
    }

    /// Control queue capacity clamped to a minimum of 1.
    #[inline]
    pub fn control_queue_clamped(&self) -> usize {
        self.control_queue.max(1)
    }
}

impl Default for ServiceHostingSettings {
    /// Default settings:
    ///
    /// - `service_name = ""` (must be set before running)
    /// - `shutdown_timeout = 30s`
    /// - `error_backoff = 30s`
    /// - `can_pause_continue = false`
    /// - `bus_capacity = 1024`
    /// - `control_queue = 64`
    fn default() -> Self {
        Self {
            service_name: String::new(),
            display_name: String::new(),
            description: String::new(),
            shutdown_timeout: Duration::from_secs(30),
            error_backoff: Duration::from_secs(30),
            can_pause_continue: false,
            bus_capacity: 1024,
            control_queue: 64,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let s = ServiceHostingSettings::new("mini");
        assert_eq!(s.shutdown_timeout, Duration::from_secs(30));
        assert_eq!(s.error_backoff, Duration::from_secs(30));
        assert!(!s.can_pause_continue);
        assert_eq!(s.effective_display_name(), "mini");
        assert!(s.validate().is_ok());
    }

    #[test]
    fn test_empty_name_rejected() {
        let err = ServiceHostingSettings::new("  ").validate().unwrap_err();
        assert_eq!(err.as_label(), "host_invalid_settings");
    }

    #[test]
    fn test_zero_shutdown_timeout_rejected() {
        let s = ServiceHostingSettings::new("mini").with_shutdown_timeout(Duration::ZERO);
        assert!(s.validate().is_err());
    }

    #[test]
    fn test_recovery_policy_uses_error_backoff() {
        let s = ServiceHostingSettings::new("mini").with_error_backoff(Duration::from_millis(50));
        assert_eq!(s.recovery_policy().delay(3), Duration::from_millis(50));
    }

    #[test]
    fn test_capacities_clamped() {
        let mut s = ServiceHostingSettings::new("mini");
        s.bus_capacity = 0;
        s.control_queue = 0;
        assert_eq!(s.bus_capacity_clamped(), 1);
        assert_eq!(s.control_queue_clamped(), 1);
    }
}
