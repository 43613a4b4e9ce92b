//! # Recovery policy for transient worker errors.
//!
//! [`RecoveryPolicy`] decides how long a worker waits on its
//! [`CancellationSignal`](crate::CancellationSignal) after a failed unit of
//! work before trying again. The default shape is a **fixed** backoff (the
//! service's `error_backoff`); growth and jitter are opt-in.
//!
//! The delay after `n` consecutive failures (0-indexed) is
//! `backoff × factor^n`, clamped to `max`, then jittered. The base is derived
//! from the failure count alone, so jitter never feeds back into later delays.
//!
//! # Example
//! ```rust
//! use std::time::Duration;
//! use servicevisor::{JitterPolicy, RecoveryPolicy};
//!
//! let fixed = RecoveryPolicy::fixed(Duration::from_secs(30));
//! assert_eq!(fixed.delay(0), Duration::from_secs(30));
//! assert_eq!(fixed.delay(7), Duration::from_secs(30));
//!
//! let growing = RecoveryPolicy::exponential(Duration::from_millis(100), Duration::from_secs(1), 2.0);
//! assert_eq!(growing.delay(1), Duration::from_millis(200));
//! assert_eq!(growing.delay(10), Duration::from_secs(1));
//! ```

use std::time::Duration;

use crate::policies::jitter::JitterPolicy;

/// How long to back off between failed units of work.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RecoveryPolicy {
    /// Delay after the first failure.
    pub backoff: Duration,
    /// Upper bound for any delay.
    pub max: Duration,
    /// Growth per consecutive failure (`1.0` = fixed).
    pub factor: f64,
    /// Randomization applied to the clamped delay.
    pub jitter: JitterPolicy,
}

impl RecoveryPolicy {
    /// Constant delay, no jitter.
    pub fn fixed(backoff: Duration) -> Self {
        Self {
            backoff,
            max: backoff,
            factor: 1.0,
            jitter: JitterPolicy::None,
        }
    }

    /// Exponential growth from `backoff` up to `max`.
    pub fn exponential(backoff: Duration, max: Duration, factor: f64) -> Self {
        Self {
            backoff,
            max,
            factor,
            jitter: JitterPolicy::None,
        }
    }

    /// Returns the same policy with `jitter` applied.
    pub fn with_jitter(mut self, jitter: JitterPolicy) -> Self {
        self.jitter = jitter;
        self
    }

    /// Delay to wait after `failures` consecutive failures (0-indexed).
    pub fn delay(&self, failures: u32) -> Duration {
        let exp = failures.min(i32::MAX as u32) as i32;
        let secs = self.backoff.as_secs_f64() * self.factor.powi(exp);

        // `as_secs_f64` rounds up near `Duration::MAX`.
        let base = if !secs.is_finite() || secs < 0.0 || secs >= self.max.as_secs_f64() {
            self.max
        } else {
            Duration::try_from_secs_f64(secs).unwrap_or(self.max)
        };
        self.jitter.apply(base)
    }
}

impl Default for RecoveryPolicy {
    /// Fixed 30s backoff.
    fn default() -> Self {
        Self::fixed(Duration::from_secs(30))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixed_is_constant() {
        let p = RecoveryPolicy::fixed(Duration::from_millis(50));
        for n in 0..20 {
            assert_eq!(p.delay(n), Duration::from_millis(50));
        }
    }

    #[test]
    fn test_exponential_growth_then_cap() {
        let p = RecoveryPolicy::exponential(Duration::from_millis(100), Duration::from_secs(1), 2.0);
        assert_eq!(p.delay(0), Duration::from_millis(100));
        assert_eq!(p.delay(2), Duration::from_millis(400));
        assert_eq!(p.delay(4), Duration::from_secs(1));
    }

    #[test]
    fn test_backoff_above_max_is_clamped() {
        let p = RecoveryPolicy::exponential(Duration::from_secs(10), Duration::from_secs(5), 2.0);
        assert_eq!(p.delay(0), Duration::from_secs(5));
    }

    #[test]
    fn test_overflow_clamps_to_max() {
        let p = RecoveryPolicy::exponential(Duration::from_millis(100), Duration::from_secs(3), 2.0);
        assert_eq!(p.delay(u32::MAX), Duration::from_secs(3));
    }

    #[test]
    fn test_huge_backoff_is_returned_unchanged() {
        let p = RecoveryPolicy::fixed(Duration::MAX);
        assert_eq!(p.delay(0), Duration::MAX);
        assert_eq!(p.delay(9), Duration::MAX);

        let secs = Duration::from_secs(u64::MAX);
        assert_eq!(RecoveryPolicy::fixed(secs).delay(0), secs);
        assert_eq!(
            RecoveryPolicy::exponential(Duration::from_secs(1), Duration::MAX, 2.0).delay(u32::MAX),
            Duration::MAX
        );
        assert!(RecoveryPolicy::fixed(Duration::MAX).with_jitter(JitterPolicy::Full).delay(0) <= Duration::MAX);
    }

    #[test]
    fn test_jitter_never_exceeds_base() {
        let p = RecoveryPolicy::fixed(Duration::from_millis(400)).with_jitter(JitterPolicy::Full);
        for n in 0..50 {
            assert!(p.delay(n) <= Duration::from_millis(400));
        }
    }
}
