//! Per-call retry budget with exponential backoff.
//!
//! This budget is separate from the research/judge iteration budget: it only
//! governs how many times a single role call is re-attempted after a transient
//! service failure.

use std::time::Duration;

use rand::Rng;

/// Backoff configuration for transient service failures.
#[derive(Debug, Clone)]
pub struct BackoffConfig {
    /// Delay before the first retry.
    pub base_delay: Duration,
    /// Maximum backoff cap.
    pub max_delay: Duration,
    /// Multiplier per consecutive failure (typically 2.0).
    pub multiplier: f64,
    /// Fraction of the delay added as random jitter (0.0 disables jitter).
    pub jitter: f64,
}

impl Default for BackoffConfig {
    fn default() -> Self {
        Self {
            base_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(10),
            multiplier: 2.0,
            jitter: 0.1,
        }
    }
}

impl BackoffConfig {
    /// Delay before retry number `attempt` (0-based), without jitter.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let delay_secs = self.base_delay.as_secs_f64() * self.multiplier.powi(attempt as i32);
        let capped = delay_secs.min(self.max_delay.as_secs_f64());
        Duration::from_secs_f64(capped.max(0.0))
    }

    /// Delay with jitter applied, still capped at `max_delay`.
    pub fn jittered_delay_for(&self, attempt: u32) -> Duration {
        let base = self.delay_for(attempt);
        if self.jitter <= 0.0 {
            return base;
        }
        let extra = base.as_secs_f64() * self.jitter * rand::thread_rng().gen_range(0.0..1.0);
        Duration::from_secs_f64((base.as_secs_f64() + extra).min(self.max_delay.as_secs_f64()))
    }
}

/// How many times a role call may be re-attempted, and how long to wait between.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Extra attempts after the first one.
    pub max_retries: u32,
    pub backoff: BackoffConfig,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 2,
            backoff: BackoffConfig::default(),
        }
    }
}

impl RetryPolicy {
    /// A policy that never retries.
    pub fn none() -> Self {
        Self {
            max_retries: 0,
            backoff: BackoffConfig::default(),
        }
    }

    /// Total attempts allowed for one call.
    pub fn max_attempts(&self) -> u32 {
        self.max_retries.saturating_add(1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn delay_grows_exponentially_and_caps() {
        let backoff = BackoffConfig {
            base_delay: Duration::from_millis(100),
            max_delay: Duration::from_millis(1000),
            multiplier: 2.0,
            jitter: 0.0,
        };
        assert_eq!(backoff.delay_for(0), Duration::from_millis(100));
        assert_eq!(backoff.delay_for(1), Duration::from_millis(200));
        assert_eq!(backoff.delay_for(2), Duration::from_millis(400));
        assert_eq!(backoff.delay_for(10), Duration::from_millis(1000));
    }

    #[test]
    fn jitter_never_exceeds_cap() {
        let backoff = BackoffConfig {
            base_delay: Duration::from_millis(900),
            max_delay: Duration::from_millis(1000),
            multiplier: 2.0,
            jitter: 0.5,
        };
        for attempt in 0..5 {
            assert!(backoff.jittered_delay_for(attempt) <= Duration::from_millis(1000));
        }
    }

    #[test]
    fn attempts_include_the_first_call() {
        assert_eq!(RetryPolicy::default().max_attempts(), 3);
        assert_eq!(RetryPolicy::none().max_attempts(), 1);
    }
}
