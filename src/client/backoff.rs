//! Retry backoff schedule.

use rand::Rng;
use std::time::Duration;

/// Exponential backoff with additive jitter.
///
/// The delay before retry `attempt + 1` is `base * 2^(attempt-1)` plus a
/// uniform random jitter in `[0, jitter_max]`, which de-synchronizes retry
/// storms across callers.
#[derive(Debug, Clone)]
pub struct BackoffPolicy {
    pub base_delay: Duration,
    pub jitter_max: Duration,
}

impl Default for BackoffPolicy {
    fn default() -> Self {
        Self {
            base_delay: Duration::from_millis(1000),
            jitter_max: Duration::from_millis(1000),
        }
    }
}

impl BackoffPolicy {
    pub fn new(base_delay: Duration, jitter_max: Duration) -> Self {
        Self {
            base_delay,
            jitter_max,
        }
    }

    /// Deterministic part of the delay after `attempt` (1-based) failed.
    pub fn base_for(&self, attempt: u32) -> Duration {
        let shift = attempt.saturating_sub(1).min(32);
        let factor = 1u64 << shift;
        Duration::from_millis((self.base_delay.as_millis() as u64).saturating_mul(factor))
    }

    /// Full delay including jitter.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let jitter_ms = self.jitter_max.as_millis() as u64;
        let jitter = if jitter_ms == 0 {
            0
        } else {
            rand::thread_rng().gen_range(0..=jitter_ms)
        };
        self.base_for(attempt) + Duration::from_millis(jitter)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base_delay_doubles_per_attempt() {
        let policy = BackoffPolicy::default();
        assert_eq!(policy.base_for(1), Duration::from_millis(1000));
        assert_eq!(policy.base_for(2), Duration::from_millis(2000));
        assert_eq!(policy.base_for(3), Duration::from_millis(4000));
        assert_eq!(policy.base_for(4), Duration::from_millis(8000));
    }

    #[test]
    fn test_base_delay_strictly_increases() {
        let policy = BackoffPolicy::default();
        for attempt in 1..10 {
            assert!(policy.base_for(attempt + 1) > policy.base_for(attempt));
        }
    }

    #[test]
    fn test_jitter_bounded() {
        let policy = BackoffPolicy::new(Duration::from_millis(100), Duration::from_millis(50));
        for _ in 0..100 {
            let d = policy.delay_for(1);
            assert!(d >= Duration::from_millis(100));
            assert!(d <= Duration::from_millis(150));
        }
    }

    #[test]
    fn test_zero_jitter_is_deterministic() {
        let policy = BackoffPolicy::new(Duration::from_millis(10), Duration::ZERO);
        assert_eq!(policy.delay_for(2), Duration::from_millis(20));
    }
}
