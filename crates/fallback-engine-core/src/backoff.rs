//! Full-jitter exponential backoff for the rate-limit retry loop (§4.1).
//!
//! Grounded on the teacher's `ExponentialRandomBackoff` (randomize an
//! exponential curve to avoid thundering herds), adapted to the "full
//! jitter" policy the spec calls for: sample uniformly in `[0, capped]`
//! rather than jittering a percentage around the midpoint.

use rand::Rng;
use std::time::Duration;

/// Pure backoff calculator: no state, no side effects beyond the RNG.
#[derive(Debug, Clone, Copy)]
pub struct BackoffPolicy {
    pub base: Duration,
    pub cap: Duration,
}

impl BackoffPolicy {
    pub fn new(base: Duration, cap: Duration) -> Self {
        Self { base, cap }
    }

    /// Delay before retrying `attempt` (0-indexed). Always in `[0, cap]`.
    ///
    /// `jitter = true` (the normal case) samples uniformly over `[0, capped]`.
    /// `jitter = false` returns the capped value itself, useful for
    /// deterministic tests.
    pub fn delay(&self, attempt: u32, jitter: bool) -> Duration {
        let uncapped = self.base.saturating_mul(1u32 << attempt.min(31));
        let capped = uncapped.min(self.cap);

        if !jitter {
            return capped;
        }

        if capped.is_zero() {
            return capped;
        }

        let mut rng = rand::rng();
        let capped_nanos = capped.as_nanos().min(u64::MAX as u128) as u64;
        Duration::from_nanos(rng.random_range(0..=capped_nanos))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::{prop_assert, prop_assert_eq};

    #[test]
    fn without_jitter_equals_capped_exponential() {
        let policy = BackoffPolicy::new(Duration::from_millis(500), Duration::from_secs(30));
        assert_eq!(policy.delay(0, false), Duration::from_millis(500));
        assert_eq!(policy.delay(1, false), Duration::from_millis(1000));
        assert_eq!(policy.delay(2, false), Duration::from_millis(2000));
        // 500ms * 2^6 = 32s, capped to 30s
        assert_eq!(policy.delay(6, false), Duration::from_secs(30));
    }

    #[test]
    fn jittered_delay_stays_in_bounds() {
        let policy = BackoffPolicy::new(Duration::from_millis(500), Duration::from_secs(30));
        for attempt in 0..10 {
            for _ in 0..50 {
                let d = policy.delay(attempt, true);
                assert!(d <= policy.cap);
            }
        }
    }

    #[test]
    fn zero_base_is_always_zero() {
        let policy = BackoffPolicy::new(Duration::ZERO, Duration::from_secs(30));
        assert_eq!(policy.delay(0, true), Duration::ZERO);
        assert_eq!(policy.delay(5, false), Duration::ZERO);
    }

    proptest::proptest! {
        #[test]
        fn delay_always_within_cap(base_ms in 0u64..5000, cap_ms in 0u64..60000, attempt in 0u32..20) {
            let policy = BackoffPolicy::new(Duration::from_millis(base_ms), Duration::from_millis(cap_ms));
            let d = policy.delay(attempt, true);
            prop_assert!(d <= policy.cap);
            let d_no_jitter = policy.delay(attempt, false);
            prop_assert_eq!(d_no_jitter, policy.cap.min(policy.base.saturating_mul(1u32 << attempt.min(31))));
        }
    }
}
