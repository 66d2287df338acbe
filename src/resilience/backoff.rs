//! Backoff
//!
//! Exponential backoff with jitter for transient device-token polling failures.

use std::time::Duration;

use crate::types::PollPolicy;

/// Exponential backoff schedule.
#[derive(Debug, Clone)]
pub struct Backoff {
    initial_delay: Duration,
    max_delay: Duration,
    multiplier: f64,
    jitter: f64,
}

impl Backoff {
    pub fn new(initial_delay: Duration, max_delay: Duration, multiplier: f64, jitter: f64) -> Self {
        Self {
            initial_delay,
            max_delay,
            multiplier,
            jitter: jitter.clamp(0.0, 1.0),
        }
    }

    /// Backoff used between failed polls.
    pub fn from_policy(policy: &PollPolicy) -> Self {
        Self::new(
            policy.initial_backoff,
            policy.max_backoff,
            policy.multiplier,
            policy.jitter,
        )
    }

    /// Delay before retry number `attempt` (0-based).
    pub fn delay(&self, attempt: u32) -> Duration {
        let base_delay = self.initial_delay.as_millis() as f64
            * self.multiplier.powi(attempt.min(i32::MAX as u32) as i32);

        let capped_delay = base_delay.min(self.max_delay.as_millis() as f64);

        let jitter_range = capped_delay * self.jitter;
        let jitter = if jitter_range > 0.0 {
            (rand::random::<f64>() - 0.5) * 2.0 * jitter_range
        } else {
            0.0
        };
        let final_delay = (capped_delay + jitter).max(0.0);

        Duration::from_millis(final_delay as u64)
    }
}

impl Default for Backoff {
    fn default() -> Self {
        Self::from_policy(&PollPolicy::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_delay_grows_and_caps() {
        let backoff = Backoff::new(Duration::from_millis(100), Duration::from_secs(1), 2.0, 0.0);
        assert_eq!(backoff.delay(0), Duration::from_millis(100));
        assert_eq!(backoff.delay(1), Duration::from_millis(200));
        assert_eq!(backoff.delay(3), Duration::from_millis(800));
        assert_eq!(backoff.delay(4), Duration::from_secs(1));
        assert_eq!(backoff.delay(40), Duration::from_secs(1));
    }

    #[test]
    fn test_jitter_stays_in_range() {
        let backoff = Backoff::new(Duration::from_millis(1000), Duration::from_secs(10), 2.0, 0.1);
        for _ in 0..50 {
            let delay = backoff.delay(0).as_millis();
            assert!((900..=1100).contains(&delay), "delay {delay} out of range");
        }
    }

    #[test]
    fn test_zero_initial_delay() {
        let backoff = Backoff::new(Duration::ZERO, Duration::ZERO, 2.0, 0.5);
        assert_eq!(backoff.delay(5), Duration::ZERO);
    }
}
