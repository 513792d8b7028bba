//! Retry policies: geometric backoff with jitter for transient node
//! failures (timeouts, reported failures, exceptions).
//!
//! `delay(attempt) = min(initial * factor^attempt, max_interval)`, then
//! optionally scaled by a `0.5..=1.5` jitter factor to avoid every retried
//! node in a layer waking up at the same instant.

use std::time::Duration;
use rand::Rng;

/// Configuration for retrying a failed node execution.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Maximum number of attempts, including the first.
    pub max_attempts: usize,
    /// Initial interval between retries, in seconds.
    pub initial_interval: f64,
    /// Multiplier applied to the interval after each retry.
    pub backoff_factor: f64,
    /// Ceiling on the interval between retries, in seconds.
    pub max_interval: f64,
    /// Whether to randomize the computed interval.
    pub jitter: bool,
}

impl RetryPolicy {
    pub fn new(max_attempts: usize) -> Self {
        Self {
            max_attempts,
            initial_interval: 0.1,
            backoff_factor: 2.0,
            max_interval: 5.0,
            jitter: true,
        }
    }

    pub fn with_initial_interval(mut self, seconds: f64) -> Self {
        self.initial_interval = seconds;
        self
    }

    pub fn with_backoff_factor(mut self, factor: f64) -> Self {
        self.backoff_factor = factor;
        self
    }

    pub fn with_max_interval(mut self, seconds: f64) -> Self {
        self.max_interval = seconds;
        self
    }

    pub fn with_jitter(mut self, jitter: bool) -> Self {
        self.jitter = jitter;
        self
    }

    /// Delay before retry attempt `attempt` (0-indexed, the attempt that
    /// just failed).
    pub fn calculate_delay(&self, attempt: usize) -> Duration {
        if attempt >= self.max_attempts {
            return Duration::from_secs(0);
        }
        let base_delay = self.initial_interval * self.backoff_factor.powi(attempt as i32);
        let capped_delay = base_delay.min(self.max_interval);
        let final_delay = if self.jitter {
            let mut rng = rand::thread_rng();
            capped_delay * rng.gen_range(0.5..=1.5)
        } else {
            capped_delay
        };
        Duration::from_secs_f64(final_delay)
    }

    pub fn should_retry(&self, attempt: usize) -> bool {
        attempt < self.max_attempts
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(3)
    }
}

/// Tracks attempts and the most recent failure for one node's retry loop.
#[derive(Debug, Clone, Default)]
pub struct RetryState {
    pub attempts: usize,
    pub last_error: Option<String>,
}

impl RetryState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_attempt(&mut self, error: Option<String>) {
        self.attempts += 1;
        self.last_error = error;
    }

    pub fn reset(&mut self) {
        self.attempts = 0;
        self.last_error = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_policy_matches_documented_defaults() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.max_attempts, 3);
        assert_eq!(policy.initial_interval, 0.1);
        assert_eq!(policy.max_interval, 5.0);
        assert!(policy.jitter);
    }

    #[test]
    fn exponential_backoff_without_jitter() {
        let policy = RetryPolicy::new(5)
            .with_initial_interval(1.0)
            .with_backoff_factor(2.0)
            .with_max_interval(100.0)
            .with_jitter(false);
        assert_eq!(policy.calculate_delay(0).as_secs_f64(), 1.0);
        assert_eq!(policy.calculate_delay(1).as_secs_f64(), 2.0);
        assert_eq!(policy.calculate_delay(3).as_secs_f64(), 8.0);
    }

    #[test]
    fn delay_is_capped_at_max_interval() {
        let policy = RetryPolicy::new(10)
            .with_initial_interval(10.0)
            .with_backoff_factor(2.0)
            .with_max_interval(50.0)
            .with_jitter(false);
        assert_eq!(policy.calculate_delay(5).as_secs_f64(), 50.0);
    }

    #[test]
    fn jitter_stays_within_half_to_one_and_half_times_base() {
        let policy = RetryPolicy::new(5).with_initial_interval(1.0).with_backoff_factor(2.0);
        let base_delay = 4.0;
        for _ in 0..20 {
            let d = policy.calculate_delay(2).as_secs_f64();
            assert!(d >= base_delay * 0.5 && d <= base_delay * 1.5);
        }
    }

    #[test]
    fn should_retry_respects_max_attempts() {
        let policy = RetryPolicy::new(3);
        assert!(policy.should_retry(2));
        assert!(!policy.should_retry(3));
    }

    #[test]
    fn retry_state_tracks_attempts_and_resets() {
        let mut state = RetryState::new();
        state.record_attempt(Some("boom".to_string()));
        assert_eq!(state.attempts, 1);
        state.reset();
        assert_eq!(state.attempts, 0);
        assert!(state.last_error.is_none());
    }
}
