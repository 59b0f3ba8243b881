//! Exponential backoff with jitter for control-plane calls.
//!
//! Throttling responses back off on a longer curve than other transient
//! failures. Both are bounded by the same attempt limit.

use std::time::Duration;

use rand::Rng;
use tracing::debug;

/// Default total attempts (one call plus three retries).
pub const DEFAULT_MAX_ATTEMPTS: u32 = 4;
/// Default base delay for transient failures.
pub const DEFAULT_BASE_DELAY: Duration = Duration::from_millis(100);
/// Default ceiling for transient failures.
pub const DEFAULT_MAX_DELAY: Duration = Duration::from_secs(2);
/// Default base delay after a throttling response.
pub const DEFAULT_THROTTLE_BASE_DELAY: Duration = Duration::from_millis(500);
/// Default ceiling after a throttling response.
pub const DEFAULT_THROTTLE_MAX_DELAY: Duration = Duration::from_secs(20);

/// How a failed attempt should be treated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryClass {
    /// Transient failure; retry on the normal curve.
    Transient,
    /// The service asked us to slow down; retry on the throttle curve.
    Throttled,
    /// Retrying will not help.
    Permanent,
}

/// Errors that know whether they are worth retrying.
pub trait Retryable {
    /// Classify this failure.
    fn retry_class(&self) -> RetryClass;
}

/// Bounded exponential backoff with jitter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    max_attempts: u32,
    base_delay: Duration,
    max_delay: Duration,
    throttle_base_delay: Duration,
    throttle_max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            base_delay: DEFAULT_BASE_DELAY,
            max_delay: DEFAULT_MAX_DELAY,
            throttle_base_delay: DEFAULT_THROTTLE_BASE_DELAY,
            throttle_max_delay: DEFAULT_THROTTLE_MAX_DELAY,
        }
    }
}

impl RetryPolicy {
    /// Create a policy with default curves.
    pub fn new() -> Self {
        Self::default()
    }

    /// A policy that makes exactly one attempt.
    pub fn no_retry() -> Self {
        Self::default().with_max_attempts(1)
    }

    /// Set the total number of attempts (minimum 1).
    pub fn with_max_attempts(mut self, attempts: u32) -> Self {
        self.max_attempts = attempts.max(1);
        self
    }

    /// Set the base and ceiling for transient failures.
    pub fn with_delays(mut self, base: Duration, max: Duration) -> Self {
        self.base_delay = base;
        self.max_delay = max;
        self
    }

    /// Set the base and ceiling after throttling responses.
    pub fn with_throttle_delays(mut self, base: Duration, max: Duration) -> Self {
        self.throttle_base_delay = base;
        self.throttle_max_delay = max;
        self
    }

    /// Total attempts allowed.
    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Upper bound of the delay before retry number `retry` (0-based).
    pub fn delay_ceiling(&self, retry: u32, throttled: bool) -> Duration {
        let (base, max) = if throttled {
            (self.throttle_base_delay, self.throttle_max_delay)
        } else {
            (self.base_delay, self.max_delay)
        };
        let factor = 1u32.checked_shl(retry.min(16)).unwrap_or(u32::MAX);
        base.saturating_mul(factor).min(max)
    }

    /// Jittered delay before retry number `retry` (0-based).
    ///
    /// Uniform in `[ceiling / 2, ceiling]`.
    pub fn delay(&self, retry: u32, throttled: bool) -> Duration {
        let ceiling = self.delay_ceiling(retry, throttled).as_millis() as u64;
        if ceiling == 0 {
            return Duration::ZERO;
        }
        let millis = rand::rng().random_range(ceiling / 2..=ceiling);
        Duration::from_millis(millis)
    }

    /// Run `operation` until it succeeds, fails permanently, or attempts run
    /// out. Sleeps on the calling thread between attempts.
    pub fn run<T, E, F>(&self, operation: F) -> Result<T, E>
    where
        E: Retryable + std::fmt::Display,
        F: FnMut(u32) -> Result<T, E>,
    {
        self.run_with_sleep(operation, std::thread::sleep)
    }

    /// [`run`](Self::run) with an injectable sleep function.
    pub fn run_with_sleep<T, E, F, S>(&self, mut operation: F, mut sleep: S) -> Result<T, E>
    where
        E: Retryable + std::fmt::Display,
        F: FnMut(u32) -> Result<T, E>,
        S: FnMut(Duration),
    {
        let mut attempt = 0;
        loop {
            match operation(attempt) {
                Ok(value) => return Ok(value),
                Err(err) => {
                    let class = err.retry_class();
                    if class == RetryClass::Permanent || attempt + 1 >= self.max_attempts {
                        return Err(err);
                    }
                    let delay = self.delay(attempt, class == RetryClass::Throttled);
                    debug!(
                        attempt = attempt + 1,
                        max_attempts = self.max_attempts,
                        ?class,
                        delay_ms = delay.as_millis() as u64,
                        error = %err,
                        "Retrying after failure"
                    );
                    sleep(delay);
                    attempt += 1;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fmt;

    #[derive(Debug)]
    struct TestError(RetryClass);

    impl fmt::Display for TestError {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            write!(f, "{:?}", self.0)
        }
    }

    impl Retryable for TestError {
        fn retry_class(&self) -> RetryClass {
            self.0
        }
    }

    #[test]
    fn test_ceiling_grows_and_caps() {
        let policy = RetryPolicy::new();
        assert_eq!(policy.delay_ceiling(0, false), Duration::from_millis(100));
        assert_eq!(policy.delay_ceiling(1, false), Duration::from_millis(200));
        assert_eq!(policy.delay_ceiling(3, false), Duration::from_millis(800));
        assert_eq!(policy.delay_ceiling(10, false), DEFAULT_MAX_DELAY);
        assert_eq!(policy.delay_ceiling(40, false), DEFAULT_MAX_DELAY);
    }

    #[test]
    fn test_throttle_curve_is_longer() {
        let policy = RetryPolicy::new();
        for retry in 0..6 {
            assert!(policy.delay_ceiling(retry, true) > policy.delay_ceiling(retry, false));
        }
        assert_eq!(policy.delay_ceiling(10, true), DEFAULT_THROTTLE_MAX_DELAY);
    }

    #[test]
    fn test_delay_within_jitter_bounds() {
        let policy = RetryPolicy::new();
        for _ in 0..100 {
            let delay = policy.delay(2, false);
            assert!(delay >= Duration::from_millis(200));
            assert!(delay <= Duration::from_millis(400));
        }
    }

    #[test]
    fn test_zero_delay_policy() {
        let policy = RetryPolicy::new().with_delays(Duration::ZERO, Duration::ZERO);
        assert_eq!(policy.delay(3, false), Duration::ZERO);
    }

    #[test]
    fn test_run_succeeds_after_transient_failures() {
        let policy = RetryPolicy::new();
        let mut sleeps = Vec::new();
        let result: Result<u32, TestError> = policy.run_with_sleep(
            |attempt| {
                if attempt < 2 {
                    Err(TestError(RetryClass::Transient))
                } else {
                    Ok(attempt)
                }
            },
            |d| sleeps.push(d),
        );
        assert_eq!(result.unwrap(), 2);
        assert_eq!(sleeps.len(), 2);
    }

    #[test]
    fn test_run_stops_at_max_attempts() {
        let policy = RetryPolicy::new().with_max_attempts(3);
        let mut calls = 0;
        let result: Result<(), TestError> = policy.run_with_sleep(
            |_| {
                calls += 1;
                Err(TestError(RetryClass::Throttled))
            },
            |_| {},
        );
        assert!(result.is_err());
        assert_eq!(calls, 3);
    }

    #[test]
    fn test_run_does_not_retry_permanent() {
        let policy = RetryPolicy::new();
        let mut calls = 0;
        let result: Result<(), TestError> = policy.run_with_sleep(
            |_| {
                calls += 1;
                Err(TestError(RetryClass::Permanent))
            },
            |_| panic!("should not sleep"),
        );
        assert!(matches!(result, Err(TestError(RetryClass::Permanent))));
        assert_eq!(calls, 1);
    }

    #[test]
    fn test_throttled_sleeps_use_throttle_curve() {
        let policy = RetryPolicy::new().with_max_attempts(2);
        let mut sleeps = Vec::new();
        let _: Result<(), TestError> =
            policy.run_with_sleep(|_| Err(TestError(RetryClass::Throttled)), |d| sleeps.push(d));
        assert_eq!(sleeps.len(), 1);
        assert!(sleeps[0] >= DEFAULT_THROTTLE_BASE_DELAY / 2);
    }

    #[test]
    fn test_no_retry() {
        assert_eq!(RetryPolicy::no_retry().max_attempts(), 1);
        assert_eq!(RetryPolicy::new().with_max_attempts(0).max_attempts(), 1);
    }
}
