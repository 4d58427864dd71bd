//! Exponential backoff for transient lookup failures.

use std::time::Duration;

use chemsor_schema::EnrichmentSettings;
use tracing::debug;

use crate::error::Result;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first.
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from_settings(&EnrichmentSettings::default())
    }
}

impl RetryPolicy {
    pub fn from_settings(settings: &EnrichmentSettings) -> Self {
        Self {
            max_attempts: settings.max_attempts.max(1),
            base_delay: settings.base_delay(),
            max_delay: settings.max_delay(),
        }
    }

    /// No waiting between attempts.
    pub fn immediate(max_attempts: u32) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            base_delay: Duration::ZERO,
            max_delay: Duration::ZERO,
        }
    }

    /// Delay after the given failed attempt (1-based): base doubled per attempt, capped.
    pub fn delay_after(&self, attempt: u32) -> Duration {
        let factor = 2u32.saturating_pow(attempt.saturating_sub(1));
        self.base_delay
            .checked_mul(factor)
            .unwrap_or(self.max_delay)
            .min(self.max_delay)
    }

    /// Runs `operation` until it succeeds, fails permanently, or attempts run out.
    pub fn run<T>(
        &self,
        service: &'static str,
        mut operation: impl FnMut() -> Result<T>,
    ) -> Result<T> {
        let mut attempt = 1;
        loop {
            match operation() {
                Ok(value) => return Ok(value),
                Err(err) if err.is_retryable() && attempt < self.max_attempts => {
                    let delay = self.delay_after(attempt);
                    debug!(
                        service,
                        attempt,
                        delay_ms = delay.as_millis(),
                        error = %err,
                        "retrying lookup"
                    );
                    std::thread::sleep(delay);
                    attempt += 1;
                }
                Err(err) => return Err(err),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::LookupError;
    use std::cell::Cell;

    #[test]
    fn delays_double_and_cap() {
        let policy = RetryPolicy {
            max_attempts: 5,
            base_delay: Duration::from_millis(500),
            max_delay: Duration::from_millis(1_500),
        };
        assert_eq!(policy.delay_after(1), Duration::from_millis(500));
        assert_eq!(policy.delay_after(2), Duration::from_millis(1_000));
        assert_eq!(policy.delay_after(3), Duration::from_millis(1_500));
        assert_eq!(policy.delay_after(40), Duration::from_millis(1_500));
    }

    #[test]
    fn transient_errors_retried_until_success() {
        let calls = Cell::new(0);
        let result = RetryPolicy::immediate(3).run("test", || {
            calls.set(calls.get() + 1);
            if calls.get() < 3 {
                Err(LookupError::Timeout { service: "test" })
            } else {
                Ok(7)
            }
        });
        assert_eq!(result.unwrap(), 7);
        assert_eq!(calls.get(), 3);
    }

    #[test]
    fn permanent_errors_not_retried() {
        let calls = Cell::new(0);
        let result: Result<()> = RetryPolicy::immediate(5).run("test", || {
            calls.set(calls.get() + 1);
            Err(LookupError::Status {
                service: "test",
                status: 400,
            })
        });
        assert!(result.is_err());
        assert_eq!(calls.get(), 1);
    }

    #[test]
    fn attempts_bounded() {
        let calls = Cell::new(0);
        let result: Result<()> = RetryPolicy::immediate(2).run("test", || {
            calls.set(calls.get() + 1);
            Err(LookupError::Timeout { service: "test" })
        });
        assert!(matches!(result, Err(LookupError::Timeout { .. })));
        assert_eq!(calls.get(), 2);
    }
}
