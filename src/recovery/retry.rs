//! Retry with configurable exponential backoff

use crate::error::AppendOutcome;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, warn};

/// Retry policy configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RetryConfig {
    pub max_attempts: u32,
    #[serde(with = "millis")]
    pub initial_delay: Duration,
    #[serde(with = "millis")]
    pub max_delay: Duration,
    pub backoff_multiplier: f64,
    pub jitter: bool,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self::file_io()
    }
}

impl RetryConfig {
    /// Waiting for another program to release the workbook: a handful of
    /// attempts over a few seconds.
    pub fn file_io() -> Self {
        Self {
            max_attempts: 4,
            initial_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(5),
            backoff_multiplier: 2.0,
            jitter: true,
        }
    }

    /// A single attempt.
    pub fn once() -> Self {
        Self {
            max_attempts: 1,
            ..Self::file_io()
        }
    }
}

/// Decides whether an outcome is worth another attempt and how long to wait.
pub trait RetryPolicy {
    fn should_retry(&self, attempt: u32, outcome: &AppendOutcome) -> bool;
    fn delay(&self, attempt: u32) -> Duration;
}

/// Exponential backoff retry policy
#[derive(Debug, Clone, Default)]
pub struct ExponentialBackoff {
    config: RetryConfig,
}

impl ExponentialBackoff {
    pub fn new(config: RetryConfig) -> Self {
        Self { config }
    }
}

impl RetryPolicy for ExponentialBackoff {
    fn should_retry(&self, attempt: u32, outcome: &AppendOutcome) -> bool {
        attempt < self.config.max_attempts && outcome.is_retriable()
    }

    fn delay(&self, attempt: u32) -> Duration {
        let base_delay = self.config.initial_delay.as_millis() as f64;
        let exponent = attempt.saturating_sub(1).min(i32::MAX as u32) as i32;
        let exponential_delay = base_delay * self.config.backoff_multiplier.powi(exponent);

        let mut delay = if exponential_delay.is_finite() {
            Duration::from_millis(exponential_delay as u64)
        } else {
            self.config.max_delay
        };

        if delay > self.config.max_delay {
            delay = self.config.max_delay;
        }

        if self.config.jitter {
            // up to 25% extra
            let jitter = (delay.as_millis() as f64 * 0.25 * rand::random::<f64>()) as u64;
            delay += Duration::from_millis(jitter);
        }

        delay
    }
}

/// Runs `operation` until it succeeds, fails for good, or the policy gives up.
pub fn retry_with_policy<F>(
    mut operation: F,
    policy: &dyn RetryPolicy,
    operation_name: &str,
) -> AppendOutcome
where
    F: FnMut() -> AppendOutcome,
{
    let mut attempt = 0;

    loop {
        attempt += 1;
        let outcome = operation();

        if outcome.is_ok() {
            if attempt > 1 {
                debug!(
                    operation = operation_name,
                    attempt = attempt,
                    "operation succeeded after retry"
                );
            }
            return outcome;
        }

        if !policy.should_retry(attempt, &outcome) {
            return outcome;
        }

        let delay = policy.delay(attempt);
        warn!(
            operation = operation_name,
            attempt = attempt,
            delay_ms = delay.as_millis() as u64,
            outcome = outcome.label(),
            "retrying operation after delay"
        );
        std::thread::sleep(delay);
    }
}

mod millis {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(value.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_millis)
    }
}
