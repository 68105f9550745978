use std::collections::BTreeSet;
use std::thread;
use std::time::Duration;

use tracing::warn;

use crate::error::{EgtaError, Result};

/// How the session reacts to transient failures.
///
/// Transport failures (connection refused, reset, per-attempt timeout) are
/// always retried; HTTP failures only when their status is in `retry_on`.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Retries after the first attempt; a call makes at most `max_retries + 1` requests.
    pub max_retries: u32,
    /// Sleep before the first retry.
    pub delay: Duration,
    /// Multiplier applied to the sleep after every retry.
    pub backoff: f64,
    /// Status codes treated as transient.
    pub retry_on: BTreeSet<u16>,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 19,
            delay: Duration::from_secs(20),
            backoff: 1.2,
            retry_on: BTreeSet::from([504]),
        }
    }
}

impl RetryPolicy {
    /// A policy that surfaces the first failure.
    pub fn never() -> Self {
        Self {
            max_retries: 0,
            ..Self::default()
        }
    }

    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn with_backoff(mut self, backoff: f64) -> Self {
        self.backoff = backoff;
        self
    }

    pub fn with_retry_on(mut self, codes: impl IntoIterator<Item = u16>) -> Self {
        self.retry_on = codes.into_iter().collect();
        self
    }

    pub fn attempts(&self) -> u32 {
        self.max_retries.saturating_add(1)
    }

    pub fn is_retryable(&self, err: &EgtaError) -> bool {
        match err {
            EgtaError::Transport { .. } => true,
            other => other
                .status()
                .map(|status| self.retry_on.contains(&status.as_u16()))
                .unwrap_or(false),
        }
    }

    /// Sleep before retry number `retry` (0-based).
    pub fn delay_before(&self, retry: u32) -> Duration {
        let exponent = i32::try_from(retry).unwrap_or(i32::MAX);
        let factor = self.backoff.max(0.0).powi(exponent);
        Duration::try_from_secs_f64(self.delay.as_secs_f64() * factor).unwrap_or(Duration::MAX)
    }

    /// Runs `attempt` until it succeeds, fails with a non-retryable error, or
    /// the attempt budget is spent. The closure receives the 1-based attempt.
    pub fn run<T>(&self, label: &str, mut attempt: impl FnMut(u32) -> Result<T>) -> Result<T> {
        let budget = self.attempts();
        let mut tried = 0;
        loop {
            tried += 1;
            match attempt(tried) {
                Ok(value) => return Ok(value),
                Err(err) if !self.is_retryable(&err) => return Err(err),
                Err(err) if tried >= budget => {
                    return Err(EgtaError::RetriesExhausted {
                        attempts: tried,
                        last: Box::new(err),
                    })
                }
                Err(err) => {
                    let wait = self.delay_before(tried - 1);
                    warn!(
                        request = label,
                        attempt = tried,
                        error = %err,
                        wait_ms = wait.as_millis() as u64,
                        "transient failure, retrying"
                    );
                    thread::sleep(wait);
                }
            }
        }
    }
}
