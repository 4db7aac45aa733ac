//! Retry bookkeeping for a single logical query.
//!
//! The executor feeds every retryable outcome into [`RetryState`] and gets
//! back either a delay to sleep before the next attempt or the failure to
//! surface. Transient faults and rate-limit waits have separate budgets.

use std::time::Duration;

use starscan_core::config::RetryConfig;

use crate::error::QueryFailure;

/// A retryable outcome of one attempt.
#[derive(Debug, Clone, PartialEq)]
pub enum Signal {
    /// The remote asked us to slow down; `wait` is its hint, if any.
    RateLimited { wait: Option<Duration> },
    /// Timeout, dropped connection or 5xx.
    Transient { reason: String },
}

/// What the executor should do next.
#[derive(Debug, Clone)]
pub enum Step {
    Retry { delay: Duration },
    GiveUp(QueryFailure),
}

#[derive(Debug, Clone)]
pub struct RetryState {
    config: RetryConfig,
    transient_failures: u32,
    rate_limit_waits: u32,
}

impl RetryState {
    pub fn new(config: RetryConfig) -> Self {
        Self {
            config,
            transient_failures: 0,
            rate_limit_waits: 0,
        }
    }

    /// Total attempts made so far that ended in a retryable signal.
    pub fn attempts(&self) -> u32 {
        self.transient_failures + self.rate_limit_waits
    }

    pub fn on_signal(&mut self, signal: Signal) -> Step {
        match signal {
            Signal::RateLimited { wait } => {
                self.rate_limit_waits += 1;
                if self.rate_limit_waits > self.config.max_rate_limit_waits {
                    return Step::GiveUp(QueryFailure::RateLimited {
                        waits: self.config.max_rate_limit_waits,
                    });
                }
                Step::Retry {
                    delay: wait.unwrap_or_else(|| self.config.rate_limit_fallback()),
                }
            }
            Signal::Transient { reason } => {
                self.transient_failures += 1;
                if self.transient_failures > self.config.max_retries {
                    return Step::GiveUp(QueryFailure::Unavailable {
                        attempts: self.transient_failures,
                        last_error: reason,
                    });
                }
                Step::Retry {
                    delay: self.backoff(self.transient_failures),
                }
            }
        }
    }

    /// `base * 2^(n-1)` for the n-th transient failure.
    fn backoff(&self, failure: u32) -> Duration {
        let exponent = failure.saturating_sub(1).min(16);
        self.config.base_delay().saturating_mul(1u32 << exponent)
    }
}
