//! Multiplicative backoff for confirmation polling.

use std::time::Duration;

use crate::config::PollConfig;

/// Delay for the given retry (1-based), growing by `factor` and capped.
pub fn calculate_backoff(attempt: u32, base_ms: u64, factor: f64, max_ms: u64) -> Duration {
    if attempt == 0 {
        return Duration::from_millis(0);
    }

    let exponent = i32::try_from(attempt - 1).unwrap_or(i32::MAX);
    let delay_ms = (base_ms as f64) * factor.max(1.0).powi(exponent);
    let capped = if delay_ms.is_finite() {
        (delay_ms as u64).min(max_ms)
    } else {
        max_ms
    };
    Duration::from_millis(capped)
}

/// Iterator over the delays between poll attempts.
///
/// Yields `max_attempts - 1` values: there is no sleep after the last one.
#[derive(Debug, Clone)]
pub struct BackoffSchedule {
    base_ms: u64,
    factor: f64,
    max_ms: u64,
    remaining: u32,
    retry: u32,
}

impl BackoffSchedule {
    pub fn new(config: &PollConfig) -> Self {
        Self {
            base_ms: config.initial_delay_ms,
            factor: config.backoff_factor,
            max_ms: config.max_delay_ms,
            remaining: config.max_attempts.saturating_sub(1),
            retry: 0,
        }
    }
}

impl Iterator for BackoffSchedule {
    type Item = Duration;

    fn next(&mut self) -> Option<Duration> {
        if self.remaining == 0 {
            return None;
        }
        self.remaining -= 1;
        self.retry += 1;
        Some(calculate_backoff(self.retry, self.base_ms, self.factor, self.max_ms))
    }
}
