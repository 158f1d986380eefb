//! Bounded retry with exponential backoff.
//!
//! Attempt 0 runs immediately. Attempt `n >= 1` waits
//! `initial_delay * multiplier^(n-1)` first, so the defaults give 2 s, 4 s, 8 s.
//! Only [`HttpError::is_transient`] errors are retried; anything else is
//! returned as-is on the spot.

use std::time::Duration;

use songsync_core::RetryConfig;

use crate::error::HttpError;

/// Retry budget for a single logical request.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub initial_delay: Duration,
    pub multiplier: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from(&RetryConfig::default())
    }
}

impl From<&RetryConfig> for RetryPolicy {
    fn from(cfg: &RetryConfig) -> Self {
        Self {
            max_retries: cfg.max_retries,
            initial_delay: cfg.initial_delay(),
            multiplier: cfg.multiplier,
        }
    }
}

impl RetryPolicy {
    /// A policy that never waits between attempts.
    pub fn immediate(max_retries: u32) -> Self {
        Self {
            max_retries,
            initial_delay: Duration::ZERO,
            multiplier: 1.0,
        }
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_retries.saturating_add(1)
    }

    /// Delay to wait before `attempt` (0-based).
    pub fn delay_before(&self, attempt: u32) -> Duration {
        if attempt == 0 {
            return Duration::ZERO;
        }
        let exponent = i32::try_from(attempt - 1).unwrap_or(i32::MAX);
        let secs = self.initial_delay.as_secs_f64() * self.multiplier.powi(exponent);
        Duration::try_from_secs_f64(secs).unwrap_or(Duration::MAX)
    }

    /// Run `op` until it succeeds, fails permanently, or the budget runs out.
    ///
    /// `op` receives the 0-based attempt number.
    pub fn run<T, F>(&self, label: &str, op: F) -> Result<T, HttpError>
    where
        F: FnMut(u32) -> Result<T, HttpError>,
    {
        self.run_with_sleep(label, op, std::thread::sleep)
    }

    /// [`RetryPolicy::run`] with an injectable sleep.
    pub fn run_with_sleep<T, F, S>(&self, label: &str, mut op: F, mut sleep: S) -> Result<T, HttpError>
    where
        F: FnMut(u32) -> Result<T, HttpError>,
        S: FnMut(Duration),
    {
        let attempts = self.max_attempts();
        let mut last = None;

        for attempt in 0..attempts {
            let delay = self.delay_before(attempt);
            if !delay.is_zero() {
                tracing::debug!("{label}: waiting {:.1}s before retry", delay.as_secs_f64());
                sleep(delay);
            }

            match op(attempt) {
                Ok(value) => return Ok(value),
                Err(err) if err.is_transient() => {
                    tracing::warn!(
                        "{label}: attempt {}/{attempts} failed: {err}",
                        attempt + 1
                    );
                    last = Some(err);
                }
                Err(err) => return Err(err),
            }
        }

        let last = last.unwrap_or_else(|| HttpError::Transport {
            url: label.to_string(),
            message: "no attempts were made".to_string(),
        });
        tracing::warn!("{label}: giving up after {attempts} attempts");
        Err(HttpError::Exhausted {
            label: label.to_string(),
            attempts,
            last: Box::new(last),
        })
    }
}
