//! Exponential backoff for transient feed failures.

use std::future::Future;
use std::time::Duration;

use super::source::FeedError;

/// Retries attempted after the first request by default.
pub const DEFAULT_MAX_RETRIES: u32 = 3;

/// Delay before the first retry by default.
pub const DEFAULT_INITIAL_DELAY: Duration = Duration::from_millis(300);

/// How often and how patiently to retry a failed fetch.
///
/// The delay doubles after each retry: with the defaults the waits are
/// 300 ms, 600 ms and 1.2 s.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Retries attempted after the first request.
    pub max_retries: u32,
    /// Delay before the first retry.
    pub initial_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: DEFAULT_MAX_RETRIES,
            initial_delay: DEFAULT_INITIAL_DELAY,
        }
    }
}

impl RetryPolicy {
    /// A policy that never retries.
    #[must_use]
    pub const fn none() -> Self {
        Self {
            max_retries: 0,
            initial_delay: Duration::ZERO,
        }
    }

    /// Delay before retry number `retry` (1-based).
    #[must_use]
    pub fn delay_for(&self, retry: u32) -> Duration {
        let factor = 1u32
            .checked_shl(retry.saturating_sub(1))
            .unwrap_or(u32::MAX);
        self.initial_delay.saturating_mul(factor)
    }

    /// Run `attempt` until it succeeds, fails permanently or the retries
    /// are spent. The last error is returned on exhaustion.
    ///
    /// # Errors
    ///
    /// Returns the error from the final attempt.
    pub async fn run<T, F, Fut>(&self, mut attempt: F) -> Result<T, FeedError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, FeedError>>,
    {
        let mut retry = 0;
        loop {
            match attempt().await {
                Ok(value) => return Ok(value),
                Err(err) if retry < self.max_retries && is_transient(&err) => {
                    retry += 1;
                    let delay = self.delay_for(retry);
                    log::warn!(
                        "feed request failed ({err}); retry {retry}/{} in {delay:?}",
                        self.max_retries
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(err) => return Err(err),
            }
        }
    }
}

/// Whether `error` is worth retrying.
///
/// Timeouts, network failures, rate limiting, server errors and
/// undecodable bodies are transient; other HTTP statuses are not.
#[must_use]
pub fn is_transient(error: &FeedError) -> bool {
    match error {
        FeedError::Timeout { .. } | FeedError::NetworkError { .. } | FeedError::ParseError { .. } => {
            true
        }
        FeedError::HttpError { status, .. } => *status == 429 || (500..600).contains(status),
    }
}
