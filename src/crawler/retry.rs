//! Fixed-delay retry policy shared by every fetch call site
//!
//! Any non-200 response or transport error counts as a failed attempt. The
//! policy sleeps a constant delay between attempts and gives up after the
//! configured number of attempts, reporting the last failure.

use crate::HarvestError;
use reqwest::StatusCode;
use std::future::Future;
use std::time::Duration;
use thiserror::Error;

/// Why a single attempt failed
#[derive(Debug, Error)]
pub enum AttemptError {
    #[error("unexpected status {0}")]
    Status(StatusCode),

    #[error("{0}")]
    Request(#[from] reqwest::Error),
}

/// Attempts + delay, parameterized per call site
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub attempts: u32,
    pub delay: Duration,
}

impl RetryPolicy {
    pub fn new(attempts: u32, delay: Duration) -> Self {
        Self { attempts, delay }
    }

    /// Runs `operation` until it succeeds or the attempts are used up
    ///
    /// `operation` receives the 1-based attempt number. `target` names the
    /// request in logs and in the resulting [`HarvestError::Transport`].
    pub async fn run<T, F, Fut>(&self, target: &str, mut operation: F) -> Result<T, HarvestError>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<T, AttemptError>>,
    {
        let attempts = self.attempts.max(1);
        let mut last_error = String::new();

        for attempt in 1..=attempts {
            match operation(attempt).await {
                Ok(value) => return Ok(value),
                Err(e) => {
                    tracing::warn!("Attempt {}/{} for {} failed: {}", attempt, attempts, target, e);
                    last_error = e.to_string();
                }
            }

            if attempt < attempts {
                tracing::debug!(
                    "Retrying {} in {}ms (attempt {}/{})",
                    target,
                    self.delay.as_millis(),
                    attempt + 1,
                    attempts
                );
                tokio::time::sleep(self.delay).await;
            }
        }

        tracing::error!("All {} attempts failed for {}", attempts, target);
        Err(HarvestError::Transport {
            target: target.to_string(),
            attempts,
            reason: last_error,
        })
    }
}
