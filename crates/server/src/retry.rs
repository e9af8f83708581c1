use std::time::Duration;

use tokio::time::sleep;
use tracing::{info, warn};

use crate::config::RetryConfig;

/// Bounded retry with exponential backoff, wrapped around the model call.
///
/// Lives at the boundary so the normalizer stays a pure function. With
/// `max_retries = 0` (the default) every request gets exactly one attempt.
pub struct RetryPolicy {
    max_retries: usize,
    initial_backoff: Duration,
    max_backoff: Duration,
}

impl RetryPolicy {
    pub fn from_config(config: &RetryConfig) -> Self {
        Self {
            max_retries: config.max_retries,
            initial_backoff: Duration::from_millis(config.initial_backoff_ms),
            max_backoff: Duration::from_millis(config.max_backoff_ms),
        }
    }

    pub async fn run<F, Fut, T, E>(&self, operation: &str, mut f: F) -> Result<T, E>
    where
        F: FnMut() -> Fut,
        Fut: std::future::Future<Output = Result<T, E>>,
        E: std::fmt::Display,
    {
        let mut backoff = self.initial_backoff;

        for attempt in 0..=self.max_retries {
            match f().await {
                Ok(value) => {
                    if attempt > 0 {
                        info!(operation, attempts = attempt + 1, "succeeded after retry");
                    }
                    return Ok(value);
                }
                Err(err) if attempt < self.max_retries => {
                    warn!(
                        operation,
                        attempt = attempt + 1,
                        max_retries = self.max_retries,
                        backoff_ms = backoff.as_millis() as u64,
                        error = %err,
                        "attempt failed, backing off"
                    );
                    sleep(backoff).await;
                    backoff = (backoff * 2).min(self.max_backoff);
                }
                Err(err) => {
                    if self.max_retries > 0 {
                        warn!(operation, attempts = attempt + 1, error = %err, "gave up");
                    }
                    return Err(err);
                }
            }
        }
        unreachable!("loop always returns")
    }
}
