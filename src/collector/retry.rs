use crate::errors::ExchangeError;
use std::future::Future;
use std::time::Duration;

const MAX_BACKOFF: Duration = Duration::from_secs(30);

/// How often a failed transport call is re-issued.
/// The default never retries: one failure abandons the call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 0,
            backoff: Duration::from_millis(500),
        }
    }
}

impl RetryPolicy {
    /// Exponential, capped at 30s.
    fn backoff_duration(&self, attempt: u32) -> Duration {
        self.backoff
            .saturating_mul(2u32.saturating_pow(attempt))
            .min(MAX_BACKOFF)
    }

    /// Runs `call` until it succeeds, fails with a non-transport error,
    /// or the retry budget is spent.
    pub async fn run<T, F, Fut>(&self, label: &str, mut call: F) -> Result<T, ExchangeError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, ExchangeError>>,
    {
        let mut attempt = 0;
        loop {
            match call().await {
                Err(e) if e.is_transport() && attempt < self.max_retries => {
                    let delay = self.backoff_duration(attempt);
                    attempt += 1;
                    tracing::warn!(
                        "{label} failed ({e}), retry {attempt}/{} in {:?}",
                        self.max_retries,
                        delay
                    );
                    tokio::time::sleep(delay).await;
                }
                result => return result,
            }
        }
    }
}
