use std::future::Future;
use std::time::Duration;

use crate::error::EngineError;

/// Bounded retry and timeout discipline for storage work
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    /// Extra attempts after the first one
    pub max_retries: u32,
    /// Linear backoff step between attempts
    pub backoff: Duration,
    /// Upper bound for a single attempt
    pub timeout: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            backoff: Duration::from_millis(25),
            timeout: Duration::from_secs(5),
        }
    }
}

impl RetryPolicy {
    /// Run one attempt under the timeout.
    ///
    /// When the timeout elapses the attempt's future is dropped, which rolls
    /// back any unit of work it still holds.
    pub async fn bounded<T, E, Fut>(&self, operation: &str, attempt: Fut) -> Result<T, EngineError>
    where
        Fut: Future<Output = Result<T, E>>,
        E: Into<EngineError>,
    {
        match tokio::time::timeout(self.timeout, attempt).await {
            Ok(result) => result.map_err(Into::into),
            Err(_) => Err(EngineError::Transient(format!(
                "{} timed out after {}ms",
                operation,
                self.timeout.as_millis()
            ))),
        }
    }

    /// Run a unit of work, retrying transient failures a bounded number of times
    pub async fn run<T, F, Fut>(&self, operation: &str, mut unit: F) -> Result<T, EngineError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, EngineError>>,
    {
        let mut attempt = 0;
        loop {
            match self.bounded(operation, unit()).await {
                Err(e) if e.is_transient() && attempt < self.max_retries => {
                    attempt += 1;
                    tracing::warn!(
                        "{} hit a transient failure (attempt {}/{}): {}",
                        operation,
                        attempt,
                        self.max_retries,
                        e
                    );
                    tokio::time::sleep(self.backoff * attempt).await;
                }
                Err(e) => {
                    if e.is_transient() {
                        tracing::error!("{} gave up after {} retries: {}", operation, attempt, e);
                    }
                    return Err(e);
                }
                Ok(value) => return Ok(value),
            }
        }
    }
}
