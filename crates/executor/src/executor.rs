use std::future::Future;
use std::sync::Arc;

use thiserror::Error;
use tokio::sync::{Mutex, Semaphore};
use tokio::time::Instant;
use tracing::{debug, warn};

use taggate_provider::UpstreamError;

use crate::config::ExecutorConfig;

/// Final failure of one upstream call after the executor gave up.
///
/// Carries the attempt count so callers (and tests) can verify the retry
/// budget was honored.
#[derive(Debug, Error)]
#[error("{error} (after {attempts} attempt(s))")]
pub struct ExecutionFailure {
    /// The last error observed.
    pub error: UpstreamError,
    /// Number of attempts made, including the first.
    pub attempts: u32,
}

/// Executes upstream calls with bounded concurrency, dispatch spacing, and
/// bounded retries on quota rejections.
///
/// The executor acquires a semaphore permit before each call so that at most
/// [`ExecutorConfig::max_concurrent`] calls run in parallel, and delays each
/// dispatch so consecutive calls are at least
/// [`ExecutorConfig::min_dispatch_interval`] apart process-wide. A call that
/// fails with the upstream quota signal (HTTP 429) is retried with delays
/// from the configured [`RetryStrategy`](crate::RetryStrategy), up to
/// [`ExecutorConfig::max_attempts`] total attempts. Every other error
/// propagates immediately: it describes a bad request or missing resource,
/// which retrying cannot fix.
pub struct UpstreamExecutor {
    config: ExecutorConfig,
    semaphore: Arc<Semaphore>,
    next_slot: Mutex<Option<Instant>>,
}

impl UpstreamExecutor {
    /// Create a new executor from the given configuration.
    ///
    /// # Examples
    ///
    /// ```
    /// use taggate_executor::{ExecutorConfig, UpstreamExecutor};
    ///
    /// let executor = UpstreamExecutor::new(ExecutorConfig::default());
    /// ```
    #[must_use]
    pub fn new(config: ExecutorConfig) -> Self {
        let semaphore = Arc::new(Semaphore::new(config.max_concurrent));
        Self {
            config,
            semaphore,
            next_slot: Mutex::new(None),
        }
    }

    /// Return a reference to the executor configuration.
    pub fn config(&self) -> &ExecutorConfig {
        &self.config
    }

    /// Wait for the next dispatch slot, spacing outbound calls.
    async fn pace(&self) {
        let wait_until = {
            let mut slot = self.next_slot.lock().await;
            let now = Instant::now();
            let at = slot.map_or(now, |s| s.max(now));
            *slot = Some(at + self.config.min_dispatch_interval);
            at
        };
        tokio::time::sleep_until(wait_until).await;
    }

    /// Execute `call`, which must perform exactly one outbound HTTP call per
    /// invocation.
    ///
    /// The closure is re-invoked for each retry attempt. Returns the call's
    /// value on success, or an [`ExecutionFailure`] carrying the final error
    /// and the attempt count.
    pub async fn run<T, F, Fut>(&self, label: &str, mut call: F) -> Result<T, ExecutionFailure>
    where
        F: FnMut() -> Fut + Send,
        Fut: Future<Output = Result<T, UpstreamError>> + Send,
    {
        // Acquire a concurrency permit. This is cancel-safe: if the caller
        // drops the future while waiting, the permit is never acquired.
        let _permit = self
            .semaphore
            .acquire()
            .await
            .expect("semaphore should never be closed");

        let mut attempt: u32 = 0;

        loop {
            self.pace().await;
            attempt += 1;
            debug!(
                call = label,
                attempt,
                max_attempts = self.config.max_attempts,
                "dispatching upstream call"
            );

            let result =
                tokio::time::timeout(self.config.execution_timeout, call()).await;

            match result {
                Ok(Ok(value)) => {
                    debug!(call = label, attempt, "upstream call succeeded");
                    return Ok(value);
                }
                Ok(Err(err)) => {
                    if err.is_retryable() && attempt < self.config.max_attempts {
                        let delay = self.config.retry_strategy.delay_for(attempt - 1);
                        warn!(
                            call = label,
                            attempt,
                            delay_ms = %delay.as_millis(),
                            "upstream quota hit, will retry"
                        );
                        tokio::time::sleep(delay).await;
                    } else {
                        warn!(
                            call = label,
                            attempt,
                            error = %err,
                            retryable = err.is_retryable(),
                            "upstream call failed"
                        );
                        return Err(ExecutionFailure {
                            error: err,
                            attempts: attempt,
                        });
                    }
                }
                Err(_elapsed) => {
                    // A hung request is a transport fault, not a quota
                    // signal, so it is not retried.
                    warn!(
                        call = label,
                        attempt,
                        timeout = ?self.config.execution_timeout,
                        "upstream call timed out"
                    );
                    return Err(ExecutionFailure {
                        error: UpstreamError::Transport(format!(
                            "timed out after {:?}",
                            self.config.execution_timeout
                        )),
                        attempts: attempt,
                    });
                }
            }
        }
    }
}
