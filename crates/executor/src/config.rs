use std::time::Duration;

use crate::retry::RetryStrategy;

/// Configuration for the upstream call executor.
#[derive(Debug, Clone)]
pub struct ExecutorConfig {
    /// Maximum total attempts per call (initial call + retries).
    pub max_attempts: u32,

    /// Delay strategy between quota retries.
    pub retry_strategy: RetryStrategy,

    /// Timeout applied to each individual attempt.
    pub execution_timeout: Duration,

    /// Maximum number of outbound calls in flight at once.
    pub max_concurrent: usize,

    /// Minimum spacing between dispatches, smoothing local bursts within a
    /// batch fan-out.
    pub min_dispatch_interval: Duration,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            retry_strategy: RetryStrategy::default(),
            execution_timeout: Duration::from_secs(30),
            max_concurrent: 3,
            min_dispatch_interval: Duration::from_millis(110),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = ExecutorConfig::default();
        assert_eq!(config.max_attempts, 3);
        assert_eq!(config.max_concurrent, 3);
        assert_eq!(config.min_dispatch_interval, Duration::from_millis(110));
        assert_eq!(config.execution_timeout, Duration::from_secs(30));
    }
}
