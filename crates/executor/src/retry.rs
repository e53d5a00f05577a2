use std::time::Duration;

/// Strategy for computing delay between retry attempts.
///
/// All variants clamp the computed delay so it never exceeds the configured
/// maximum.
#[derive(Debug, Clone)]
pub enum RetryStrategy {
    /// Exponential backoff: `base * 2^attempt`, optionally with
    /// deterministic jitter of up to 200ms.
    Exponential {
        /// Initial delay before the first retry.
        base: Duration,
        /// Upper bound on the computed delay.
        max: Duration,
        /// When `true`, a deterministic jitter of 0..=200ms is added so that
        /// concurrent callers do not all retry at the same instant.
        jitter: bool,
    },
    /// Constant delay between every retry attempt.
    Constant {
        /// Fixed delay duration.
        delay: Duration,
    },
}

impl RetryStrategy {
    /// Compute the delay duration for the given zero-based `attempt` number.
    ///
    /// The base value (before jitter) is non-decreasing in `attempt`, so
    /// consecutive retries always wait at least as long as the previous one.
    ///
    /// # Examples
    ///
    /// ```
    /// use std::time::Duration;
    /// use taggate_executor::RetryStrategy;
    ///
    /// let strategy = RetryStrategy::Constant { delay: Duration::from_secs(1) };
    /// assert_eq!(strategy.delay_for(0), Duration::from_secs(1));
    /// assert_eq!(strategy.delay_for(5), Duration::from_secs(1));
    /// ```
    pub fn delay_for(&self, attempt: u32) -> Duration {
        match self {
            Self::Exponential { base, max, jitter } => {
                let exp = base.saturating_mul(2u32.saturating_pow(attempt));

                let adjusted = if *jitter {
                    // Deterministic jitter: 0, 50, 100, 150 or 200ms based
                    // on the attempt number. This spreads retries across a
                    // window without requiring a random number generator.
                    exp + Duration::from_millis(50 * u64::from(attempt % 5))
                } else {
                    exp
                };

                adjusted.min(*max)
            }
            Self::Constant { delay } => *delay,
        }
    }
}

impl Default for RetryStrategy {
    fn default() -> Self {
        Self::Exponential {
            base: Duration::from_millis(1000),
            max: Duration::from_secs(30),
            jitter: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exponential_no_jitter_doubles() {
        let strategy = RetryStrategy::Exponential {
            base: Duration::from_millis(1000),
            max: Duration::from_secs(60),
            jitter: false,
        };
        // attempt 0: 1000ms, attempt 1: 2000ms, attempt 2: 4000ms
        assert_eq!(strategy.delay_for(0), Duration::from_millis(1000));
        assert_eq!(strategy.delay_for(1), Duration::from_millis(2000));
        assert_eq!(strategy.delay_for(2), Duration::from_millis(4000));
    }

    #[test]
    fn exponential_clamped_to_max() {
        let strategy = RetryStrategy::Exponential {
            base: Duration::from_secs(1),
            max: Duration::from_secs(5),
            jitter: false,
        };
        // attempt 3: 8s -> clamped to 5s
        assert_eq!(strategy.delay_for(3), Duration::from_secs(5));
        assert_eq!(strategy.delay_for(10), Duration::from_secs(5));
    }

    #[test]
    fn exponential_jitter_is_bounded() {
        let strategy = RetryStrategy::Exponential {
            base: Duration::from_millis(1000),
            max: Duration::from_secs(60),
            jitter: true,
        };
        for attempt in 0..5 {
            let base = Duration::from_millis(1000 * 2u64.pow(attempt));
            let with_jitter = strategy.delay_for(attempt);
            assert!(with_jitter >= base, "jitter never shortens the delay");
            assert!(
                with_jitter <= base + Duration::from_millis(200),
                "jitter is at most 200ms"
            );
        }
    }

    #[test]
    fn base_delays_are_monotonic() {
        let strategy = RetryStrategy::Exponential {
            base: Duration::from_millis(1000),
            max: Duration::from_secs(30),
            jitter: false,
        };
        let mut prev = Duration::ZERO;
        for attempt in 0..8 {
            let delay = strategy.delay_for(attempt);
            assert!(delay >= prev, "delay must be non-decreasing");
            prev = delay;
        }
    }

    #[test]
    fn constant_always_same() {
        let strategy = RetryStrategy::Constant {
            delay: Duration::from_millis(250),
        };
        for attempt in 0..10 {
            assert_eq!(strategy.delay_for(attempt), Duration::from_millis(250));
        }
    }

    #[test]
    fn default_is_exponential_with_jitter() {
        match RetryStrategy::default() {
            RetryStrategy::Exponential { base, max, jitter } => {
                assert_eq!(base, Duration::from_millis(1000));
                assert_eq!(max, Duration::from_secs(30));
                assert!(jitter);
            }
            RetryStrategy::Constant { .. } => panic!("default should be Exponential"),
        }
    }
}
