use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use thiserror::Error;
use tokio::time::Instant;
use tracing::{debug, warn};

use taggate_core::{ApiFamily, TenantId};
use taggate_state::key::{KeyKind, StateKey};
use taggate_state::store::StateStore;

use crate::config::{RateLimitConfig, RateLimitErrorBehavior, RateLimitTier};

/// Capacity granted for one batch of upstream calls.
#[derive(Debug, Clone)]
pub struct RateLimitGrant {
    /// The configured limit for this tenant/family.
    pub limit: u64,
    /// Approximate remaining requests in the current window.
    pub remaining: u64,
}

/// Errors from capacity acquisition.
#[derive(Debug, Error)]
pub enum RateLimitError {
    /// No capacity freed before the deadline. Fatal for the whole batch; no
    /// per-item dispatch has happened yet.
    #[error("rate limit capacity not granted within {waited:?}")]
    Timeout { waited: Duration },

    /// The state store is unreachable and the limiter is configured
    /// fail-closed.
    #[error("rate limiter unavailable: {0}")]
    Unavailable(String),
}

/// Outcome of one non-blocking capacity check.
enum Check {
    Granted(RateLimitGrant),
    /// Over capacity; retry after roughly this long.
    Backoff(Duration),
}

/// Distributed rate limiter using the sliding window approximation
/// algorithm.
///
/// Uses `StateStore::increment()` for atomic counters, making it safe across
/// multiple dashboard instances with any backend (Redis in production, the
/// in-memory store in tests). Limits are keyed per tenant and per upstream
/// API family, since GTM and GA4 quotas are independent.
pub struct ApiRateLimiter {
    store: Arc<dyn StateStore>,
    config: RateLimitConfig,
}

impl ApiRateLimiter {
    /// Create a new rate limiter.
    #[must_use]
    pub fn new(store: Arc<dyn StateStore>, config: RateLimitConfig) -> Self {
        Self { store, config }
    }

    /// Get the rate limit configuration.
    pub fn config(&self) -> &RateLimitConfig {
        &self.config
    }

    /// Block until capacity is available for `tenant` on `family`, or until
    /// `timeout` elapses.
    ///
    /// Waiting is cooperative: the task sleeps between checks, sized by the
    /// window's reset estimate. On timeout the whole batch must fail —
    /// proceeding without a grant would burn the tenant's upstream quota.
    pub async fn acquire(
        &self,
        tenant: &TenantId,
        family: ApiFamily,
        timeout: Duration,
    ) -> Result<RateLimitGrant, RateLimitError> {
        let deadline = Instant::now() + timeout;
        let tier = self.config.tier_for(family, tenant.as_str()).clone();

        loop {
            match self.check(tenant, family, &tier).await? {
                Check::Granted(grant) => {
                    debug!(
                        %tenant,
                        %family,
                        remaining = grant.remaining,
                        "rate limit capacity granted"
                    );
                    return Ok(grant);
                }
                Check::Backoff(retry_after) => {
                    let now = Instant::now();
                    if now >= deadline {
                        warn!(%tenant, %family, "rate limit acquisition timed out");
                        return Err(RateLimitError::Timeout { waited: timeout });
                    }
                    let nap = retry_after.min(deadline - now);
                    tokio::time::sleep(nap).await;
                }
            }
        }
    }

    /// One non-blocking sliding-window check.
    ///
    /// Algorithm (sliding window approximation, ~2% error margin):
    /// 1. Compute current and previous window timestamps.
    /// 2. Get counts for both windows.
    /// 3. Weighted effective count:
    ///    `effective = prev_count * weight + curr_count`
    ///    where `weight = (window_seconds - elapsed) / window_seconds`.
    /// 4. If effective < limit, increment the current window and grant.
    #[allow(clippy::cast_precision_loss, clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    async fn check(
        &self,
        tenant: &TenantId,
        family: ApiFamily,
        tier: &RateLimitTier,
    ) -> Result<Check, RateLimitError> {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_secs();

        let window = tier.window_seconds.max(1);
        let limit = tier.requests_per_window;

        let current_window_start = (now / window) * window;
        let previous_window_start = current_window_start.saturating_sub(window);
        let elapsed = now - current_window_start;

        let current_key = Self::build_key(tenant, family, current_window_start);
        let previous_key = Self::build_key(tenant, family, previous_window_start);

        let prev_count = match self.store.get(&previous_key).await {
            Ok(Some(v)) => v.parse::<u64>().unwrap_or(0),
            Ok(None) => 0,
            Err(e) => {
                warn!(error = %e, "rate limiter: failed to get previous window count");
                return self.handle_store_error(tier, &e.to_string());
            }
        };

        let curr_count = match self.store.get(&current_key).await {
            Ok(Some(v)) => v.parse::<u64>().unwrap_or(0),
            Ok(None) => 0,
            Err(e) => {
                warn!(error = %e, "rate limiter: failed to get current window count");
                return self.handle_store_error(tier, &e.to_string());
            }
        };

        let weight = (window.saturating_sub(elapsed)) as f64 / window as f64;
        let effective_count = (prev_count as f64 * weight) as u64 + curr_count;

        if effective_count >= limit {
            let reset_after = window.saturating_sub(elapsed).max(1);
            return Ok(Check::Backoff(Duration::from_secs(reset_after)));
        }

        // Keep the counter for two windows so the next window can weigh it.
        let ttl = Duration::from_secs(window * 2);
        match self.store.increment(&current_key, 1, Some(ttl)).await {
            Ok(_new_count) => {
                let remaining = limit.saturating_sub(effective_count + 1);
                Ok(Check::Granted(RateLimitGrant { limit, remaining }))
            }
            Err(e) => {
                warn!(error = %e, "rate limiter: failed to increment counter");
                self.handle_store_error(tier, &e.to_string())
            }
        }
    }

    /// Build a state key for a rate limit window.
    fn build_key(tenant: &TenantId, family: ApiFamily, window_start: u64) -> StateKey {
        StateKey::new(
            family,
            tenant.clone(),
            KeyKind::RateLimit,
            window_start.to_string(),
        )
    }

    /// Handle state store errors according to the configured behavior.
    fn handle_store_error(
        &self,
        tier: &RateLimitTier,
        message: &str,
    ) -> Result<Check, RateLimitError> {
        match self.config.on_error {
            RateLimitErrorBehavior::Allow => {
                // Fail-open: allow the request.
                Ok(Check::Granted(RateLimitGrant {
                    limit: tier.requests_per_window,
                    remaining: tier.requests_per_window,
                }))
            }
            RateLimitErrorBehavior::Deny => {
                // Fail-closed: deny the request.
                Err(RateLimitError::Unavailable(message.to_owned()))
            }
        }
    }
}
