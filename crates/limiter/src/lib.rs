//! Distributed rate limiting for upstream Google API calls.
//!
//! Google enforces per-user quotas independently for the Tag Manager and
//! GA4 Admin APIs; violating them degrades every subsequent call the tenant
//! makes. [`ApiRateLimiter`] keeps each tenant under a configured ceiling
//! using a sliding-window approximation over shared
//! [`StateStore`](taggate_state::StateStore) counters, so every dashboard
//! instance draws from the same budget. Callers block cooperatively until
//! capacity frees or their deadline elapses — they never silently proceed.

mod config;
mod limiter;

pub use config::{FamilyLimits, RateLimitConfig, RateLimitErrorBehavior, RateLimitTier};
pub use limiter::{ApiRateLimiter, RateLimitError, RateLimitGrant};
