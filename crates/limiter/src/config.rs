use std::collections::HashMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use taggate_core::ApiFamily;

/// A rate limit tier defining the limit and window.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RateLimitTier {
    /// Maximum number of requests allowed per window.
    #[serde(default = "default_requests")]
    pub requests_per_window: u64,
    /// Window duration in seconds.
    #[serde(default = "default_window")]
    pub window_seconds: u64,
}

impl Default for RateLimitTier {
    fn default() -> Self {
        Self {
            requests_per_window: default_requests(),
            window_seconds: default_window(),
        }
    }
}

fn default_requests() -> u64 {
    20
}

fn default_window() -> u64 {
    100
}

/// Per-family limiter configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct FamilyLimits {
    /// Default tier for tenants without overrides.
    #[serde(default)]
    pub default: RateLimitTier,
    /// Per-tenant overrides keyed by tenant ID.
    #[serde(default)]
    pub overrides: HashMap<String, RateLimitTier>,
}

/// Behavior when the limiter's state store is unavailable.
#[derive(Debug, Default, Clone, Copy, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum RateLimitErrorBehavior {
    /// Allow requests through (fail-open).
    #[default]
    Allow,
    /// Deny requests (fail-closed).
    Deny,
}

/// Full limiter configuration.
///
/// Both families default to ceilings below Google's published per-user
/// quotas (requests per 100 seconds), since exceeding the upstream quota
/// penalizes the whole tenant, not just one call.
#[derive(Debug, Clone, Deserialize)]
pub struct RateLimitConfig {
    /// Tag Manager API limits.
    #[serde(default = "default_gtm_limits")]
    pub gtm: FamilyLimits,
    /// GA4 Admin API limits.
    #[serde(default = "default_ga4_limits")]
    pub ga4: FamilyLimits,
    /// Behavior on state store errors.
    #[serde(default)]
    pub on_error: RateLimitErrorBehavior,
    /// How long `acquire` may block waiting for capacity, in milliseconds.
    #[serde(default = "default_acquire_timeout_ms")]
    pub acquire_timeout_ms: u64,
}

impl RateLimitConfig {
    /// Resolve the tier for a tenant within a family.
    #[must_use]
    pub fn tier_for(&self, family: ApiFamily, tenant: &str) -> &RateLimitTier {
        let limits = self.family(family);
        limits.overrides.get(tenant).unwrap_or(&limits.default)
    }

    /// The per-family limit table.
    #[must_use]
    pub fn family(&self, family: ApiFamily) -> &FamilyLimits {
        match family {
            ApiFamily::Gtm => &self.gtm,
            ApiFamily::Ga4 => &self.ga4,
        }
    }

    /// The smallest default window capacity across families.
    ///
    /// The in-process throttle's concurrency ceiling must stay at or below
    /// this, otherwise one batch could overrun a window the limiter just
    /// granted.
    #[must_use]
    pub fn min_default_capacity(&self) -> u64 {
        self.gtm
            .default
            .requests_per_window
            .min(self.ga4.default.requests_per_window)
    }

    /// The acquire deadline as a [`Duration`].
    #[must_use]
    pub fn acquire_timeout(&self) -> Duration {
        Duration::from_millis(self.acquire_timeout_ms)
    }
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            gtm: default_gtm_limits(),
            ga4: default_ga4_limits(),
            on_error: RateLimitErrorBehavior::default(),
            acquire_timeout_ms: default_acquire_timeout_ms(),
        }
    }
}

fn default_gtm_limits() -> FamilyLimits {
    FamilyLimits {
        default: RateLimitTier {
            requests_per_window: 20,
            window_seconds: 100,
        },
        overrides: HashMap::new(),
    }
}

fn default_ga4_limits() -> FamilyLimits {
    FamilyLimits {
        default: RateLimitTier {
            requests_per_window: 80,
            window_seconds: 100,
        },
        overrides: HashMap::new(),
    }
}

fn default_acquire_timeout_ms() -> u64 {
    10_000
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_stay_below_upstream_ceilings() {
        let config = RateLimitConfig::default();
        assert_eq!(config.gtm.default.requests_per_window, 20);
        assert_eq!(config.ga4.default.requests_per_window, 80);
        assert_eq!(config.min_default_capacity(), 20);
    }

    #[test]
    fn tier_for_prefers_override() {
        let mut config = RateLimitConfig::default();
        config.gtm.overrides.insert(
            "vip".into(),
            RateLimitTier {
                requests_per_window: 100,
                window_seconds: 100,
            },
        );
        assert_eq!(
            config.tier_for(ApiFamily::Gtm, "vip").requests_per_window,
            100
        );
        assert_eq!(
            config.tier_for(ApiFamily::Gtm, "other").requests_per_window,
            20
        );
        assert_eq!(
            config.tier_for(ApiFamily::Ga4, "vip").requests_per_window,
            80,
            "overrides are per-family"
        );
    }

    #[test]
    fn parses_from_toml() {
        let config: RateLimitConfig = toml::from_str(
            r#"
            on_error = "deny"
            acquire_timeout_ms = 2000

            [gtm.default]
            requests_per_window = 10
            window_seconds = 60
            "#,
        )
        .unwrap();
        assert_eq!(config.on_error, RateLimitErrorBehavior::Deny);
        assert_eq!(config.acquire_timeout(), Duration::from_secs(2));
        assert_eq!(config.gtm.default.window_seconds, 60);
        // Unconfigured family keeps its default.
        assert_eq!(config.ga4.default.requests_per_window, 80);
    }
}
