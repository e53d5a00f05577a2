use std::collections::HashMap;
use std::sync::Arc;

use taggate_cache::{CacheConfig, NoopRevalidator, ResourceCache, RouteRevalidator};
use taggate_core::ApiFamily;
use taggate_executor::{ExecutorConfig, UpstreamExecutor};
use taggate_limiter::{ApiRateLimiter, RateLimitConfig};
use taggate_provider::{AccessTokenProvider, DynUpstreamClient, GoogleApiClient};
use taggate_state::StateStore;
use taggate_tiers::{TierLimitGate, TierStore};

use crate::error::GatewayError;
use crate::gateway::Gateway;

/// Fluent builder for constructing a [`Gateway`] instance.
///
/// At minimum, a [`StateStore`], a [`TierStore`], and an
/// [`AccessTokenProvider`] must be supplied. Upstream clients default to the
/// production Google API clients; tests register fakes per family. All other
/// fields have sensible defaults.
pub struct GatewayBuilder {
    state: Option<Arc<dyn StateStore>>,
    tiers: Option<Arc<dyn TierStore>>,
    tokens: Option<Arc<dyn AccessTokenProvider>>,
    clients: HashMap<ApiFamily, Arc<dyn DynUpstreamClient>>,
    executor_config: ExecutorConfig,
    rate_limit_config: RateLimitConfig,
    cache_config: CacheConfig,
    revalidator: Arc<dyn RouteRevalidator>,
}

impl GatewayBuilder {
    /// Create a new builder with all optional fields set to their defaults.
    #[must_use]
    pub fn new() -> Self {
        Self {
            state: None,
            tiers: None,
            tokens: None,
            clients: HashMap::new(),
            executor_config: ExecutorConfig::default(),
            rate_limit_config: RateLimitConfig::default(),
            cache_config: CacheConfig::default(),
            revalidator: Arc::new(NoopRevalidator),
        }
    }

    /// Set the shared state store (rate-limit counters + resource cache).
    #[must_use]
    pub fn state(mut self, store: Arc<dyn StateStore>) -> Self {
        self.state = Some(store);
        self
    }

    /// Set the tier usage store.
    #[must_use]
    pub fn tiers(mut self, store: Arc<dyn TierStore>) -> Self {
        self.tiers = Some(store);
        self
    }

    /// Set the tenant token provider.
    #[must_use]
    pub fn tokens(mut self, provider: Arc<dyn AccessTokenProvider>) -> Self {
        self.tokens = Some(provider);
        self
    }

    /// Register an upstream client for a family (replacing the default
    /// Google client).
    #[must_use]
    pub fn client(mut self, family: ApiFamily, client: Arc<dyn DynUpstreamClient>) -> Self {
        self.clients.insert(family, client);
        self
    }

    /// Set the executor configuration (retries, concurrency, spacing).
    #[must_use]
    pub fn executor_config(mut self, config: ExecutorConfig) -> Self {
        self.executor_config = config;
        self
    }

    /// Set the distributed rate limiter configuration.
    #[must_use]
    pub fn rate_limit_config(mut self, config: RateLimitConfig) -> Self {
        self.rate_limit_config = config;
        self
    }

    /// Set the resource cache configuration (per-family TTLs).
    #[must_use]
    pub fn cache_config(mut self, config: CacheConfig) -> Self {
        self.cache_config = config;
        self
    }

    /// Set the route revalidation hook fired after cache mutations.
    #[must_use]
    pub fn revalidator(mut self, revalidator: Arc<dyn RouteRevalidator>) -> Self {
        self.revalidator = revalidator;
        self
    }

    /// Assemble the gateway.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::Configuration`] when a required collaborator
    /// is missing, or when the in-process throttle could admit more
    /// concurrent calls than the distributed limiter's smallest window
    /// capacity — a combination that would let one batch overrun a window
    /// the limiter just granted.
    pub fn build(self) -> Result<Gateway, GatewayError> {
        let state = self
            .state
            .ok_or_else(|| GatewayError::Configuration("state store is required".into()))?;
        let tiers = self
            .tiers
            .ok_or_else(|| GatewayError::Configuration("tier store is required".into()))?;
        let tokens = self
            .tokens
            .ok_or_else(|| GatewayError::Configuration("token provider is required".into()))?;

        let throttle_ceiling = u64::try_from(self.executor_config.max_concurrent)
            .map_err(|_| GatewayError::Configuration("max_concurrent out of range".into()))?;
        let limiter_floor = self.rate_limit_config.min_default_capacity();
        if throttle_ceiling > limiter_floor {
            return Err(GatewayError::Configuration(format!(
                "executor max_concurrent ({throttle_ceiling}) exceeds the smallest \
                 rate-limit window capacity ({limiter_floor})"
            )));
        }

        let mut clients = self.clients;
        for family in [ApiFamily::Gtm, ApiFamily::Ga4] {
            clients
                .entry(family)
                .or_insert_with(|| Arc::new(GoogleApiClient::new(family)));
        }

        Ok(Gateway {
            tokens,
            gate: TierLimitGate::new(tiers),
            limiter: ApiRateLimiter::new(Arc::clone(&state), self.rate_limit_config),
            executor: UpstreamExecutor::new(self.executor_config),
            cache: ResourceCache::new(state, self.cache_config, self.revalidator),
            clients,
        })
    }
}

impl Default for GatewayBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use taggate_provider::StaticTokenProvider;
    use taggate_state_memory::MemoryStateStore;
    use taggate_tiers::MemoryTierStore;

    fn base_builder() -> GatewayBuilder {
        GatewayBuilder::new()
            .state(Arc::new(MemoryStateStore::new()))
            .tiers(Arc::new(MemoryTierStore::new()))
            .tokens(Arc::new(StaticTokenProvider::new()))
    }

    #[test]
    fn build_with_required_fields() {
        assert!(base_builder().build().is_ok());
    }

    #[test]
    fn missing_state_store_fails() {
        let err = GatewayBuilder::new()
            .tiers(Arc::new(MemoryTierStore::new()))
            .tokens(Arc::new(StaticTokenProvider::new()))
            .build()
            .unwrap_err();
        assert!(matches!(err, GatewayError::Configuration(_)));
    }

    #[test]
    fn throttle_ceiling_must_fit_limiter_capacity() {
        let config = ExecutorConfig {
            // Default GTM window capacity is 20.
            max_concurrent: 21,
            ..ExecutorConfig::default()
        };
        let err = base_builder().executor_config(config).build().unwrap_err();
        match err {
            GatewayError::Configuration(msg) => {
                assert!(msg.contains("max_concurrent"), "unexpected message: {msg}");
            }
            other => panic!("expected Configuration, got {other}"),
        }
    }
}
