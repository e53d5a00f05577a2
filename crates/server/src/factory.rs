use std::sync::Arc;

use taggate_provider::{AccessTokenProvider, HttpTokenProvider, StaticTokenProvider};
use taggate_state::StateStore;
use taggate_state_memory::MemoryStateStore;
use taggate_state_redis::{RedisConfig, RedisStateStore};
use taggate_tiers::{MemoryTierStore, PostgresTierConfig, PostgresTierStore, TierStore};

use crate::config::{IdentityConfig, StateConfig, TiersConfig};
use crate::error::ServerError;

/// Create the shared state store from configuration.
pub fn create_state(config: &StateConfig) -> Result<Arc<dyn StateStore>, ServerError> {
    match config.backend.as_str() {
        "memory" => Ok(Arc::new(MemoryStateStore::new())),
        "redis" => {
            let url = config
                .url
                .clone()
                .ok_or_else(|| ServerError::Config("state.url is required for redis".into()))?;
            let mut redis_config = RedisConfig::new(url);
            if let Some(ref prefix) = config.prefix {
                redis_config.prefix.clone_from(prefix);
            }
            let store = RedisStateStore::new(&redis_config)
                .map_err(|e| ServerError::Config(e.to_string()))?;
            Ok(Arc::new(store))
        }
        other => Err(ServerError::Config(format!(
            "unknown state backend: {other}"
        ))),
    }
}

/// Create the tier usage store from configuration.
pub async fn create_tiers(config: &TiersConfig) -> Result<Arc<dyn TierStore>, ServerError> {
    match config.backend.as_str() {
        "memory" => {
            let store = MemoryTierStore::new();
            if let Some(limit) = config.dev_limit {
                seed_dev_limits(&store, limit).await?;
            }
            Ok(Arc::new(store))
        }
        "postgres" => {
            let url = config
                .url
                .clone()
                .ok_or_else(|| ServerError::Config("tiers.url is required for postgres".into()))?;
            let mut pg_config = PostgresTierConfig::new(url);
            if let Some(ref prefix) = config.table_prefix {
                pg_config.table_prefix.clone_from(prefix);
            }
            let store = PostgresTierStore::new(pg_config)
                .await
                .map_err(|e| ServerError::Config(e.to_string()))?;
            Ok(Arc::new(store))
        }
        other => Err(ServerError::Config(format!(
            "unknown tiers backend: {other}"
        ))),
    }
}

/// Create the tenant token provider from configuration.
pub fn create_token_provider(
    config: &IdentityConfig,
) -> Result<Arc<dyn AccessTokenProvider>, ServerError> {
    if let Some(ref base_url) = config.base_url {
        let service_key = std::env::var(&config.service_key_env).map_err(|_| {
            ServerError::Config(format!(
                "{} environment variable is required when identity.base_url is set",
                config.service_key_env
            ))
        })?;
        return Ok(Arc::new(HttpTokenProvider::new(base_url, service_key)));
    }

    let mut provider = StaticTokenProvider::new();
    for (tenant, token) in &config.static_tokens {
        provider = provider.with_token(tenant.as_str(), token.as_str());
    }
    Ok(Arc::new(provider))
}

/// Seed a uniform limit for every known feature (development convenience).
async fn seed_dev_limits(store: &MemoryTierStore, limit: i64) -> Result<(), ServerError> {
    use taggate_core::{Feature, TenantId};
    use taggate_tiers::TierLimits;

    // Dev-only: rows are created lazily per tenant on first use in real
    // deployments; the memory backend has no provisioning webhook, so seed
    // a wildcard tenant the dashboard dev build uses.
    let tenant = TenantId::from("dev");
    for feature in Feature::ALL {
        store
            .upsert_limits(&tenant, feature, &TierLimits::uniform(limit))
            .await
            .map_err(|e| ServerError::Config(e.to_string()))?;
    }
    Ok(())
}
