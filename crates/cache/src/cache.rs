use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tracing::{debug, warn};

use taggate_core::{ApiFamily, Feature, TenantId};
use taggate_state::key::{KeyKind, StateKey};
use taggate_state::store::StateStore;
use taggate_state::StateError;

use crate::revalidate::RouteRevalidator;

/// Errors from cache operations.
#[derive(Debug, Error)]
pub enum CacheError {
    /// The backing state store failed.
    #[error(transparent)]
    State(#[from] StateError),

    /// A value could not be serialized for storage.
    #[error("serialization error: {0}")]
    Serialization(String),
}

/// Result of a read-through lookup.
#[derive(Debug)]
pub enum CacheRead {
    /// The cache held the full collection.
    Hit(Vec<serde_json::Value>),
    /// Nothing cached; the caller must fetch upstream and populate.
    Miss,
}

/// One targeted cache mutation, applied by
/// [`ResourceCache::soft_revalidate`].
#[derive(Debug, Clone)]
pub enum CacheOp {
    /// Insert or replace the entry for a resource id.
    Upsert {
        id: String,
        value: serde_json::Value,
    },
    /// Evict the entry for a resource id (resource was deleted).
    Remove { id: String },
}

/// TTLs per API family.
///
/// GTM configuration churns daily; GA4 admin objects are near-static, so
/// they may live a week.
#[derive(Debug, Clone)]
pub struct CacheConfig {
    pub gtm_ttl: Duration,
    pub ga4_ttl: Duration,
}

impl CacheConfig {
    /// The TTL for a family.
    #[must_use]
    pub fn ttl(&self, family: ApiFamily) -> Duration {
        match family {
            ApiFamily::Gtm => self.gtm_ttl,
            ApiFamily::Ga4 => self.ga4_ttl,
        }
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            gtm_ttl: Duration::from_secs(24 * 60 * 60),
            ga4_ttl: Duration::from_secs(7 * 24 * 60 * 60),
        }
    }
}

/// Per-tenant, per-feature cache of upstream resources.
///
/// One hash per `(tenant, feature)`, keyed by the resource's natural id,
/// each field holding the JSON-serialized upstream object. Invariant: after
/// a successful mutation the corresponding field is updated or evicted
/// *before* the batch response is returned, so the next list within the
/// tenant's session reads its own write.
pub struct ResourceCache {
    store: Arc<dyn StateStore>,
    config: CacheConfig,
    revalidator: Arc<dyn RouteRevalidator>,
}

impl ResourceCache {
    /// Create a cache over the given store and revalidation hook.
    #[must_use]
    pub fn new(
        store: Arc<dyn StateStore>,
        config: CacheConfig,
        revalidator: Arc<dyn RouteRevalidator>,
    ) -> Self {
        Self {
            store,
            config,
            revalidator,
        }
    }

    fn cache_key(tenant: &TenantId, feature: Feature) -> StateKey {
        StateKey::new(
            feature.family(),
            tenant.clone(),
            KeyKind::Cache,
            feature.as_str(),
        )
    }

    /// The dashboard route invalidated when this feature's cache changes.
    fn route_path(feature: Feature) -> String {
        format!("/dashboard/{}/{}", feature.family(), feature.collection())
    }

    /// Look up the cached collection for `(tenant, feature)`.
    ///
    /// A corrupt entry reads as a miss: the caller re-fetches and overwrites
    /// it, which is the cheapest self-heal.
    pub async fn read_through(
        &self,
        tenant: &TenantId,
        feature: Feature,
    ) -> Result<CacheRead, CacheError> {
        let key = Self::cache_key(tenant, feature);
        let Some(fields) = self.store.hash_get_all(&key).await? else {
            debug!(%tenant, %feature, "cache miss");
            return Ok(CacheRead::Miss);
        };

        let mut values = Vec::with_capacity(fields.len());
        for (id, raw) in &fields {
            match serde_json::from_str(raw) {
                Ok(value) => values.push(value),
                Err(e) => {
                    warn!(%tenant, %feature, id, error = %e, "corrupt cache entry, treating as miss");
                    return Ok(CacheRead::Miss);
                }
            }
        }

        debug!(%tenant, %feature, entries = values.len(), "cache hit");
        Ok(CacheRead::Hit(values))
    }

    /// Replace the cached collection with `entries` (one per resource id).
    ///
    /// Used after a full upstream list: the previous hash is dropped so
    /// resources deleted upstream do not linger.
    pub async fn write_all(
        &self,
        tenant: &TenantId,
        feature: Feature,
        entries: &[(String, serde_json::Value)],
    ) -> Result<(), CacheError> {
        let key = Self::cache_key(tenant, feature);
        self.store.delete(&key).await?;

        if entries.is_empty() {
            return Ok(());
        }

        let fields = serialize_fields(entries)?;
        let ttl = self.config.ttl(feature.family());
        self.store.hash_put(&key, &fields, Some(ttl)).await?;
        Ok(())
    }

    /// Drop the whole cached collection for `(tenant, feature)`.
    ///
    /// Fallback when a targeted patch fails: an empty cache is a correct
    /// cache, a stale one is not.
    pub async fn evict(&self, tenant: &TenantId, feature: Feature) -> Result<(), CacheError> {
        let key = Self::cache_key(tenant, feature);
        self.store.delete(&key).await?;
        Ok(())
    }

    /// Patch only the affected entries after a successful mutation, then
    /// request a route revalidation.
    ///
    /// Never flushes the whole key — untouched resources stay cached, which
    /// avoids a re-fetch storm right after every write.
    pub async fn soft_revalidate(
        &self,
        tenant: &TenantId,
        feature: Feature,
        ops: &[CacheOp],
    ) -> Result<(), CacheError> {
        if ops.is_empty() {
            return Ok(());
        }

        let key = Self::cache_key(tenant, feature);
        let mut upserts = Vec::new();
        let mut removals = Vec::new();
        for op in ops {
            match op {
                CacheOp::Upsert { id, value } => upserts.push((id.clone(), value.clone())),
                CacheOp::Remove { id } => removals.push(id.clone()),
            }
        }

        if !upserts.is_empty() {
            let fields = serialize_fields(&upserts)?;
            let ttl = self.config.ttl(feature.family());
            self.store.hash_put(&key, &fields, Some(ttl)).await?;
        }
        if !removals.is_empty() {
            self.store.hash_remove(&key, &removals).await?;
        }

        debug!(
            %tenant,
            %feature,
            upserts = upserts.len(),
            removals = removals.len(),
            "cache soft-revalidated"
        );

        self.revalidator.revalidate(&Self::route_path(feature)).await;
        Ok(())
    }
}

fn serialize_fields(
    entries: &[(String, serde_json::Value)],
) -> Result<Vec<(String, String)>, CacheError> {
    entries
        .iter()
        .map(|(id, value)| {
            serde_json::to_string(value)
                .map(|raw| (id.clone(), raw))
                .map_err(|e| CacheError::Serialization(e.to_string()))
        })
        .collect()
}
