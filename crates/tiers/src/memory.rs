use async_trait::async_trait;
use dashmap::DashMap;

use taggate_core::{Feature, OperationKind, TenantId};

use crate::error::TierError;
use crate::limits::{TierLimitRow, TierLimits};
use crate::store::TierStore;

/// In-memory [`TierStore`] backed by a [`DashMap`].
///
/// Each row mutation happens under the map's shard guard, which makes
/// `try_reserve` atomic per row — the same guarantee the Postgres backend
/// gets from its conditional `UPDATE`.
#[derive(Debug, Default)]
pub struct MemoryTierStore {
    rows: DashMap<String, TierLimitRow>,
}

impl MemoryTierStore {
    /// Create a new, empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn row_key(tenant: &TenantId, feature: Feature) -> String {
        format!("{tenant}:{feature}")
    }
}

#[async_trait]
impl TierStore for MemoryTierStore {
    async fn fetch(
        &self,
        tenant: &TenantId,
        feature: Feature,
    ) -> Result<Option<TierLimitRow>, TierError> {
        Ok(self
            .rows
            .get(&Self::row_key(tenant, feature))
            .map(|r| r.value().clone()))
    }

    async fn upsert_limits(
        &self,
        tenant: &TenantId,
        feature: Feature,
        limits: &TierLimits,
    ) -> Result<(), TierError> {
        self.rows
            .entry(Self::row_key(tenant, feature))
            .and_modify(|row| {
                row.create_limit = limits.create_limit;
                row.update_limit = limits.update_limit;
                row.delete_limit = limits.delete_limit;
            })
            .or_insert_with(|| TierLimitRow::fresh(tenant.clone(), feature, limits));
        Ok(())
    }

    async fn try_reserve(
        &self,
        tenant: &TenantId,
        feature: Feature,
        kind: OperationKind,
        count: i64,
    ) -> Result<bool, TierError> {
        let Some(mut row) = self.rows.get_mut(&Self::row_key(tenant, feature)) else {
            return Err(TierError::NoSubscription {
                tenant: tenant.to_string(),
                feature: feature.to_string(),
            });
        };

        if row.usage(kind) + count > row.limit(kind) {
            return Ok(false);
        }
        *row.usage_mut(kind) += count;
        Ok(true)
    }

    async fn release(
        &self,
        tenant: &TenantId,
        feature: Feature,
        kind: OperationKind,
        count: i64,
    ) -> Result<(), TierError> {
        if let Some(mut row) = self.rows.get_mut(&Self::row_key(tenant, feature)) {
            let usage = row.usage_mut(kind);
            *usage = (*usage - count).max(0);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;

    fn tenant() -> TenantId {
        TenantId::from("t1")
    }

    #[tokio::test]
    async fn fetch_missing_row() {
        let store = MemoryTierStore::new();
        let row = store.fetch(&tenant(), Feature::GtmTags).await.unwrap();
        assert!(row.is_none());
    }

    #[tokio::test]
    async fn reserve_within_limit() {
        let store = MemoryTierStore::new();
        store
            .upsert_limits(&tenant(), Feature::GtmTags, &TierLimits::uniform(10))
            .await
            .unwrap();

        let reserved = store
            .try_reserve(&tenant(), Feature::GtmTags, OperationKind::Update, 3)
            .await
            .unwrap();
        assert!(reserved);

        let row = store
            .fetch(&tenant(), Feature::GtmTags)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(row.update_usage, 3);
    }

    #[tokio::test]
    async fn reserve_over_limit_changes_nothing() {
        let store = MemoryTierStore::new();
        store
            .upsert_limits(&tenant(), Feature::GtmTags, &TierLimits::uniform(10))
            .await
            .unwrap();
        store
            .try_reserve(&tenant(), Feature::GtmTags, OperationKind::Update, 8)
            .await
            .unwrap();

        // 8/10 used, 3 requested -> rejected without side effects.
        let reserved = store
            .try_reserve(&tenant(), Feature::GtmTags, OperationKind::Update, 3)
            .await
            .unwrap();
        assert!(!reserved);

        let row = store
            .fetch(&tenant(), Feature::GtmTags)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(row.update_usage, 8, "rejected reserve must not move usage");
    }

    #[tokio::test]
    async fn reserve_without_subscription() {
        let store = MemoryTierStore::new();
        let err = store
            .try_reserve(&tenant(), Feature::Ga4Streams, OperationKind::Create, 1)
            .await
            .unwrap_err();
        assert!(matches!(err, TierError::NoSubscription { .. }));
    }

    #[tokio::test]
    async fn release_clamps_at_zero() {
        let store = MemoryTierStore::new();
        store
            .upsert_limits(&tenant(), Feature::GtmTags, &TierLimits::uniform(10))
            .await
            .unwrap();
        store
            .try_reserve(&tenant(), Feature::GtmTags, OperationKind::Delete, 2)
            .await
            .unwrap();

        store
            .release(&tenant(), Feature::GtmTags, OperationKind::Delete, 5)
            .await
            .unwrap();

        let row = store
            .fetch(&tenant(), Feature::GtmTags)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(row.delete_usage, 0);
    }

    #[tokio::test]
    async fn upsert_preserves_usage() {
        let store = MemoryTierStore::new();
        store
            .upsert_limits(&tenant(), Feature::GtmTags, &TierLimits::uniform(10))
            .await
            .unwrap();
        store
            .try_reserve(&tenant(), Feature::GtmTags, OperationKind::Create, 4)
            .await
            .unwrap();

        // Plan upgrade: limits change, usage stays.
        store
            .upsert_limits(&tenant(), Feature::GtmTags, &TierLimits::uniform(50))
            .await
            .unwrap();

        let row = store
            .fetch(&tenant(), Feature::GtmTags)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(row.create_usage, 4);
        assert_eq!(row.create_limit, 50);
    }

    #[tokio::test]
    async fn concurrent_reserves_never_overshoot() {
        let store = Arc::new(MemoryTierStore::new());
        store
            .upsert_limits(&tenant(), Feature::GtmContainers, &TierLimits::uniform(5))
            .await
            .unwrap();

        let mut handles = Vec::new();
        for _ in 0..20 {
            let store = Arc::clone(&store);
            handles.push(tokio::spawn(async move {
                store
                    .try_reserve(&tenant(), Feature::GtmContainers, OperationKind::Create, 1)
                    .await
                    .unwrap()
            }));
        }

        let mut granted = 0;
        for handle in handles {
            if handle.await.unwrap() {
                granted += 1;
            }
        }

        assert_eq!(granted, 5, "exactly the limit may be reserved");
        let row = store
            .fetch(&tenant(), Feature::GtmContainers)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(row.create_usage, 5);
    }
}
