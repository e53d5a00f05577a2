use std::sync::Arc;

use tracing::{debug, info};

use taggate_core::{Feature, OperationKind, TenantId};

use crate::error::TierError;
use crate::limits::TierLimitRow;
use crate::store::TierStore;

/// The tenant's tier position for one operation kind.
#[derive(Debug, Clone)]
pub struct TierStatus {
    /// The full tier row.
    pub row: TierLimitRow,
    /// Remaining admissible operations of the requested kind.
    pub available: i64,
}

/// A successful admission: `reserved` operations of `kind` are pre-counted
/// against the tenant's usage.
///
/// After the batch settles, call
/// [`TierLimitGate::release_unused`] with the number of items that did not
/// succeed, so usage ends up advanced by exactly the success count.
#[derive(Debug, Clone)]
pub struct Reservation {
    pub tenant: TenantId,
    pub feature: Feature,
    pub kind: OperationKind,
    pub reserved: i64,
}

/// Admission control for tier-limited mutations.
///
/// Admission happens before any upstream side effect: a batch whose size
/// exceeds the remaining allowance is rejected outright, with nothing
/// dispatched and nothing counted.
pub struct TierLimitGate {
    store: Arc<dyn TierStore>,
}

impl TierLimitGate {
    /// Create a gate over the given store.
    #[must_use]
    pub fn new(store: Arc<dyn TierStore>) -> Self {
        Self { store }
    }

    /// Read the tenant's tier position for `kind` without reserving.
    pub async fn check(
        &self,
        tenant: &TenantId,
        feature: Feature,
        kind: OperationKind,
    ) -> Result<TierStatus, TierError> {
        let row = self
            .store
            .fetch(tenant, feature)
            .await?
            .ok_or_else(|| TierError::NoSubscription {
                tenant: tenant.to_string(),
                feature: feature.to_string(),
            })?;
        let available = row.available(kind);
        Ok(TierStatus { row, available })
    }

    /// Atomically reserve `count` operations of `kind`.
    ///
    /// On success the usage counter has already advanced by `count`; on
    /// [`TierError::LimitReached`] nothing changed anywhere.
    pub async fn reserve(
        &self,
        tenant: &TenantId,
        feature: Feature,
        kind: OperationKind,
        count: i64,
    ) -> Result<Reservation, TierError> {
        let reserved = self.store.try_reserve(tenant, feature, kind, count).await?;

        if reserved {
            debug!(%tenant, %feature, %kind, count, "tier usage reserved");
            return Ok(Reservation {
                tenant: tenant.clone(),
                feature,
                kind,
                reserved: count,
            });
        }

        // Rejected: report the allowance that was actually available.
        let status = self.check(tenant, feature, kind).await?;
        info!(
            %tenant,
            %feature,
            %kind,
            requested = count,
            available = status.available,
            "tier limit reached, batch rejected"
        );
        Err(TierError::LimitReached {
            requested: count,
            available: status.available,
        })
    }

    /// Return the part of a reservation whose items did not succeed.
    pub async fn release_unused(
        &self,
        reservation: &Reservation,
        unused: i64,
    ) -> Result<(), TierError> {
        if unused <= 0 {
            return Ok(());
        }
        debug!(
            tenant = %reservation.tenant,
            feature = %reservation.feature,
            kind = %reservation.kind,
            unused,
            "releasing unused tier reservations"
        );
        self.store
            .release(
                &reservation.tenant,
                reservation.feature,
                reservation.kind,
                unused.min(reservation.reserved),
            )
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::limits::TierLimits;
    use crate::memory::MemoryTierStore;

    async fn gate_with_limits(limit: i64) -> (TierLimitGate, Arc<MemoryTierStore>) {
        let store = Arc::new(MemoryTierStore::new());
        store
            .upsert_limits(
                &TenantId::from("t1"),
                Feature::GtmAccounts,
                &TierLimits::uniform(limit),
            )
            .await
            .unwrap();
        (TierLimitGate::new(Arc::clone(&store) as Arc<dyn TierStore>), store)
    }

    async fn usage(store: &MemoryTierStore, kind: OperationKind) -> i64 {
        store
            .fetch(&TenantId::from("t1"), Feature::GtmAccounts)
            .await
            .unwrap()
            .unwrap()
            .usage(kind)
    }

    #[tokio::test]
    async fn check_reports_available() {
        let (gate, store) = gate_with_limits(10).await;
        store
            .try_reserve(
                &TenantId::from("t1"),
                Feature::GtmAccounts,
                OperationKind::Update,
                8,
            )
            .await
            .unwrap();

        let status = gate
            .check(&TenantId::from("t1"), Feature::GtmAccounts, OperationKind::Update)
            .await
            .unwrap();
        assert_eq!(status.available, 2);
    }

    #[tokio::test]
    async fn oversized_batch_rejected_without_side_effects() {
        let (gate, store) = gate_with_limits(10).await;
        store
            .try_reserve(
                &TenantId::from("t1"),
                Feature::GtmAccounts,
                OperationKind::Update,
                8,
            )
            .await
            .unwrap();

        // availableUsage = 2, requested = 3.
        let err = gate
            .reserve(&TenantId::from("t1"), Feature::GtmAccounts, OperationKind::Update, 3)
            .await
            .unwrap_err();
        match err {
            TierError::LimitReached {
                requested,
                available,
            } => {
                assert_eq!(requested, 3);
                assert_eq!(available, 2);
            }
            other => panic!("expected LimitReached, got {other}"),
        }
        assert_eq!(usage(&store, OperationKind::Update).await, 8);
    }

    #[tokio::test]
    async fn release_unused_restores_exact_success_accounting() {
        let (gate, store) = gate_with_limits(10).await;

        let before = usage(&store, OperationKind::Create).await;
        let reservation = gate
            .reserve(&TenantId::from("t1"), Feature::GtmAccounts, OperationKind::Create, 3)
            .await
            .unwrap();

        // 2 of the 3 items succeeded; give the third slot back.
        gate.release_unused(&reservation, 1).await.unwrap();

        let after = usage(&store, OperationKind::Create).await;
        assert_eq!(after - before, 2, "usage advances by the success count");
    }

    #[tokio::test]
    async fn release_never_exceeds_reservation() {
        let (gate, store) = gate_with_limits(10).await;
        let reservation = gate
            .reserve(&TenantId::from("t1"), Feature::GtmAccounts, OperationKind::Delete, 2)
            .await
            .unwrap();

        gate.release_unused(&reservation, 99).await.unwrap();
        assert_eq!(usage(&store, OperationKind::Delete).await, 0);
    }

    #[tokio::test]
    async fn missing_subscription_surfaces() {
        let gate = TierLimitGate::new(Arc::new(MemoryTierStore::new()));
        let err = gate
            .check(&TenantId::from("nobody"), Feature::GtmTags, OperationKind::Create)
            .await
            .unwrap_err();
        assert!(matches!(err, TierError::NoSubscription { .. }));
    }
}
