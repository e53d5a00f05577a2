use async_trait::async_trait;

use taggate_core::{Feature, OperationKind, TenantId};

use crate::error::TierError;
use crate::limits::{TierLimitRow, TierLimits};

/// Trait for the persistence layer holding tier usage rows.
///
/// Implementations must be `Send + Sync`. The critical contract is
/// [`try_reserve`](TierStore::try_reserve): it must be a *single atomic*
/// conditional increment in the backend, so that concurrent batches for the
/// same tenant/feature cannot both pass admission against a stale reading.
#[async_trait]
pub trait TierStore: Send + Sync {
    /// Fetch the tier row for `(tenant, feature)`, if one exists.
    async fn fetch(
        &self,
        tenant: &TenantId,
        feature: Feature,
    ) -> Result<Option<TierLimitRow>, TierError>;

    /// Create or replace the limits for `(tenant, feature)`, preserving any
    /// existing usage. Used by subscription provisioning and tests.
    async fn upsert_limits(
        &self,
        tenant: &TenantId,
        feature: Feature,
        limits: &TierLimits,
    ) -> Result<(), TierError>;

    /// Atomically add `count` to the usage counter for `kind` if and only
    /// if `usage + count <= limit`.
    ///
    /// Returns `Ok(true)` when reserved, `Ok(false)` when the reservation
    /// would exceed the limit (nothing changed), and
    /// [`TierError::NoSubscription`] when no row exists.
    async fn try_reserve(
        &self,
        tenant: &TenantId,
        feature: Feature,
        kind: OperationKind,
        count: i64,
    ) -> Result<bool, TierError>;

    /// Subtract `count` from the usage counter for `kind`, clamping at
    /// zero. Used to return reservations for items that did not succeed.
    async fn release(
        &self,
        tenant: &TenantId,
        feature: Feature,
        kind: OperationKind,
        count: i64,
    ) -> Result<(), TierError>;
}
