use serde::{Deserialize, Serialize};

use taggate_core::{Feature, OperationKind, TenantId};

/// Per-operation ceilings for one `(tenant, feature)` pair, used when
/// provisioning or updating a subscription.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TierLimits {
    pub create_limit: i64,
    pub update_limit: i64,
    pub delete_limit: i64,
}

impl TierLimits {
    /// Uniform ceiling across all three operation kinds.
    #[must_use]
    pub fn uniform(limit: i64) -> Self {
        Self {
            create_limit: limit,
            update_limit: limit,
            delete_limit: limit,
        }
    }
}

/// One tier usage row: usage and limit counters per operation kind.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TierLimitRow {
    pub tenant: TenantId,
    pub feature: Feature,
    pub create_usage: i64,
    pub create_limit: i64,
    pub update_usage: i64,
    pub update_limit: i64,
    pub delete_usage: i64,
    pub delete_limit: i64,
}

impl TierLimitRow {
    /// A fresh row with zero usage and the given limits.
    #[must_use]
    pub fn fresh(tenant: impl Into<TenantId>, feature: Feature, limits: &TierLimits) -> Self {
        Self {
            tenant: tenant.into(),
            feature,
            create_usage: 0,
            create_limit: limits.create_limit,
            update_usage: 0,
            update_limit: limits.update_limit,
            delete_usage: 0,
            delete_limit: limits.delete_limit,
        }
    }

    /// Current usage for the operation kind.
    #[must_use]
    pub fn usage(&self, kind: OperationKind) -> i64 {
        match kind {
            OperationKind::Create => self.create_usage,
            OperationKind::Update => self.update_usage,
            OperationKind::Delete => self.delete_usage,
        }
    }

    /// Configured limit for the operation kind.
    #[must_use]
    pub fn limit(&self, kind: OperationKind) -> i64 {
        match kind {
            OperationKind::Create => self.create_limit,
            OperationKind::Update => self.update_limit,
            OperationKind::Delete => self.delete_limit,
        }
    }

    /// Remaining admissible operations of the given kind.
    #[must_use]
    pub fn available(&self, kind: OperationKind) -> i64 {
        (self.limit(kind) - self.usage(kind)).max(0)
    }

    /// Mutable reference to the usage counter for the operation kind.
    pub(crate) fn usage_mut(&mut self, kind: OperationKind) -> &mut i64 {
        match kind {
            OperationKind::Create => &mut self.create_usage,
            OperationKind::Update => &mut self.update_usage,
            OperationKind::Delete => &mut self.delete_usage,
        }
    }
}
