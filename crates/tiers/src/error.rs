use thiserror::Error;

/// Errors from tier limit admission and accounting.
#[derive(Debug, Error)]
pub enum TierError {
    /// The tenant has no tier row for the feature — no active subscription
    /// covers it.
    #[error("no subscription covers {feature} for tenant {tenant}")]
    NoSubscription { tenant: String, feature: String },

    /// Admitting the batch would exceed the tenant's limit. Nothing was
    /// reserved.
    #[error("tier limit reached: requested {requested}, available {available}")]
    LimitReached { requested: i64, available: i64 },

    /// The backing store failed.
    #[error("tier store error: {0}")]
    Backend(String),
}
