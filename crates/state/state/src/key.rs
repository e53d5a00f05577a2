use serde::{Deserialize, Serialize};

use taggate_core::{ApiFamily, TenantId};

/// The kind of state being stored.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KeyKind {
    /// Rate limiter window counter.
    RateLimit,
    /// Cached upstream resources for one feature (hash of id -> JSON).
    Cache,
    Custom(String),
}

impl KeyKind {
    /// Return a string representation of the key kind.
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::RateLimit => "rate_limit",
            Self::Cache => "cache",
            Self::Custom(s) => s.as_str(),
        }
    }
}

impl std::fmt::Display for KeyKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Key used to address state entries in the store.
///
/// Keys are scoped per upstream API family and per tenant, since quotas and
/// caches are independent along both axes.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct StateKey {
    pub family: ApiFamily,
    pub tenant: TenantId,
    pub kind: KeyKind,
    pub id: String,
}

impl StateKey {
    /// Create a new state key.
    #[must_use]
    pub fn new(
        family: ApiFamily,
        tenant: impl Into<TenantId>,
        kind: KeyKind,
        id: impl Into<String>,
    ) -> Self {
        Self {
            family,
            tenant: tenant.into(),
            kind,
            id: id.into(),
        }
    }

    /// Return a canonical string representation: `family:tenant:kind:id`
    #[must_use]
    pub fn canonical(&self) -> String {
        format!("{}:{}:{}:{}", self.family, self.tenant, self.kind, self.id)
    }
}

impl std::fmt::Display for StateKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.canonical())
    }
}
