use serde::{Deserialize, Serialize};

/// The upstream Google API family a feature belongs to.
///
/// Each family has an independent per-user quota upstream, so rate limiting
/// and caching are keyed per family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApiFamily {
    /// Google Tag Manager API v2.
    Gtm,
    /// Google Analytics Admin API v1beta.
    Ga4,
}

impl ApiFamily {
    /// Return a string representation of the family.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Gtm => "gtm",
            Self::Ga4 => "ga4",
        }
    }

    /// Parse a family from its wire name.
    #[must_use]
    pub fn from_wire(s: &str) -> Option<Self> {
        match s {
            "gtm" => Some(Self::Gtm),
            "ga4" => Some(Self::Ga4),
            _ => None,
        }
    }
}

impl std::fmt::Display for ApiFamily {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A resource family with its own tier usage counters.
///
/// The wire names (`GTMAccounts`, `GA4Properties`, ...) are the identifiers
/// the subscription tier rows and the web tier use; they are stable and must
/// not change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Feature {
    #[serde(rename = "GTMAccounts")]
    GtmAccounts,
    #[serde(rename = "GTMContainers")]
    GtmContainers,
    #[serde(rename = "GTMWorkspaces")]
    GtmWorkspaces,
    #[serde(rename = "GTMTags")]
    GtmTags,
    #[serde(rename = "GTMTriggers")]
    GtmTriggers,
    #[serde(rename = "GTMVariables")]
    GtmVariables,
    #[serde(rename = "GTMVersions")]
    GtmVersions,
    #[serde(rename = "GTMEnvironments")]
    GtmEnvironments,
    #[serde(rename = "GA4Accounts")]
    Ga4Accounts,
    #[serde(rename = "GA4Properties")]
    Ga4Properties,
    #[serde(rename = "GA4CustomDimensions")]
    Ga4CustomDimensions,
    #[serde(rename = "GA4CustomMetrics")]
    Ga4CustomMetrics,
    #[serde(rename = "GA4Streams")]
    Ga4Streams,
    #[serde(rename = "GA4AccessBindings")]
    Ga4AccessBindings,
}

impl Feature {
    /// All known features, in declaration order.
    pub const ALL: [Self; 14] = [
        Self::GtmAccounts,
        Self::GtmContainers,
        Self::GtmWorkspaces,
        Self::GtmTags,
        Self::GtmTriggers,
        Self::GtmVariables,
        Self::GtmVersions,
        Self::GtmEnvironments,
        Self::Ga4Accounts,
        Self::Ga4Properties,
        Self::Ga4CustomDimensions,
        Self::Ga4CustomMetrics,
        Self::Ga4Streams,
        Self::Ga4AccessBindings,
    ];

    /// Return the stable wire name of the feature.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::GtmAccounts => "GTMAccounts",
            Self::GtmContainers => "GTMContainers",
            Self::GtmWorkspaces => "GTMWorkspaces",
            Self::GtmTags => "GTMTags",
            Self::GtmTriggers => "GTMTriggers",
            Self::GtmVariables => "GTMVariables",
            Self::GtmVersions => "GTMVersions",
            Self::GtmEnvironments => "GTMEnvironments",
            Self::Ga4Accounts => "GA4Accounts",
            Self::Ga4Properties => "GA4Properties",
            Self::Ga4CustomDimensions => "GA4CustomDimensions",
            Self::Ga4CustomMetrics => "GA4CustomMetrics",
            Self::Ga4Streams => "GA4Streams",
            Self::Ga4AccessBindings => "GA4AccessBindings",
        }
    }

    /// Parse a feature from its wire name.
    #[must_use]
    pub fn from_wire(s: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|f| f.as_str() == s)
    }

    /// The upstream API family this feature is served by.
    #[must_use]
    pub fn family(self) -> ApiFamily {
        match self {
            Self::GtmAccounts
            | Self::GtmContainers
            | Self::GtmWorkspaces
            | Self::GtmTags
            | Self::GtmTriggers
            | Self::GtmVariables
            | Self::GtmVersions
            | Self::GtmEnvironments => ApiFamily::Gtm,
            Self::Ga4Accounts
            | Self::Ga4Properties
            | Self::Ga4CustomDimensions
            | Self::Ga4CustomMetrics
            | Self::Ga4Streams
            | Self::Ga4AccessBindings => ApiFamily::Ga4,
        }
    }

    /// The upstream collection segment for this feature (the last path
    /// segment of its REST collection, e.g. `tags` in
    /// `.../workspaces/1/tags`).
    #[must_use]
    pub fn collection(self) -> &'static str {
        match self {
            Self::GtmAccounts | Self::Ga4Accounts => "accounts",
            Self::GtmContainers => "containers",
            Self::GtmWorkspaces => "workspaces",
            Self::GtmTags => "tags",
            Self::GtmTriggers => "triggers",
            Self::GtmVariables => "variables",
            Self::GtmVersions => "versions",
            Self::GtmEnvironments => "environments",
            Self::Ga4Properties => "properties",
            Self::Ga4CustomDimensions => "customDimensions",
            Self::Ga4CustomMetrics => "customMetrics",
            Self::Ga4Streams => "dataStreams",
            Self::Ga4AccessBindings => "accessBindings",
        }
    }
}

impl std::fmt::Display for Feature {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The kind of mutating operation a batch performs.
///
/// List/read operations exist on the gateway but never consume tier usage,
/// so they are not represented here.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OperationKind {
    Create,
    Update,
    Delete,
}

impl OperationKind {
    /// Return a string representation of the operation kind.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Create => "create",
            Self::Update => "update",
            Self::Delete => "delete",
        }
    }

    /// Parse an operation kind from its wire name.
    #[must_use]
    pub fn from_wire(s: &str) -> Option<Self> {
        match s {
            "create" => Some(Self::Create),
            "update" => Some(Self::Update),
            "delete" => Some(Self::Delete),
            _ => None,
        }
    }
}

impl std::fmt::Display for OperationKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
