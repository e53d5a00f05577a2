use thiserror::Error;

/// Errors resolving a tenant's upstream OAuth credential.
///
/// Both variants are fatal for the whole batch: no quota is consumed and
/// nothing is dispatched upstream.
#[derive(Debug, Error)]
pub enum AuthError {
    /// No Google credential is stored for the tenant.
    #[error("no stored credential for tenant {0}")]
    MissingCredential(String),

    /// The identity service failed to mint or refresh a token.
    #[error("token refresh failed: {0}")]
    RefreshFailed(String),
}

/// Errors from one upstream Google API call.
#[derive(Debug, Error)]
pub enum UpstreamError {
    /// The upstream rejected the call with HTTP 429 (per-user quota).
    ///
    /// This is the only retryable category: the request itself is fine, the
    /// quota window is just momentarily full.
    #[error("upstream quota exceeded")]
    QuotaExhausted,

    /// The target resource does not exist upstream (deleted externally).
    #[error("resource not found: {0}")]
    NotFound(String),

    /// The upstream plan limit for this resource family is reached
    /// (e.g. container count per account). Reported by the API itself,
    /// distinct from the local subscription tier gate.
    #[error("upstream feature limit reached: {0}")]
    FeatureLimit(String),

    /// Any other upstream HTTP error status.
    #[error("upstream returned {status}: {message}")]
    Http { status: u16, message: String },

    /// A network or transport-level error occurred.
    #[error("transport error: {0}")]
    Transport(String),

    /// The response body could not be decoded.
    #[error("serialization error: {0}")]
    Serialization(String),
}

impl UpstreamError {
    /// Returns `true` if the error may clear on retry.
    ///
    /// Only the quota signal qualifies; everything else either describes a
    /// bad request or a state retrying cannot fix.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::QuotaExhausted)
    }

    /// Returns `true` when the upstream resource was missing.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }

    /// Returns `true` when the upstream reported a plan/feature limit.
    pub fn is_feature_limit(&self) -> bool {
        matches!(self, Self::FeatureLimit(_))
    }
}
