use thiserror::Error;

use taggate_cache::CacheError;
use taggate_limiter::RateLimitError;
use taggate_provider::AuthError;
use taggate_tiers::TierError;

/// Errors surfaced by gateway construction and the read (list) path.
///
/// The batch dispatch path never returns these: it encodes every failure
/// into the `FeatureResponse` instead, so the web tier always has per-item
/// results to render.
#[derive(Debug, Error)]
pub enum GatewayError {
    /// The gateway was assembled with an invalid or incomplete
    /// configuration.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// The tenant's OAuth token could not be resolved.
    #[error(transparent)]
    Auth(#[from] AuthError),

    /// Rate limit capacity was not granted in time.
    #[error(transparent)]
    RateLimit(#[from] RateLimitError),

    /// Tier admission failed.
    #[error(transparent)]
    Tier(#[from] TierError),

    /// The cache layer failed.
    #[error(transparent)]
    Cache(#[from] CacheError),

    /// The upstream call failed after the executor gave up.
    #[error("upstream error: {0}")]
    Upstream(String),
}
