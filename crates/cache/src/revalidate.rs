use async_trait::async_trait;

/// Hook fired after a cache mutation so the web tier can refresh its own
/// route cache.
///
/// The dashboard front-end caches rendered routes; patching the resource
/// cache alone would leave those routes serving stale lists until their own
/// expiry. Implementations are expected to be fire-and-forget: failures are
/// logged by the implementation, never propagated into the mutation path.
#[async_trait]
pub trait RouteRevalidator: Send + Sync {
    /// Request revalidation of the given route path.
    async fn revalidate(&self, path: &str);
}

/// Revalidator that does nothing. Default for deployments where the web
/// tier handles its own cache expiry.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopRevalidator;

#[async_trait]
impl RouteRevalidator for NoopRevalidator {
    async fn revalidate(&self, _path: &str) {}
}
