use async_trait::async_trait;

use taggate_core::Feature;

use crate::error::UpstreamError;
use crate::request::{UpstreamRequest, UpstreamResource};
use crate::token::AccessToken;

/// Strongly-typed upstream client trait with native `async fn`.
///
/// This trait is **not** object-safe because it uses native `async fn`
/// methods (which desugar to opaque `impl Future` return types). If you need
/// dynamic dispatch, use [`DynUpstreamClient`] instead -- every
/// `UpstreamClient` automatically implements `DynUpstreamClient` via a
/// blanket implementation.
///
/// Each method performs exactly one outbound HTTP call; retries and
/// throttling are the executor's business, not the client's.
pub trait UpstreamClient: Send + Sync {
    /// Returns the name of this client (for logs).
    fn name(&self) -> &str;

    /// Apply one mutation and return the affected resource.
    fn execute(
        &self,
        request: &UpstreamRequest,
        token: &AccessToken,
    ) -> impl std::future::Future<Output = Result<UpstreamResource, UpstreamError>> + Send;

    /// List all resources of `feature` under `parent` (or at the API root
    /// when `parent` is `None`, e.g. for accounts).
    fn list(
        &self,
        feature: Feature,
        parent: Option<&str>,
        token: &AccessToken,
    ) -> impl std::future::Future<Output = Result<Vec<UpstreamResource>, UpstreamError>> + Send;
}

/// Object-safe upstream client trait for use behind `Arc<dyn DynUpstreamClient>`.
///
/// Uses [`macro@async_trait`] to enable dynamic dispatch of async methods.
/// You generally should not implement this trait directly -- instead
/// implement [`UpstreamClient`] and rely on the blanket implementation.
#[async_trait]
pub trait DynUpstreamClient: Send + Sync {
    /// Returns the name of this client (for logs).
    fn name(&self) -> &str;

    /// Apply one mutation and return the affected resource.
    async fn execute(
        &self,
        request: &UpstreamRequest,
        token: &AccessToken,
    ) -> Result<UpstreamResource, UpstreamError>;

    /// List all resources of `feature` under `parent`.
    async fn list(
        &self,
        feature: Feature,
        parent: Option<&str>,
        token: &AccessToken,
    ) -> Result<Vec<UpstreamResource>, UpstreamError>;
}

/// Blanket implementation: any type that implements [`UpstreamClient`] also
/// implements [`DynUpstreamClient`], bridging the static and dynamic
/// dispatch worlds.
#[async_trait]
impl<T: UpstreamClient + Sync> DynUpstreamClient for T {
    fn name(&self) -> &str {
        UpstreamClient::name(self)
    }

    async fn execute(
        &self,
        request: &UpstreamRequest,
        token: &AccessToken,
    ) -> Result<UpstreamResource, UpstreamError> {
        UpstreamClient::execute(self, request, token).await
    }

    async fn list(
        &self,
        feature: Feature,
        parent: Option<&str>,
        token: &AccessToken,
    ) -> Result<Vec<UpstreamResource>, UpstreamError> {
        UpstreamClient::list(self, feature, parent, token).await
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use taggate_core::OperationKind;

    use super::*;

    /// A mock client for testing the trait and blanket impl.
    struct MockClient {
        client_name: String,
        should_fail: bool,
    }

    impl UpstreamClient for MockClient {
        fn name(&self) -> &str {
            &self.client_name
        }

        async fn execute(
            &self,
            request: &UpstreamRequest,
            _token: &AccessToken,
        ) -> Result<UpstreamResource, UpstreamError> {
            if self.should_fail {
                return Err(UpstreamError::NotFound(request.entity_path.clone()));
            }
            Ok(UpstreamResource::from_body(serde_json::json!({
                "path": request.entity_path,
                "name": "mock",
            })))
        }

        async fn list(
            &self,
            _feature: Feature,
            _parent: Option<&str>,
            _token: &AccessToken,
        ) -> Result<Vec<UpstreamResource>, UpstreamError> {
            Ok(Vec::new())
        }
    }

    fn test_request() -> UpstreamRequest {
        UpstreamRequest {
            feature: Feature::GtmContainers,
            operation: OperationKind::Update,
            entity_path: "accounts/1/containers/2".into(),
            payload: serde_json::Value::Null,
        }
    }

    #[tokio::test]
    async fn blanket_dyn_client_impl() {
        let client: Arc<dyn DynUpstreamClient> = Arc::new(MockClient {
            client_name: "dyn-test".into(),
            should_fail: false,
        });
        assert_eq!(client.name(), "dyn-test");

        let resource = client
            .execute(&test_request(), &AccessToken::new("t"))
            .await
            .unwrap();
        assert_eq!(resource.id, "2");
    }

    #[tokio::test]
    async fn dyn_client_propagates_errors() {
        let client: Arc<dyn DynUpstreamClient> = Arc::new(MockClient {
            client_name: "failing".into(),
            should_fail: true,
        });
        let err = client
            .execute(&test_request(), &AccessToken::new("t"))
            .await
            .unwrap_err();
        assert!(err.is_not_found());
    }
}
