//! Route-level tests for the Taggate server, driven through `axum-test`
//! with in-memory backends and a scripted upstream client.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use axum_test::TestServer;

use taggate_core::{ApiFamily, Feature, TenantId};
use taggate_executor::{ExecutorConfig, RetryStrategy};
use taggate_gateway::GatewayBuilder;
use taggate_provider::{
    AccessToken, DynUpstreamClient, StaticTokenProvider, UpstreamError, UpstreamRequest,
    UpstreamResource,
};
use taggate_server::api::{AppState, router};
use taggate_server::auth::AuthKeys;
use taggate_state_memory::MemoryStateStore;
use taggate_tiers::{MemoryTierStore, TierLimits, TierStore};

/// Upstream fake that always succeeds and lists two accounts.
struct HappyClient;

#[async_trait]
impl DynUpstreamClient for HappyClient {
    fn name(&self) -> &str {
        "happy"
    }

    async fn execute(
        &self,
        request: &UpstreamRequest,
        _token: &AccessToken,
    ) -> Result<UpstreamResource, UpstreamError> {
        let name = request
            .payload
            .get("name")
            .and_then(serde_json::Value::as_str)
            .unwrap_or("applied");
        Ok(UpstreamResource::from_body(serde_json::json!({
            "path": request.entity_path,
            "name": name,
        })))
    }

    async fn list(
        &self,
        _feature: Feature,
        _parent: Option<&str>,
        _token: &AccessToken,
    ) -> Result<Vec<UpstreamResource>, UpstreamError> {
        Ok(vec![
            UpstreamResource::from_body(serde_json::json!({"path": "accounts/1", "name": "Main"})),
            UpstreamResource::from_body(serde_json::json!({"path": "accounts/2", "name": "Spare"})),
        ])
    }
}

async fn test_server() -> TestServer {
    let tiers = Arc::new(MemoryTierStore::new());
    for feature in Feature::ALL {
        tiers
            .upsert_limits(&TenantId::from("tenant-1"), feature, &TierLimits::uniform(10))
            .await
            .unwrap();
    }

    let executor = ExecutorConfig {
        retry_strategy: RetryStrategy::Constant {
            delay: std::time::Duration::from_millis(1),
        },
        min_dispatch_interval: std::time::Duration::ZERO,
        ..ExecutorConfig::default()
    };

    let gateway = GatewayBuilder::new()
        .state(Arc::new(MemoryStateStore::new()))
        .tiers(tiers as Arc<dyn TierStore>)
        .tokens(Arc::new(
            StaticTokenProvider::new()
                .with_token("tenant-1", "ya29.one")
                .with_token("tenant-2", "ya29.two"),
        ))
        .client(ApiFamily::Gtm, Arc::new(HappyClient) as Arc<dyn DynUpstreamClient>)
        .client(ApiFamily::Ga4, Arc::new(HappyClient) as Arc<dyn DynUpstreamClient>)
        .executor_config(executor)
        .build()
        .unwrap();

    let mut keys = HashMap::new();
    keys.insert("sk_live_one".to_owned(), "tenant-1".to_owned());
    keys.insert("sk_live_two".to_owned(), "tenant-2".to_owned());

    let state = AppState {
        gateway: Arc::new(gateway),
        keys: Arc::new(AuthKeys::new(&keys)),
    };

    TestServer::new(router(state)).expect("router should build")
}

fn update_body() -> serde_json::Value {
    serde_json::json!({
        "forms": [
            {"entity_path": "accounts/1/containers/2", "payload": {"name": "Renamed"}}
        ]
    })
}

#[tokio::test]
async fn health_is_public() {
    let server = test_server().await;
    let response = server.get("/health").await;
    response.assert_status_ok();
    response.assert_json(&serde_json::json!({"status": "ok"}));
}

#[tokio::test]
async fn requests_without_bearer_key_are_rejected() {
    let server = test_server().await;
    let response = server
        .post("/api/gtm/GTMContainers/update")
        .json(&update_body())
        .await;
    assert_eq!(response.status_code(), 401);
}

#[tokio::test]
async fn unknown_feature_is_not_found() {
    let server = test_server().await;
    let response = server
        .post("/api/gtm/UAProperties/update")
        .authorization_bearer("sk_live_one")
        .json(&update_body())
        .await;
    assert_eq!(response.status_code(), 404);
}

#[tokio::test]
async fn feature_family_mismatch_is_rejected() {
    let server = test_server().await;
    let response = server
        .post("/api/gtm/GA4Properties/update")
        .authorization_bearer("sk_live_one")
        .json(&update_body())
        .await;
    assert_eq!(response.status_code(), 400);
}

#[tokio::test]
async fn dispatch_returns_structured_response() {
    let server = test_server().await;
    let response = server
        .post("/api/gtm/GTMContainers/update")
        .authorization_bearer("sk_live_one")
        .json(&update_body())
        .await;

    response.assert_status_ok();
    let body: serde_json::Value = response.json();
    assert_eq!(body["success"], serde_json::json!(true));
    assert_eq!(body["results"].as_array().unwrap().len(), 1);
    assert_eq!(body["results"][0]["success"], serde_json::json!(true));
}

#[tokio::test]
async fn dispatch_without_subscription_reports_failure_in_band() {
    let server = test_server().await;
    // tenant-2 has a token and a key but no tier rows.
    let response = server
        .post("/api/gtm/GTMContainers/update")
        .authorization_bearer("sk_live_two")
        .json(&update_body())
        .await;

    response.assert_status_ok();
    let body: serde_json::Value = response.json();
    assert_eq!(body["success"], serde_json::json!(false));
    assert!(
        body["message"]
            .as_str()
            .unwrap()
            .contains("no subscription")
    );
    assert_eq!(body["results"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn list_returns_cached_items() {
    let server = test_server().await;

    let response = server
        .get("/api/gtm/GTMAccounts")
        .authorization_bearer("sk_live_one")
        .await;
    response.assert_status_ok();
    let body: serde_json::Value = response.json();
    assert_eq!(body["items"].as_array().unwrap().len(), 2);

    // Served again (from cache) without error.
    let response = server
        .get("/api/gtm/GTMAccounts")
        .authorization_bearer("sk_live_one")
        .await;
    response.assert_status_ok();
}
