use reqwest::Method;
use tracing::debug;

use taggate_core::{ApiFamily, Feature, OperationKind};

use crate::client::UpstreamClient;
use crate::error::UpstreamError;
use crate::request::{UpstreamRequest, UpstreamResource};
use crate::token::AccessToken;

/// Default base URL for the Tag Manager API v2.
const GTM_BASE_URL: &str = "https://www.googleapis.com/tagmanager/v2";

/// Default base URL for the Google Analytics Admin API v1beta.
const GA4_BASE_URL: &str = "https://analyticsadmin.googleapis.com/v1beta";

/// HTTP client for one Google API family.
///
/// Performs exactly one HTTP call per method invocation and maps the
/// upstream status codes onto the [`UpstreamError`] taxonomy; retry,
/// throttling, and quota accounting all happen in the layers above.
pub struct GoogleApiClient {
    http: reqwest::Client,
    family: ApiFamily,
    base_url: String,
}

impl GoogleApiClient {
    /// Create a client for `family` against the production endpoint.
    #[must_use]
    pub fn new(family: ApiFamily) -> Self {
        let base_url = match family {
            ApiFamily::Gtm => GTM_BASE_URL,
            ApiFamily::Ga4 => GA4_BASE_URL,
        };
        Self {
            http: reqwest::Client::new(),
            family,
            base_url: base_url.to_owned(),
        }
    }

    /// Override the base URL (tests, staging endpoints).
    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Compute the HTTP method and URL for a mutation.
    ///
    /// Creates POST into the parent's collection; updates are `PUT` on GTM
    /// and `PATCH` (with a full update mask) on GA4 Admin; deletes are
    /// `DELETE` on the resource path.
    fn build_mutation(&self, request: &UpstreamRequest) -> (Method, String) {
        let base = self.base_url.trim_end_matches('/');
        match request.operation {
            OperationKind::Create => {
                let collection = request.feature.collection();
                let url = if request.entity_path.is_empty() {
                    format!("{base}/{collection}")
                } else {
                    format!("{base}/{}/{collection}", request.entity_path)
                };
                (Method::POST, url)
            }
            OperationKind::Update => {
                let url = format!("{base}/{}", request.entity_path);
                match self.family {
                    ApiFamily::Gtm => (Method::PUT, url),
                    ApiFamily::Ga4 => (Method::PATCH, format!("{url}?updateMask=*")),
                }
            }
            OperationKind::Delete => {
                (Method::DELETE, format!("{base}/{}", request.entity_path))
            }
        }
    }

    /// Compute the URL for a list call.
    fn build_list(&self, feature: Feature, parent: Option<&str>) -> String {
        let base = self.base_url.trim_end_matches('/');
        let collection = feature.collection();
        match parent {
            Some(p) => format!("{base}/{p}/{collection}"),
            None => format!("{base}/{collection}"),
        }
    }

    /// Run one HTTP call and map the response.
    async fn send(
        &self,
        method: Method,
        url: String,
        payload: Option<&serde_json::Value>,
        token: &AccessToken,
        entity_path: &str,
    ) -> Result<serde_json::Value, UpstreamError> {
        let mut builder = self
            .http
            .request(method, &url)
            .bearer_auth(token.secret());
        if let Some(body) = payload {
            builder = builder.json(body);
        }

        let response = builder
            .send()
            .await
            .map_err(|e| UpstreamError::Transport(e.to_string()))?;

        let status = response.status().as_u16();
        let text = response
            .text()
            .await
            .map_err(|e| UpstreamError::Transport(e.to_string()))?;

        if (200..300).contains(&status) {
            if text.is_empty() {
                return Ok(serde_json::Value::Null);
            }
            serde_json::from_str(&text).map_err(|e| UpstreamError::Serialization(e.to_string()))
        } else {
            Err(classify_error(status, &text, entity_path))
        }
    }
}

impl UpstreamClient for GoogleApiClient {
    fn name(&self) -> &str {
        match self.family {
            ApiFamily::Gtm => "google-tagmanager-v2",
            ApiFamily::Ga4 => "google-analytics-admin-v1beta",
        }
    }

    async fn execute(
        &self,
        request: &UpstreamRequest,
        token: &AccessToken,
    ) -> Result<UpstreamResource, UpstreamError> {
        let (method, url) = self.build_mutation(request);
        debug!(client = self.name(), %method, %url, "executing upstream mutation");

        let payload = match request.operation {
            OperationKind::Delete => None,
            OperationKind::Create | OperationKind::Update => Some(&request.payload),
        };

        let body = self
            .send(method, url, payload, token, &request.entity_path)
            .await?;

        if body.is_null() {
            // DELETE returns an empty body; report identity from the path.
            let id = request
                .entity_path
                .rsplit('/')
                .next()
                .unwrap_or_default()
                .to_owned();
            Ok(UpstreamResource {
                name: request.entity_path.clone(),
                id,
                body,
            })
        } else {
            Ok(UpstreamResource::from_body(body))
        }
    }

    async fn list(
        &self,
        feature: Feature,
        parent: Option<&str>,
        token: &AccessToken,
    ) -> Result<Vec<UpstreamResource>, UpstreamError> {
        let url = self.build_list(feature, parent);
        debug!(client = self.name(), %url, "listing upstream resources");

        let body = self
            .send(Method::GET, url, None, token, parent.unwrap_or_default())
            .await?;

        Ok(parse_list_body(&body))
    }
}

/// Map an upstream error status + body onto the error taxonomy.
///
/// 429 is the per-user quota signal (retryable). A 403 carrying a
/// `limitExceeded` reason is the API reporting a plan limit for the resource
/// family; a 403 carrying `rateLimitExceeded`/`quotaExceeded` is quota
/// phrased differently by some endpoints. 404 means the resource is gone.
fn classify_error(status: u16, body: &str, entity_path: &str) -> UpstreamError {
    let reason = error_reason(body);

    match status {
        429 => UpstreamError::QuotaExhausted,
        404 => UpstreamError::NotFound(entity_path.to_owned()),
        403 if reason.as_deref() == Some("limitExceeded") => {
            UpstreamError::FeatureLimit(entity_path.to_owned())
        }
        403 if matches!(
            reason.as_deref(),
            Some("rateLimitExceeded" | "quotaExceeded" | "userRateLimitExceeded")
        ) =>
        {
            UpstreamError::QuotaExhausted
        }
        _ => UpstreamError::Http {
            status,
            message: error_message(body),
        },
    }
}

/// Extract the first `reason` from a Google error body.
fn error_reason(body: &str) -> Option<String> {
    let value: serde_json::Value = serde_json::from_str(body).ok()?;
    value
        .get("error")?
        .get("errors")?
        .get(0)?
        .get("reason")?
        .as_str()
        .map(str::to_owned)
}

/// Extract the error message from a Google error body, falling back to the
/// raw text.
fn error_message(body: &str) -> String {
    serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|v| {
            v.get("error")?
                .get("message")?
                .as_str()
                .map(str::to_owned)
        })
        .unwrap_or_else(|| body.to_owned())
}

/// Pull the resource array out of a list response.
///
/// List bodies wrap the items in a single field named after the collection
/// (`{"container": [...]}`, `{"customDimensions": [...]}`); the field name
/// varies per feature, so take the first array-valued field.
fn parse_list_body(body: &serde_json::Value) -> Vec<UpstreamResource> {
    let Some(object) = body.as_object() else {
        return Vec::new();
    };

    object
        .values()
        .find_map(serde_json::Value::as_array)
        .map(|items| {
            items
                .iter()
                .cloned()
                .map(UpstreamResource::from_body)
                .collect()
        })
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client(family: ApiFamily) -> GoogleApiClient {
        GoogleApiClient::new(family)
    }

    fn request(
        feature: Feature,
        operation: OperationKind,
        entity_path: &str,
    ) -> UpstreamRequest {
        UpstreamRequest {
            feature,
            operation,
            entity_path: entity_path.into(),
            payload: serde_json::json!({}),
        }
    }

    #[test]
    fn gtm_update_is_put_on_resource_path() {
        let (method, url) = client(ApiFamily::Gtm).build_mutation(&request(
            Feature::GtmContainers,
            OperationKind::Update,
            "accounts/1/containers/2",
        ));
        assert_eq!(method, Method::PUT);
        assert_eq!(
            url,
            "https://www.googleapis.com/tagmanager/v2/accounts/1/containers/2"
        );
    }

    #[test]
    fn ga4_update_is_patch_with_mask() {
        let (method, url) = client(ApiFamily::Ga4).build_mutation(&request(
            Feature::Ga4CustomDimensions,
            OperationKind::Update,
            "properties/9/customDimensions/3",
        ));
        assert_eq!(method, Method::PATCH);
        assert!(url.ends_with("properties/9/customDimensions/3?updateMask=*"));
    }

    #[test]
    fn create_posts_into_parent_collection() {
        let (method, url) = client(ApiFamily::Gtm).build_mutation(&request(
            Feature::GtmWorkspaces,
            OperationKind::Create,
            "accounts/1/containers/2",
        ));
        assert_eq!(method, Method::POST);
        assert!(url.ends_with("accounts/1/containers/2/workspaces"));
    }

    #[test]
    fn rootless_create_posts_into_collection() {
        let (method, url) = client(ApiFamily::Ga4).build_mutation(&request(
            Feature::Ga4Properties,
            OperationKind::Create,
            "",
        ));
        assert_eq!(method, Method::POST);
        assert_eq!(
            url,
            "https://analyticsadmin.googleapis.com/v1beta/properties"
        );
    }

    #[test]
    fn list_url_with_and_without_parent() {
        let c = client(ApiFamily::Gtm);
        assert!(
            c.build_list(Feature::GtmTags, Some("accounts/1/containers/2/workspaces/3"))
                .ends_with("accounts/1/containers/2/workspaces/3/tags")
        );
        assert!(c.build_list(Feature::GtmAccounts, None).ends_with("v2/accounts"));
    }

    #[test]
    fn classify_429_as_quota() {
        let err = classify_error(429, "", "accounts/1");
        assert!(err.is_retryable());
    }

    #[test]
    fn classify_404_as_not_found() {
        let err = classify_error(404, "{}", "accounts/1/containers/9");
        assert!(err.is_not_found());
    }

    #[test]
    fn classify_403_limit_exceeded_as_feature_limit() {
        let body = r#"{"error":{"code":403,"message":"Limit reached","errors":[{"reason":"limitExceeded"}]}}"#;
        let err = classify_error(403, body, "accounts/1");
        assert!(err.is_feature_limit());
    }

    #[test]
    fn classify_403_rate_limit_as_quota() {
        let body = r#"{"error":{"code":403,"message":"Rate limited","errors":[{"reason":"userRateLimitExceeded"}]}}"#;
        let err = classify_error(403, body, "accounts/1");
        assert!(err.is_retryable());
    }

    #[test]
    fn classify_other_403_as_http() {
        let body = r#"{"error":{"code":403,"message":"forbidden","errors":[{"reason":"insufficientPermissions"}]}}"#;
        let err = classify_error(403, body, "accounts/1");
        match err {
            UpstreamError::Http { status, message } => {
                assert_eq!(status, 403);
                assert_eq!(message, "forbidden");
            }
            other => panic!("expected Http, got {other:?}"),
        }
    }

    #[test]
    fn parse_list_extracts_wrapped_array() {
        let body = serde_json::json!({
            "container": [
                {"path": "accounts/1/containers/2", "name": "Site"},
                {"path": "accounts/1/containers/3", "name": "App"},
            ]
        });
        let resources = parse_list_body(&body);
        assert_eq!(resources.len(), 2);
        assert_eq!(resources[0].id, "2");
        assert_eq!(resources[1].name, "App");
    }

    #[test]
    fn parse_list_empty_body() {
        assert!(parse_list_body(&serde_json::json!({})).is_empty());
        assert!(parse_list_body(&serde_json::Value::Null).is_empty());
    }
}
