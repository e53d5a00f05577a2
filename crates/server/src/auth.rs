use std::collections::HashMap;
use std::sync::Arc;

use axum::Json;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};

use taggate_core::TenantId;

/// The authenticated caller of a request: the tenant it acts for.
#[derive(Debug, Clone)]
pub struct CallerIdentity {
    pub tenant: TenantId,
}

/// Bearer-key registry resolving API keys to tenants.
#[derive(Debug, Default)]
pub struct AuthKeys {
    keys: HashMap<String, TenantId>,
}

impl AuthKeys {
    /// Build the registry from the `[auth.keys]` config table.
    #[must_use]
    pub fn new(keys: &HashMap<String, String>) -> Self {
        Self {
            keys: keys
                .iter()
                .map(|(key, tenant)| (key.clone(), TenantId::from(tenant.as_str())))
                .collect(),
        }
    }

    /// Resolve a bearer key to its tenant.
    #[must_use]
    pub fn resolve(&self, key: &str) -> Option<&TenantId> {
        self.keys.get(key)
    }
}

/// Middleware resolving `Authorization: Bearer <key>` to a
/// [`CallerIdentity`] extension.
///
/// Unknown or missing keys are rejected with 401 before any gateway work —
/// and therefore before any quota or tier usage is touched.
pub async fn require_caller(
    axum::extract::State(keys): axum::extract::State<Arc<AuthKeys>>,
    mut request: Request<Body>,
    next: Next,
) -> Response {
    let bearer = request
        .headers()
        .get("authorization")
        .and_then(|header| header.to_str().ok())
        .and_then(|header| header.strip_prefix("Bearer "));

    let Some(tenant) = bearer.and_then(|key| keys.resolve(key)) else {
        return unauthorized();
    };

    request.extensions_mut().insert(CallerIdentity {
        tenant: tenant.clone(),
    });
    next.run(request).await
}

fn unauthorized() -> Response {
    (
        StatusCode::UNAUTHORIZED,
        Json(serde_json::json!({ "error": "missing or unknown bearer key" })),
    )
        .into_response()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolve_known_key() {
        let mut table = HashMap::new();
        table.insert("sk_live_abc".to_owned(), "tenant-1".to_owned());
        let keys = AuthKeys::new(&table);
        assert_eq!(
            keys.resolve("sk_live_abc").map(TenantId::as_str),
            Some("tenant-1")
        );
        assert!(keys.resolve("sk_live_other").is_none());
    }
}
