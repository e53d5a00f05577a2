use std::collections::HashMap;

use async_trait::async_trait;
use serde::Deserialize;

use taggate_core::TenantId;

use crate::error::AuthError;

/// A bearer token for the upstream Google APIs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccessToken(String);

impl AccessToken {
    /// Wrap a raw token string.
    #[must_use]
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// The raw token for use in an `Authorization: Bearer` header.
    #[must_use]
    pub fn secret(&self) -> &str {
        &self.0
    }
}

// Tokens must never end up in logs.
impl std::fmt::Display for AccessToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("[access token]")
    }
}

/// Resolves a tenant's stored Google OAuth access token.
///
/// Read-only: resolution has no side effects, and failures are surfaced
/// before any quota or tier usage is consumed.
#[async_trait]
pub trait AccessTokenProvider: Send + Sync {
    /// Resolve the access token for `tenant`.
    async fn access_token(&self, tenant: &TenantId) -> Result<AccessToken, AuthError>;
}

/// Fixed token map for tests and single-tenant development.
#[derive(Debug, Default)]
pub struct StaticTokenProvider {
    tokens: HashMap<TenantId, AccessToken>,
}

impl StaticTokenProvider {
    /// Create an empty provider.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a token for a tenant.
    #[must_use]
    pub fn with_token(mut self, tenant: impl Into<TenantId>, token: impl Into<String>) -> Self {
        self.tokens
            .insert(tenant.into(), AccessToken::new(token.into()));
        self
    }
}

#[async_trait]
impl AccessTokenProvider for StaticTokenProvider {
    async fn access_token(&self, tenant: &TenantId) -> Result<AccessToken, AuthError> {
        self.tokens
            .get(tenant)
            .cloned()
            .ok_or_else(|| AuthError::MissingCredential(tenant.to_string()))
    }
}

/// Shape of the identity service's token endpoint response.
#[derive(Debug, Deserialize)]
struct TokenEnvelope {
    access_token: String,
}

/// Resolves tokens from the identity service that stores each tenant's
/// Google OAuth grant.
///
/// The dashboard's identity provider exposes
/// `GET {base_url}/tenants/{tenant}/tokens/google`, authenticated with a
/// service key, returning the tenant's current (auto-refreshed) access
/// token.
pub struct HttpTokenProvider {
    http: reqwest::Client,
    base_url: String,
    service_key: String,
}

impl HttpTokenProvider {
    /// Create a provider against the given identity service.
    #[must_use]
    pub fn new(base_url: impl Into<String>, service_key: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.into(),
            service_key: service_key.into(),
        }
    }
}

#[async_trait]
impl AccessTokenProvider for HttpTokenProvider {
    async fn access_token(&self, tenant: &TenantId) -> Result<AccessToken, AuthError> {
        let url = format!(
            "{}/tenants/{}/tokens/google",
            self.base_url.trim_end_matches('/'),
            tenant
        );

        let response = self
            .http
            .get(&url)
            .bearer_auth(&self.service_key)
            .send()
            .await
            .map_err(|e| AuthError::RefreshFailed(e.to_string()))?;

        match response.status().as_u16() {
            200 => {
                let envelope: TokenEnvelope = response
                    .json()
                    .await
                    .map_err(|e| AuthError::RefreshFailed(e.to_string()))?;
                Ok(AccessToken::new(envelope.access_token))
            }
            401 | 404 => Err(AuthError::MissingCredential(tenant.to_string())),
            status => Err(AuthError::RefreshFailed(format!(
                "identity service returned {status}"
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn static_provider_resolves_registered_tenant() {
        let provider = StaticTokenProvider::new().with_token("tenant-1", "ya29.secret");
        let token = provider
            .access_token(&TenantId::from("tenant-1"))
            .await
            .unwrap();
        assert_eq!(token.secret(), "ya29.secret");
    }

    #[tokio::test]
    async fn static_provider_fails_unknown_tenant() {
        let provider = StaticTokenProvider::new();
        let err = provider
            .access_token(&TenantId::from("nobody"))
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::MissingCredential(_)));
    }

    #[test]
    fn token_display_never_leaks_secret() {
        let token = AccessToken::new("ya29.super-secret");
        assert_eq!(token.to_string(), "[access token]");
        assert_eq!(token.secret(), "ya29.super-secret");
    }
}
