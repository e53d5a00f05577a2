use std::collections::HashMap;
use std::sync::Arc;

use tracing::{instrument, warn};

use taggate_cache::{CacheOp, CacheRead, ResourceCache};
use taggate_core::{
    ApiFamily, BatchItem, BatchRequest, Feature, FeatureResponse, ItemOutcome, TenantId,
    assemble_response,
};
use taggate_executor::UpstreamExecutor;
use taggate_limiter::ApiRateLimiter;
use taggate_provider::{
    AccessToken, AccessTokenProvider, DynUpstreamClient, UpstreamError, UpstreamRequest,
};
use taggate_tiers::{TierError, TierLimitGate};

use crate::error::GatewayError;

/// The central orchestrator for tier-limited, rate-limited batch mutations
/// against the upstream Google APIs.
///
/// The dispatch pipeline for each batch:
/// 1. Resolve the tenant's OAuth token.
/// 2. Reserve tier usage for the whole batch (atomic admission).
/// 3. Acquire distributed rate-limit capacity, once per batch.
/// 4. Fan items out through the throttled retry executor.
/// 5. Fold the settled outcomes, return unused reservations, patch the
///    resource cache for the items that succeeded.
pub struct Gateway {
    // Note: manual `Debug` impl below because trait objects lack `Debug`.
    pub(crate) tokens: Arc<dyn AccessTokenProvider>,
    pub(crate) gate: TierLimitGate,
    pub(crate) limiter: ApiRateLimiter,
    pub(crate) executor: UpstreamExecutor,
    pub(crate) cache: ResourceCache,
    pub(crate) clients: HashMap<ApiFamily, Arc<dyn DynUpstreamClient>>,
}

impl std::fmt::Debug for Gateway {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Gateway")
            .field("clients", &self.clients.keys().collect::<Vec<_>>())
            .finish_non_exhaustive()
    }
}

impl Gateway {
    /// Dispatch one batch through the full pipeline.
    ///
    /// Never returns an error: every failure mode — missing credential,
    /// tier rejection, rate-limit timeout, per-item upstream faults — is
    /// encoded into the returned [`FeatureResponse`], with one result entry
    /// per submitted form.
    #[instrument(
        skip(self, request),
        fields(
            request.id = %request.request_id,
            tenant = %request.tenant,
            feature = %request.feature,
            operation = %request.operation,
            forms = request.forms.len(),
        )
    )]
    pub async fn dispatch(&self, request: BatchRequest) -> FeatureResponse {
        let feature = request.feature;
        let operation = request.operation;

        if request.forms.is_empty() {
            return assemble_response(feature, operation, &[])
                .with_message("no forms submitted");
        }

        // 1. Authenticate. Fatal before any quota or usage is consumed.
        let token = match self.tokens.access_token(&request.tenant).await {
            Ok(token) => token,
            Err(e) => {
                warn!(error = %e, "batch rejected: no usable credential");
                return failure_response(&request, &format!("authentication failed: {e}"));
            }
        };

        // 2. Admission: reserve tier usage for the whole batch atomically.
        let requested = i64::try_from(request.forms.len()).unwrap_or(i64::MAX);
        let reservation = match self
            .gate
            .reserve(&request.tenant, feature, operation, requested)
            .await
        {
            Ok(reservation) => reservation,
            Err(TierError::LimitReached { .. }) => {
                let outcomes: Vec<ItemOutcome> = request
                    .forms
                    .iter()
                    .map(|form| ItemOutcome::LimitReached {
                        name: form.display_name(),
                    })
                    .collect();
                return assemble_response(feature, operation, &outcomes);
            }
            Err(e) => {
                warn!(error = %e, "batch rejected at tier admission");
                return failure_response(&request, &e.to_string());
            }
        };

        // 3. Rate limit, once per batch. On timeout nothing was dispatched,
        //    so the whole reservation goes back.
        let family = feature.family();
        let timeout = self.limiter.config().acquire_timeout();
        if let Err(e) = self
            .limiter
            .acquire(&request.tenant, family, timeout)
            .await
        {
            self.return_reservation(&reservation, requested).await;
            return failure_response(&request, &e.to_string());
        }

        let Some(client) = self.clients.get(&family) else {
            self.return_reservation(&reservation, requested).await;
            return failure_response(&request, &format!("no upstream client for {family}"));
        };

        // 4. Fan out. Outcomes come back in form order; items are
        //    independent, so one fatal item never cancels its siblings.
        let settled = futures::future::join_all(
            request
                .forms
                .iter()
                .map(|form| self.dispatch_item(client.as_ref(), &token, &request, form)),
        )
        .await;

        let (outcomes, cache_ops): (Vec<ItemOutcome>, Vec<Option<CacheOp>>) =
            settled.into_iter().unzip();

        // 5. Give back the reservations whose items did not succeed, so
        //    usage advances by exactly the success count.
        let succeeded = outcomes.iter().filter(|o| o.is_success()).count();
        let unused = requested - i64::try_from(succeeded).unwrap_or(0);
        self.return_reservation(&reservation, unused).await;

        // 6. Patch the cache for exactly the successful ids, before the
        //    response goes back, so the tenant's next list reads its own
        //    write.
        let ops: Vec<CacheOp> = cache_ops.into_iter().flatten().collect();
        if !ops.is_empty()
            && let Err(e) = self
                .cache
                .soft_revalidate(&request.tenant, feature, &ops)
                .await
        {
            warn!(error = %e, "cache patch failed, evicting collection");
            if let Err(e) = self.cache.evict(&request.tenant, feature).await {
                warn!(error = %e, "cache evict failed; stale entries may persist until TTL");
            }
        }

        // 7. Fold into the structured response.
        assemble_response(feature, operation, &outcomes)
    }

    /// List the tenant's resources for a feature, read-through cached.
    ///
    /// On a cache miss this spends one rate-limited upstream call and
    /// repopulates the collection.
    #[instrument(skip(self), fields(%tenant, %feature))]
    pub async fn list(
        &self,
        tenant: &TenantId,
        feature: Feature,
        parent: Option<&str>,
    ) -> Result<Vec<serde_json::Value>, GatewayError> {
        if let CacheRead::Hit(values) = self.cache.read_through(tenant, feature).await? {
            return Ok(values);
        }

        let token = self.tokens.access_token(tenant).await?;
        let family = feature.family();
        self.limiter
            .acquire(tenant, family, self.limiter.config().acquire_timeout())
            .await?;

        let client = self
            .clients
            .get(&family)
            .ok_or_else(|| GatewayError::Configuration(format!("no upstream client for {family}")))?;

        let label = format!("{feature}:list");
        let resources = self
            .executor
            .run(&label, || client.list(feature, parent, &token))
            .await
            .map_err(|e| GatewayError::Upstream(e.to_string()))?;

        let entries: Vec<(String, serde_json::Value)> = resources
            .into_iter()
            .map(|r| (r.id, r.body))
            .collect();
        self.cache.write_all(tenant, feature, &entries).await?;

        Ok(entries.into_iter().map(|(_, body)| body).collect())
    }

    /// Dispatch one item and classify its outcome.
    ///
    /// Returns the outcome plus the cache patch to apply if the item
    /// succeeded.
    async fn dispatch_item(
        &self,
        client: &dyn DynUpstreamClient,
        token: &AccessToken,
        request: &BatchRequest,
        form: &BatchItem,
    ) -> (ItemOutcome, Option<CacheOp>) {
        let name = form.display_name();

        // Shape validation is local: invalid items never reach the network
        // and never count against tier usage.
        let upstream = match UpstreamRequest::from_item(request.feature, request.operation, form) {
            Ok(upstream) => upstream,
            Err(e) => {
                return (
                    ItemOutcome::Invalid {
                        name,
                        reason: e.to_string(),
                    },
                    None,
                );
            }
        };

        let label = format!("{}:{}:{}", request.feature, request.operation, name);
        let result = self
            .executor
            .run(&label, || client.execute(&upstream, token))
            .await;

        match result {
            Ok(resource) => {
                let op = match request.operation {
                    taggate_core::OperationKind::Delete => CacheOp::Remove {
                        id: resource.id.clone(),
                    },
                    _ => CacheOp::Upsert {
                        id: resource.id.clone(),
                        value: resource.body.clone(),
                    },
                };
                (
                    ItemOutcome::Success {
                        id: resource.id,
                        name,
                    },
                    Some(op),
                )
            }
            Err(failure) => {
                let entity_id = upstream
                    .entity_path
                    .rsplit('/')
                    .next()
                    .unwrap_or_default()
                    .to_owned();
                let outcome = match failure.error {
                    UpstreamError::NotFound(_) => ItemOutcome::NotFound {
                        id: entity_id,
                        name,
                    },
                    UpstreamError::FeatureLimit(_) => ItemOutcome::FeatureLimit {
                        id: entity_id,
                        name,
                    },
                    UpstreamError::QuotaExhausted => ItemOutcome::QuotaExhausted {
                        name,
                        attempts: failure.attempts,
                    },
                    ref other => ItemOutcome::Failed {
                        name,
                        error: other.to_string(),
                    },
                };
                (outcome, None)
            }
        }
    }

    /// Best-effort release of unused reservations; accounting failures are
    /// logged, not propagated — the upstream work already happened.
    async fn return_reservation(
        &self,
        reservation: &taggate_tiers::Reservation,
        unused: i64,
    ) {
        if let Err(e) = self.gate.release_unused(reservation, unused).await {
            warn!(error = %e, unused, "failed to release unused tier reservations");
        }
    }
}

/// A batch-level failure: every form gets a failed result entry so the
/// response still carries one result per submitted item.
fn failure_response(request: &BatchRequest, message: &str) -> FeatureResponse {
    let outcomes: Vec<ItemOutcome> = request
        .forms
        .iter()
        .map(|form| ItemOutcome::Failed {
            name: form.display_name(),
            error: message.to_owned(),
        })
        .collect();
    assemble_response(request.feature, request.operation, &outcomes).with_message(message)
}
