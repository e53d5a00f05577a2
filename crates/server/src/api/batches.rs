use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use serde::Deserialize;

use taggate_core::{ApiFamily, BatchItem, BatchRequest, Feature, OperationKind};

use crate::auth::CallerIdentity;
use crate::error::ServerError;

use super::AppState;

/// Request body for a batch mutation: the array of forms the dashboard
/// submits.
#[derive(Debug, Deserialize)]
pub struct DispatchBody {
    pub forms: Vec<BatchItem>,
}

/// Query parameters for list routes.
#[derive(Debug, Deserialize)]
pub struct ListParams {
    /// Optional parent resource path to list under.
    pub parent: Option<String>,
}

/// Parse and cross-check the `{family}/{feature}` path segments.
fn resolve_feature(family: &str, feature: &str) -> Result<Feature, (StatusCode, String)> {
    let family = ApiFamily::from_wire(family)
        .ok_or((StatusCode::NOT_FOUND, format!("unknown API family: {family}")))?;
    let feature = Feature::from_wire(feature)
        .ok_or((StatusCode::NOT_FOUND, format!("unknown feature: {feature}")))?;
    if feature.family() != family {
        return Err((
            StatusCode::BAD_REQUEST,
            format!("{feature} belongs to the {} API", feature.family()),
        ));
    }
    Ok(feature)
}

/// `POST /api/{family}/{feature}/{operation}` -- dispatch one batch.
///
/// Always returns 200 with a `FeatureResponse` once routing and auth
/// succeed; partial failures are encoded per item, which is what lets the
/// dashboard render mixed outcomes.
pub async fn dispatch(
    State(state): State<AppState>,
    axum::Extension(identity): axum::Extension<CallerIdentity>,
    Path((family, feature, operation)): Path<(String, String, String)>,
    Json(body): Json<DispatchBody>,
) -> Result<impl IntoResponse, ServerError> {
    let feature = match resolve_feature(&family, &feature) {
        Ok(feature) => feature,
        Err((status, message)) => {
            return Ok((status, Json(serde_json::json!({ "error": message }))));
        }
    };
    let Some(operation) = OperationKind::from_wire(&operation) else {
        return Ok((
            StatusCode::NOT_FOUND,
            Json(serde_json::json!({ "error": format!("unknown operation: {operation}") })),
        ));
    };

    let request = BatchRequest::new(identity.tenant, feature, operation, body.forms);
    let response = state.gateway.dispatch(request).await;

    Ok((StatusCode::OK, Json(serde_json::json!(response))))
}

/// `GET /api/{family}/{feature}` -- list the tenant's resources,
/// read-through cached.
pub async fn list(
    State(state): State<AppState>,
    axum::Extension(identity): axum::Extension<CallerIdentity>,
    Path((family, feature)): Path<(String, String)>,
    Query(params): Query<ListParams>,
) -> Result<impl IntoResponse, ServerError> {
    let feature = match resolve_feature(&family, &feature) {
        Ok(feature) => feature,
        Err((status, message)) => {
            return Ok((status, Json(serde_json::json!({ "error": message }))));
        }
    };

    let items = state
        .gateway
        .list(&identity.tenant, feature, params.parent.as_deref())
        .await?;

    Ok((StatusCode::OK, Json(serde_json::json!({ "items": items }))))
}
