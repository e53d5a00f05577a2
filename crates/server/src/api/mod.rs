pub mod batches;
pub mod health;

use std::sync::Arc;

use axum::Router;
use axum::middleware;
use axum::routing::{get, post};
use tower_http::trace::TraceLayer;

use taggate_gateway::Gateway;

use crate::auth::{AuthKeys, require_caller};

/// Shared state handed to every handler.
#[derive(Clone)]
pub struct AppState {
    pub gateway: Arc<Gateway>,
    pub keys: Arc<AuthKeys>,
}

/// Build the Axum router with all API routes and middleware.
pub fn router(state: AppState) -> Router {
    let keys = Arc::clone(&state.keys);

    let api = Router::new()
        .route("/api/{family}/{feature}", get(batches::list))
        .route(
            "/api/{family}/{feature}/{operation}",
            post(batches::dispatch),
        )
        .route_layer(middleware::from_fn_with_state(keys, require_caller));

    Router::new()
        .route("/health", get(health::health))
        .merge(api)
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}
