//! The Taggate orchestration pipeline.
//!
//! [`Gateway`] is what the route handlers call: it takes one
//! [`BatchRequest`](taggate_core::BatchRequest) and runs the full admission
//! and dispatch sequence — resolve the tenant's OAuth token, reserve tier
//! usage, acquire distributed rate-limit capacity, fan the items out through
//! the throttled retry executor, settle the per-item outcomes, return unused
//! reservations, patch the resource cache — and always resolves to one
//! structured [`FeatureResponse`](taggate_core::FeatureResponse), partial
//! failures included.
//!
//! All collaborators are injected through [`GatewayBuilder`]; nothing is a
//! module-level global, so every seam can be faked in tests.

mod builder;
mod error;
mod gateway;

pub use builder::GatewayBuilder;
pub use error::GatewayError;
pub use gateway::Gateway;
