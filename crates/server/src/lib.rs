//! Standalone HTTP server exposing the Taggate gateway.
//!
//! Routes accept the same `{ "forms": [...] }` batch bodies the dashboard's
//! server actions submit, resolve the caller to a tenant through bearer
//! keys, and hand everything to
//! [`Gateway::dispatch`](taggate_gateway::Gateway::dispatch) /
//! [`Gateway::list`](taggate_gateway::Gateway::list). Responses are always
//! the structured `FeatureResponse`, mixed per-item outcomes included.

pub mod api;
pub mod auth;
pub mod config;
pub mod error;
pub mod factory;
