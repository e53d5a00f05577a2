//! Tenant credential resolution and upstream Google API access for Taggate.
//!
//! Every outbound call the gateway makes goes through two seams defined
//! here: an [`AccessTokenProvider`] that resolves a tenant's stored Google
//! OAuth token, and an [`UpstreamClient`] that performs exactly one HTTP
//! call against the Tag Manager v2 or GA4 Admin v1beta API. Both are traits
//! so tests (and the executor's retry loop) can substitute fakes.

pub mod client;
pub mod error;
pub mod google;
pub mod request;
pub mod token;

pub use client::{DynUpstreamClient, UpstreamClient};
pub use error::{AuthError, UpstreamError};
pub use google::GoogleApiClient;
pub use request::{UpstreamRequest, UpstreamResource};
pub use token::{AccessToken, AccessTokenProvider, HttpTokenProvider, StaticTokenProvider};
