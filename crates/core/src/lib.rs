//! Core types shared across the Taggate workspace.
//!
//! Taggate orchestrates batched configuration changes against the Google Tag
//! Manager and GA4 Admin APIs on behalf of dashboard tenants. This crate
//! defines the vocabulary every other crate speaks: tenants, API families,
//! features, operation kinds, batch requests, and the structured
//! [`FeatureResponse`] returned to the web tier for every batch — including
//! partial failures.

pub mod batch;
pub mod error;
pub mod feature;
pub mod response;
pub mod types;

pub use batch::{BatchItem, BatchRequest};
pub use error::ValidationError;
pub use feature::{ApiFamily, Feature, OperationKind};
pub use response::{FeatureResponse, FeatureResult, ItemOutcome, assemble_response};
pub use types::{RequestId, TenantId};
