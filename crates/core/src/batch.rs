use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::ValidationError;
use crate::feature::{Feature, OperationKind};
use crate::types::{RequestId, TenantId};

/// One item (form) in a batch submission.
///
/// The web tier always submits arrays of forms; each form targets one
/// upstream resource.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchItem {
    /// Upstream resource path (e.g. `accounts/123/containers/456`).
    ///
    /// Required for update and delete. For create the parent collection is
    /// derived from `payload["parent"]` or from this field when set.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub entity_path: Option<String>,

    /// Display name of the resource, used for response reporting and
    /// required when creating.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    /// Feature-specific request body forwarded to the upstream API.
    #[serde(default)]
    pub payload: serde_json::Value,
}

impl BatchItem {
    /// Create an item targeting an existing upstream resource.
    #[must_use]
    pub fn for_entity(entity_path: impl Into<String>, payload: serde_json::Value) -> Self {
        Self {
            entity_path: Some(entity_path.into()),
            name: None,
            payload,
        }
    }

    /// Create an item describing a new resource to be created.
    #[must_use]
    pub fn for_new(name: impl Into<String>, payload: serde_json::Value) -> Self {
        Self {
            entity_path: None,
            name: Some(name.into()),
            payload,
        }
    }

    /// Set the display name.
    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// The name to report this item under in responses.
    #[must_use]
    pub fn display_name(&self) -> String {
        self.name
            .clone()
            .or_else(|| self.entity_path.clone())
            .unwrap_or_else(|| "(unnamed)".to_owned())
    }

    /// Check the item's shape against the requirements of `operation`.
    ///
    /// Update and delete must name an upstream resource; create must carry
    /// a display name and an object payload. This is local admission only —
    /// the upstream API still validates feature-specific fields.
    pub fn validate(&self, operation: OperationKind) -> Result<(), ValidationError> {
        match operation {
            OperationKind::Create => {
                if self.name.as_deref().is_none_or(str::is_empty) {
                    return Err(ValidationError::MissingName);
                }
                if !self.payload.is_object() {
                    return Err(ValidationError::InvalidPayload(
                        "create payload must be a JSON object".into(),
                    ));
                }
            }
            OperationKind::Update => {
                if self.entity_path.as_deref().is_none_or(str::is_empty) {
                    return Err(ValidationError::MissingEntityPath("update"));
                }
                if !self.payload.is_object() {
                    return Err(ValidationError::InvalidPayload(
                        "update payload must be a JSON object".into(),
                    ));
                }
            }
            OperationKind::Delete => {
                if self.entity_path.as_deref().is_none_or(str::is_empty) {
                    return Err(ValidationError::MissingEntityPath("delete"));
                }
            }
        }
        Ok(())
    }
}

/// A batch of forms submitted by one tenant against one feature.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchRequest {
    /// Correlation id for logging and tracing.
    pub request_id: RequestId,

    /// Tenant that owns this batch.
    pub tenant: TenantId,

    /// Target resource family.
    pub feature: Feature,

    /// Mutation kind applied to every form in the batch.
    pub operation: OperationKind,

    /// The submitted forms. Outcomes are reported per form.
    pub forms: Vec<BatchItem>,

    /// Timestamp when the batch was accepted.
    pub created_at: DateTime<Utc>,
}

impl BatchRequest {
    /// Create a new batch with a generated request id stamped now.
    #[must_use]
    pub fn new(
        tenant: impl Into<TenantId>,
        feature: Feature,
        operation: OperationKind,
        forms: Vec<BatchItem>,
    ) -> Self {
        Self {
            request_id: RequestId::new(Uuid::new_v4().to_string()),
            tenant: tenant.into(),
            feature,
            operation,
            forms,
            created_at: Utc::now(),
        }
    }
}
