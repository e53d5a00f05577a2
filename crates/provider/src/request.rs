use serde::{Deserialize, Serialize};

use taggate_core::{BatchItem, Feature, OperationKind, ValidationError};

/// One upstream mutation, built from a validated batch item.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpstreamRequest {
    /// Target resource family.
    pub feature: Feature,

    /// Mutation kind.
    pub operation: OperationKind,

    /// Resource path for update/delete (e.g.
    /// `accounts/123/containers/456`); parent collection path for create.
    pub entity_path: String,

    /// Request body forwarded to the upstream API.
    pub payload: serde_json::Value,
}

impl UpstreamRequest {
    /// Build an upstream request from a batch item.
    ///
    /// The item must already have passed
    /// [`BatchItem::validate`](taggate_core::BatchItem::validate) for
    /// `operation`. For creates the parent path comes from
    /// `payload["parent"]`, falling back to `entity_path`.
    pub fn from_item(
        feature: Feature,
        operation: OperationKind,
        item: &BatchItem,
    ) -> Result<Self, ValidationError> {
        item.validate(operation)?;

        let entity_path = match operation {
            OperationKind::Create => item
                .payload
                .get("parent")
                .and_then(serde_json::Value::as_str)
                .map(str::to_owned)
                .or_else(|| item.entity_path.clone())
                .unwrap_or_default(),
            OperationKind::Update | OperationKind::Delete => item
                .entity_path
                .clone()
                .unwrap_or_default(),
        };

        Ok(Self {
            feature,
            operation,
            entity_path,
            payload: item.payload.clone(),
        })
    }
}

/// One resource as returned by the upstream API.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpstreamResource {
    /// Natural id of the resource (last segment of its resource path).
    pub id: String,

    /// Display name, when the API reports one.
    pub name: String,

    /// Full response body, cached verbatim.
    pub body: serde_json::Value,
}

impl UpstreamResource {
    /// Extract the resource identity from an upstream response body.
    ///
    /// GTM v2 bodies carry a `path` (`accounts/1/containers/2/...`) plus a
    /// per-type id field; GA4 Admin bodies carry a `name` resource path
    /// (`properties/123/customDimensions/456`) and a `displayName`. The
    /// natural id is the last path segment in both families.
    #[must_use]
    pub fn from_body(body: serde_json::Value) -> Self {
        let path = body
            .get("path")
            .or_else(|| body.get("name"))
            .and_then(serde_json::Value::as_str)
            .unwrap_or_default();
        let id = path.rsplit('/').next().unwrap_or_default().to_owned();

        let name = body
            .get("displayName")
            .or_else(|| body.get("name"))
            .and_then(serde_json::Value::as_str)
            .unwrap_or(&id)
            .to_owned();

        Self { id, name, body }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_request_uses_payload_parent() {
        let item = BatchItem::for_new(
            "New Container",
            serde_json::json!({"parent": "accounts/123", "name": "New Container"}),
        );
        let req = UpstreamRequest::from_item(Feature::GtmContainers, OperationKind::Create, &item)
            .unwrap();
        assert_eq!(req.entity_path, "accounts/123");
    }

    #[test]
    fn update_request_uses_entity_path() {
        let item = BatchItem::for_entity(
            "accounts/1/containers/2",
            serde_json::json!({"name": "Renamed"}),
        );
        let req = UpstreamRequest::from_item(Feature::GtmContainers, OperationKind::Update, &item)
            .unwrap();
        assert_eq!(req.entity_path, "accounts/1/containers/2");
    }

    #[test]
    fn invalid_item_is_rejected() {
        let item = BatchItem::for_new("X", serde_json::json!({}));
        let err = UpstreamRequest::from_item(Feature::GtmTags, OperationKind::Delete, &item)
            .unwrap_err();
        assert_eq!(err, ValidationError::MissingEntityPath("delete"));
    }

    #[test]
    fn gtm_body_identity() {
        let resource = UpstreamResource::from_body(serde_json::json!({
            "path": "accounts/1/containers/2/workspaces/3/tags/14",
            "name": "GA4 Config",
            "tagId": "14",
        }));
        assert_eq!(resource.id, "14");
        assert_eq!(resource.name, "GA4 Config");
    }

    #[test]
    fn ga4_body_identity() {
        let resource = UpstreamResource::from_body(serde_json::json!({
            "name": "properties/123/customDimensions/456",
            "displayName": "Page Type",
        }));
        assert_eq!(resource.id, "456");
        assert_eq!(resource.name, "Page Type");
    }
}
