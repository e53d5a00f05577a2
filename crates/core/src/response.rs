use serde::{Deserialize, Serialize};

use crate::feature::{Feature, OperationKind};

/// Outcome of dispatching one batch item.
///
/// Per-item upstream calls run concurrently; each resolves to exactly one of
/// these variants. The final [`FeatureResponse`] is computed by
/// [`assemble_response`] as a pure fold over the settled outcomes, so no
/// shared mutable accumulator is touched from concurrent tasks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ItemOutcome {
    /// The upstream call succeeded.
    Success {
        /// Natural id of the affected resource (e.g. `accountId`).
        id: String,
        name: String,
    },
    /// The upstream resource no longer exists (deleted externally).
    NotFound { id: String, name: String },
    /// The upstream API reported a plan/feature limit for this resource.
    FeatureLimit { id: String, name: String },
    /// Local tier admission rejected the batch before dispatch.
    LimitReached { name: String },
    /// The item failed local shape validation; nothing was sent upstream.
    Invalid { name: String, reason: String },
    /// Upstream quota (HTTP 429) persisted through every retry attempt.
    QuotaExhausted { name: String, attempts: u32 },
    /// Any other upstream failure.
    Failed { name: String, error: String },
}

impl ItemOutcome {
    /// Whether this item was applied upstream.
    #[must_use]
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }
}

/// Per-item result entry in a [`FeatureResponse`].
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeatureResult {
    /// Natural ids of the affected resources (empty when none was assigned).
    pub ids: Vec<String>,
    /// Display names of the affected resources.
    pub names: Vec<String>,
    /// Whether this item was applied upstream.
    pub success: bool,
    /// Set when the upstream resource was missing.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub not_found: Option<bool>,
    /// Set when a limit (local tier or upstream plan) stopped this item.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit_reached: Option<bool>,
}

/// Structured response for one batch request.
///
/// Always resolves — orchestration failures are encoded here rather than
/// thrown, so the web tier can render mixed outcomes deterministically.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeatureResponse {
    /// True only when every item in the batch succeeded.
    pub success: bool,
    /// Human-readable summary of the batch outcome.
    pub message: String,
    /// Messages for items that failed with generic errors.
    pub errors: Vec<String>,
    /// A limit (local tier or upstream plan) stopped at least one item, and
    /// no item hit a not-found condition.
    pub limit_reached: bool,
    /// At least one upstream resource was missing.
    pub not_found_error: bool,
    /// One entry per submitted form, in submission order.
    pub results: Vec<FeatureResult>,
}

impl FeatureResponse {
    /// Replace the summary message.
    #[must_use]
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = message.into();
        self
    }

    /// Number of items that were applied upstream.
    #[must_use]
    pub fn success_count(&self) -> usize {
        self.results.iter().filter(|r| r.success).count()
    }
}

/// Fold settled per-item outcomes into one [`FeatureResponse`].
///
/// The top-level flags follow a strict priority: any not-found wins over
/// limit-reached, which wins over generic failure; `success` is true only
/// when every item succeeded. `results` always has one entry per outcome in
/// order, whatever the mix.
#[must_use]
pub fn assemble_response(
    feature: Feature,
    operation: OperationKind,
    outcomes: &[ItemOutcome],
) -> FeatureResponse {
    let mut errors = Vec::new();
    let mut results = Vec::with_capacity(outcomes.len());
    let mut any_not_found = false;
    let mut any_limit = false;
    let mut succeeded = 0usize;

    for outcome in outcomes {
        let result = match outcome {
            ItemOutcome::Success { id, name } => {
                succeeded += 1;
                FeatureResult {
                    ids: vec![id.clone()],
                    names: vec![name.clone()],
                    success: true,
                    not_found: None,
                    limit_reached: None,
                }
            }
            ItemOutcome::NotFound { id, name } => {
                any_not_found = true;
                FeatureResult {
                    ids: vec![id.clone()],
                    names: vec![name.clone()],
                    success: false,
                    not_found: Some(true),
                    limit_reached: None,
                }
            }
            ItemOutcome::FeatureLimit { id, name } => {
                any_limit = true;
                FeatureResult {
                    ids: vec![id.clone()],
                    names: vec![name.clone()],
                    success: false,
                    not_found: None,
                    limit_reached: Some(true),
                }
            }
            ItemOutcome::LimitReached { name } => {
                any_limit = true;
                FeatureResult {
                    ids: Vec::new(),
                    names: vec![name.clone()],
                    success: false,
                    not_found: None,
                    limit_reached: Some(true),
                }
            }
            ItemOutcome::Invalid { name, reason } => {
                errors.push(format!("{name}: {reason}"));
                FeatureResult {
                    ids: Vec::new(),
                    names: vec![name.clone()],
                    success: false,
                    not_found: None,
                    limit_reached: None,
                }
            }
            ItemOutcome::QuotaExhausted { name, attempts } => {
                errors.push(format!(
                    "{name}: quota exceeded after {attempts} attempts, try again later"
                ));
                FeatureResult {
                    ids: Vec::new(),
                    names: vec![name.clone()],
                    success: false,
                    not_found: None,
                    limit_reached: None,
                }
            }
            ItemOutcome::Failed { name, error } => {
                errors.push(format!("{name}: {error}"));
                FeatureResult {
                    ids: Vec::new(),
                    names: vec![name.clone()],
                    success: false,
                    not_found: None,
                    limit_reached: None,
                }
            }
        };
        results.push(result);
    }

    let total = outcomes.len();
    let all_succeeded = succeeded == total;
    let message = if any_not_found {
        format!("some {feature} resources were not found")
    } else if any_limit {
        format!("{operation} limit reached for {feature}")
    } else if all_succeeded {
        format!("{operation} applied to {succeeded} {feature} item(s)")
    } else {
        format!("{operation} applied to {succeeded} of {total} {feature} item(s)")
    };

    FeatureResponse {
        success: all_succeeded && total > 0,
        message,
        errors,
        // Priority: not-found wins over limit-reached.
        limit_reached: any_limit && !any_not_found,
        not_found_error: any_not_found,
        results,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn success(id: &str, name: &str) -> ItemOutcome {
        ItemOutcome::Success {
            id: id.into(),
            name: name.into(),
        }
    }

    #[test]
    fn all_success() {
        let outcomes = vec![success("1", "a"), success("2", "b")];
        let resp = assemble_response(Feature::GtmTags, OperationKind::Update, &outcomes);
        assert!(resp.success);
        assert!(!resp.limit_reached);
        assert!(!resp.not_found_error);
        assert!(resp.errors.is_empty());
        assert_eq!(resp.results.len(), 2);
        assert_eq!(resp.success_count(), 2);
    }

    #[test]
    fn not_found_takes_priority_over_limit() {
        let outcomes = vec![
            ItemOutcome::NotFound {
                id: "1".into(),
                name: "gone".into(),
            },
            ItemOutcome::FeatureLimit {
                id: "2".into(),
                name: "capped".into(),
            },
        ];
        let resp = assemble_response(Feature::GtmContainers, OperationKind::Create, &outcomes);
        assert!(resp.not_found_error);
        assert!(!resp.limit_reached, "not-found suppresses the limit flag");
        assert!(!resp.success);
    }

    #[test]
    fn mixed_outcome_keeps_per_item_results() {
        let outcomes = vec![
            ItemOutcome::NotFound {
                id: "1".into(),
                name: "gone".into(),
            },
            success("2", "kept"),
        ];
        let resp = assemble_response(Feature::Ga4Properties, OperationKind::Update, &outcomes);
        assert!(resp.not_found_error);
        assert_eq!(resp.results.len(), 2);
        assert_eq!(resp.results[0].not_found, Some(true));
        assert!(!resp.results[0].success);
        assert!(resp.results[1].success);
        assert_eq!(resp.success_count(), 1);
    }

    #[test]
    fn generic_errors_collected() {
        let outcomes = vec![
            ItemOutcome::Failed {
                name: "broken".into(),
                error: "connection reset".into(),
            },
            ItemOutcome::QuotaExhausted {
                name: "slow".into(),
                attempts: 3,
            },
            success("9", "ok"),
        ];
        let resp = assemble_response(Feature::Ga4Streams, OperationKind::Delete, &outcomes);
        assert!(!resp.success);
        assert!(!resp.limit_reached);
        assert!(!resp.not_found_error);
        assert_eq!(resp.errors.len(), 2);
        assert!(resp.errors[1].contains("quota exceeded after 3 attempts"));
        assert_eq!(resp.results.len(), 3);
    }

    #[test]
    fn admission_rejection_fills_every_result() {
        let outcomes: Vec<ItemOutcome> = (0..3)
            .map(|i| ItemOutcome::LimitReached {
                name: format!("form-{i}"),
            })
            .collect();
        let resp = assemble_response(Feature::GtmWorkspaces, OperationKind::Create, &outcomes);
        assert!(resp.limit_reached);
        assert!(!resp.success);
        assert_eq!(resp.results.len(), 3);
        assert!(resp.results.iter().all(|r| r.limit_reached == Some(true)));
    }

    #[test]
    fn empty_batch_is_not_a_success() {
        let resp = assemble_response(Feature::GtmTags, OperationKind::Update, &[]);
        assert!(!resp.success);
        assert!(resp.results.is_empty());
    }

    #[test]
    fn response_serializes_camel_case() {
        let resp = assemble_response(
            Feature::GtmTags,
            OperationKind::Update,
            &[ItemOutcome::NotFound {
                id: "4".into(),
                name: "t".into(),
            }],
        );
        let json = serde_json::to_value(&resp).unwrap();
        assert_eq!(json["notFoundError"], serde_json::json!(true));
        assert_eq!(json["limitReached"], serde_json::json!(false));
        assert_eq!(json["results"][0]["notFound"], serde_json::json!(true));
    }
}
