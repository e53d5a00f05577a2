use thiserror::Error;

/// A malformed batch item, rejected before any upstream call is made.
///
/// Validation failures are local to one item: they are never retried and
/// never counted against tier usage.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// Update/delete items must name the upstream resource they act on.
    #[error("missing entity path for {0} operation")]
    MissingEntityPath(&'static str),

    /// Create items must carry a display name.
    #[error("missing name for created resource")]
    MissingName,

    /// The item payload does not have the expected shape.
    #[error("invalid payload: {0}")]
    InvalidPayload(String),
}
