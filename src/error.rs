//! Error types for arbor.
//!
//! Domain-specific error enums using thiserror for exhaustive error handling.
//! Store errors are ordinary recoverable outcomes surfaced to the caller;
//! `InvariantViolation` is defensive-only and should never occur in correct
//! operation.

use crate::model::AgentId;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    #[error("unknown agent: {0}")]
    NotFound(AgentId),
    #[error("branch depth {depth} exceeds limit {max}")]
    DepthExceeded { depth: u32, max: u32 },
    #[error("hierarchy invariant violated: {0}")]
    InvariantViolation(String),
}

/// Rejection of a loosely-typed payload at the store boundary.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PayloadError {
    #[error("JSON shape: {0}")]
    Json(String),
    #[error("missing field `{0}`")]
    MissingField(&'static str),
    #[error("invalid `{field}`: {reason}")]
    InvalidField {
        field: &'static str,
        reason: String,
    },
}

/// Failure reported by an external collaborator (AI backend, sync client).
/// Never propagated out of a conversation turn; translated into a synthetic
/// assistant message instead.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BackendError {
    #[error("request failed: {0}")]
    Request(String),
    #[error("backend unavailable: {0}")]
    Unavailable(String),
}
