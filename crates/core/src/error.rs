use crate::issue::IssueStatus;
use crate::types::DbId;

/// Domain-level error taxonomy.
///
/// `Validation` covers transition payloads missing required fields,
/// `InvalidTransition` covers edges not present in the lifecycle graph,
/// and `Conflict` covers a lost conditional-update race (the caller must
/// refetch the issue and retry).
#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("Entity not found: {entity} with id {id}")]
    NotFound { entity: &'static str, id: DbId },

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Illegal status transition: {from} -> {to}")]
    InvalidTransition { from: IssueStatus, to: IssueStatus },

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Internal error: {0}")]
    Internal(String),
}
