//! Domain error types.

/// Errors surfaced by the invoicing core. Infrastructure failures (database,
/// SMTP, filesystem) travel as `anyhow::Error` at the application layer.
#[derive(Debug, thiserror::Error)]
pub enum DomainError {
    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: i64 },

    #[error("Cannot delete {entity} {id}: {reason}")]
    DeletionBlocked {
        entity: &'static str,
        id: i64,
        reason: String,
    },

    #[error("Client {0} has no email address on record")]
    MissingClientEmail(i64),
}

impl DomainError {
    pub fn validation(msg: impl Into<String>) -> Self {
        DomainError::Validation(msg.into())
    }
}
