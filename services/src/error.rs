use crate::email::MailError;
use sea_orm::DbErr;
use thiserror::Error;

/// Failures surfaced by the submission, settings and relay services.
#[derive(Debug, Error)]
pub enum ServiceError {
    /// The actor may not perform the operation right now. Nothing was read or written.
    #[error("Permission denied")]
    PermissionDenied,

    /// Rejected input. The message is user-facing.
    #[error("{0}")]
    Validation(String),

    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("storage error: {0}")]
    Storage(#[from] std::io::Error),

    #[error("database error: {0}")]
    Database(#[from] DbErr),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Transport failures other than recipient refusal.
    #[error("mail transport error: {0}")]
    Transport(MailError),
}
