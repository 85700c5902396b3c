//! Workflow errors.

use crate::classifier::ClassifierError;
use thiserror::Error;

pub type AppResult<T> = Result<T, AppError>;

/// Failures surfaced by the journal, auth and storage layers.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("not authenticated; run `quietsignal login` first")]
    NotAuthenticated,

    #[error("invalid or expired token")]
    InvalidToken,

    #[error("forbidden")]
    Forbidden,

    #[error("admin privileges required")]
    AdminRequired,

    #[error("journal {0} not found")]
    JournalNotFound(i64),

    #[error("no journal found for this account")]
    NoJournal,

    #[error("entry {0} not found")]
    EntryNotFound(i64),

    #[error("entry {entry_id} does not belong to journal {journal_id}")]
    EntryMismatch { entry_id: i64, journal_id: i64 },

    #[error("username '{0}' is already taken")]
    UsernameTaken(String),

    #[error("incorrect username or password")]
    InvalidCredentials,

    #[error("auth.secret_key is not configured")]
    MissingSecret,

    #[error("storage error: {0}")]
    Storage(#[from] rusqlite::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error(transparent)]
    Classifier(#[from] ClassifierError),
}

impl AppError {
    /// HTTP-equivalent status, used in JSON output.
    pub fn status_code(&self) -> u16 {
        match self {
            AppError::NotAuthenticated | AppError::InvalidToken | AppError::InvalidCredentials => {
                401
            }
            AppError::Forbidden | AppError::AdminRequired => 403,
            AppError::JournalNotFound(_) | AppError::NoJournal | AppError::EntryNotFound(_) => {
                404
            }
            AppError::EntryMismatch { .. } => 400,
            AppError::UsernameTaken(_) => 409,
            AppError::MissingSecret
            | AppError::Storage(_)
            | AppError::Serialization(_)
            | AppError::Classifier(_) => 500,
        }
    }

    /// Whether the failure is about who the caller is or may do.
    pub fn is_auth_failure(&self) -> bool {
        matches!(self.status_code(), 401 | 403)
    }
}
