//! # Ledger Error Types
//!
//! The caller-facing error taxonomy. Everything below (core guards,
//! validation, database failures) folds into `LedgerError` here.
//!
//! ## Mapping
//! ```text
//! CoreError::InvalidState       → LedgerError::Core (lifecycle refusal)
//! CoreError::InsufficientFunds  → LedgerError::Core (solvency refusal)
//! ValidationError               → LedgerError::Core (bad input)
//! DbError::NotFound             → LedgerError::NotFound
//! DbError::StaleVersion         → LedgerError::ConcurrencyConflict (retryable)
//! DbError::*                    → LedgerError::Storage
//! ```

use thiserror::Error;

use caja_core::error::{CoreError, ValidationError};
use caja_db::DbError;

/// Errors surfaced by the ledger services.
#[derive(Debug, Error)]
pub enum LedgerError {
    /// A business rule refused the operation (lifecycle guard, solvency
    /// gate, or input validation).
    #[error(transparent)]
    Core(#[from] CoreError),

    /// The referenced entity does not exist.
    #[error("{entity} not found: {id}")]
    NotFound { entity: String, id: String },

    /// Two writers raced on the same session; the loser lands here.
    /// Retry from a fresh read.
    #[error("session {id} was modified concurrently, retry the operation")]
    ConcurrencyConflict { id: String },

    /// A session with recorded activity cannot be deleted.
    #[error("session {id} has recorded activity and cannot be deleted")]
    SessionNotEmpty { id: String },

    /// The database failed for a reason that is not a business condition.
    #[error("storage error: {0}")]
    Storage(DbError),
}

impl From<ValidationError> for LedgerError {
    fn from(err: ValidationError) -> Self {
        LedgerError::Core(CoreError::Validation(err))
    }
}

impl From<DbError> for LedgerError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::NotFound { entity, id } => LedgerError::NotFound { entity, id },
            DbError::StaleVersion { id, .. } => LedgerError::ConcurrencyConflict { id },
            other => LedgerError::Storage(other),
        }
    }
}

/// Result type for ledger operations.
pub type LedgerResult<T> = Result<T, LedgerError>;
