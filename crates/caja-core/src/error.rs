//! # Error Types
//!
//! Domain-specific error types for caja-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  caja-core errors (this file)                                          │
//! │  ├── CoreError        - Business rule violations                       │
//! │  └── ValidationError  - Input validation failures                      │
//! │                                                                         │
//! │  caja-db errors (separate crate)                                       │
//! │  └── DbError          - Database operation failures                    │
//! │                                                                         │
//! │  caja-ledger errors (service crate)                                    │
//! │  └── LedgerError      - The full caller-facing taxonomy                │
//! │                                                                         │
//! │  Flow: ValidationError → CoreError → LedgerError → caller              │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Design Principles
//! 1. Use `thiserror` for derive macros (not manual impl)
//! 2. Include context in error messages (session id, amounts)
//! 3. Errors are enum variants, never String
//! 4. Nothing is logged-and-swallowed; every failure reaches the caller

use thiserror::Error;

use crate::money::Money;

// =============================================================================
// Core Error
// =============================================================================

/// Core business logic errors.
///
/// These represent business rule violations detected by pure code: lifecycle
/// guards and the solvency gate. Storage and concurrency failures live in
/// the outer crates.
#[derive(Debug, Error)]
pub enum CoreError {
    /// The operation is illegal for the entity's current lifecycle state.
    ///
    /// ## When This Occurs
    /// - Closing a session that is already CLOSED
    /// - Approving a session that was never closed
    /// - Reversing an order that is already REVERSED
    #[error("{entity} {id} is {current}, cannot {operation}")]
    InvalidState {
        entity: &'static str,
        id: String,
        current: String,
        operation: &'static str,
    },

    /// The till does not hold enough cash to fund the expense.
    ///
    /// ## User Workflow
    /// ```text
    /// Register expense (paid from till, 700 000)
    ///      │
    ///      ▼
    /// available = expected_cash(session) = 620 000
    ///      │
    ///      ▼
    /// InsufficientFunds { available: 620 000, requested: 700 000 }
    ///      │
    ///      ▼
    /// Nothing is persisted; the session totals are unchanged
    /// ```
    #[error("insufficient till cash: available {available}, requested {requested}")]
    InsufficientFunds {
        available: Money,
        requested: Money,
    },

    /// Validation error (wraps ValidationError).
    #[error("validation error: {0}")]
    Validation(#[from] ValidationError),
}

impl CoreError {
    /// Creates an InvalidState error with the usual context fields.
    pub fn invalid_state(
        entity: &'static str,
        id: impl Into<String>,
        current: impl Into<String>,
        operation: &'static str,
    ) -> Self {
        CoreError::InvalidState {
            entity,
            id: id.into(),
            current: current.into(),
            operation,
        }
    }
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors.
///
/// These occur when caller input does not meet requirements, before any
/// business logic runs.
#[derive(Debug, Error)]
pub enum ValidationError {
    /// A required field is missing or empty.
    #[error("{field} is required")]
    Required { field: &'static str },

    /// A monetary amount must be strictly positive.
    #[error("{field} must be positive, got {amount}")]
    NonPositiveAmount { field: &'static str, amount: Money },

    /// Invalid format (e.g., malformed id).
    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: &'static str, reason: String },
}

/// Rejects blank required string fields.
pub fn require_non_blank(field: &'static str, value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError::Required { field });
    }
    Ok(())
}

/// Rejects zero and negative amounts.
pub fn require_positive_amount(field: &'static str, amount: Money) -> Result<(), ValidationError> {
    if !amount.is_positive() {
        return Err(ValidationError::NonPositiveAmount { field, amount });
    }
    Ok(())
}

// =============================================================================
// Result Type Alias
// =============================================================================

/// Convenience type alias for Results with CoreError.
pub type CoreResult<T> = Result<T, CoreError>;

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_state_message() {
        let err = CoreError::invalid_state("session", "s-1", "closed", "register expense");
        assert_eq!(
            err.to_string(),
            "session s-1 is closed, cannot register expense"
        );
    }

    #[test]
    fn test_insufficient_funds_message() {
        let err = CoreError::InsufficientFunds {
            available: Money::from_minor(620_000),
            requested: Money::from_minor(700_000),
        };
        assert_eq!(
            err.to_string(),
            "insufficient till cash: available $620000, requested $700000"
        );
    }

    #[test]
    fn test_require_positive_amount() {
        assert!(require_positive_amount("amount", Money::from_minor(1)).is_ok());
        assert!(require_positive_amount("amount", Money::zero()).is_err());
        assert!(require_positive_amount("amount", Money::from_minor(-5)).is_err());
    }

    #[test]
    fn test_require_non_blank() {
        assert!(require_non_blank("operator", "ana").is_ok());
        assert!(require_non_blank("operator", "  ").is_err());
    }

    #[test]
    fn test_validation_converts_to_core_error() {
        let validation_err = ValidationError::Required { field: "name" };
        let core_err: CoreError = validation_err.into();
        assert!(matches!(core_err, CoreError::Validation(_)));
    }
}
