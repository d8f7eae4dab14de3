//! # Expense and Cash Entry Ledger
//!
//! Till movements during an OPEN session: expenses out, manual cash in.
//!
//! ## The Solvency Gate
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  register_expense(paid_from_till = true)                                │
//! │                                                                         │
//! │   lock(session) ──► ensure OPEN ──► available = live expected_cash     │
//! │                                          │                              │
//! │                     amount ≤ available?  │                              │
//! │                        yes ──► INSERT    │   no ──► InsufficientFunds  │
//! │                                          │          (nothing persisted) │
//! │                                                                         │
//! │  The lock makes check-then-insert atomic against sibling expenses:     │
//! │  two 400 000 expenses against 620 000 available cannot both pass.      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! A till-funded expense is physically cash leaving the drawer, so the
//! tender is forced to cash no matter what the caller submitted.

use chrono::Utc;
use std::sync::Arc;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use caja_core::error::{require_non_blank, require_positive_amount, CoreError};
use caja_core::{Expense, ManualCashEntry, Money, TenderType, TillSession};
use caja_db::Database;

use crate::error::LedgerResult;
use crate::locks::SessionLocks;
use crate::sales::live_expected_cash;

// =============================================================================
// Inputs
// =============================================================================

/// Request to register an expense against the session.
#[derive(Debug, Clone)]
pub struct NewExpense {
    pub session_id: String,
    pub amount: Money,
    /// Tender as submitted by the caller; legacy spellings accepted
    /// ("efectivo", "transferencia", ...). Ignored when `paid_from_till`.
    pub tender: Option<String>,
    /// Whether the money physically left the till drawer.
    pub paid_from_till: bool,
    pub category: String,
    pub description: Option<String>,
}

/// Request to record manual cash income (change fund, owner top-up).
#[derive(Debug, Clone)]
pub struct NewCashEntry {
    pub session_id: String,
    pub amount: Money,
    pub description: Option<String>,
}

// =============================================================================
// Service
// =============================================================================

/// Service for till movements: expenses and manual cash entries.
#[derive(Debug, Clone)]
pub struct ExpenseLedger {
    db: Database,
    locks: Arc<SessionLocks>,
}

impl ExpenseLedger {
    pub fn new(db: Database, locks: Arc<SessionLocks>) -> Self {
        ExpenseLedger { db, locks }
    }

    /// The cash the till should currently hold, from live records.
    pub async fn available_cash(&self, session_id: &str) -> LedgerResult<Money> {
        let session = self.db.sessions().get_by_id(session_id).await?;
        live_expected_cash(&self.db, &session).await
    }

    /// Registers an expense. Till-funded expenses are forced to cash and
    /// pass the solvency gate before anything persists.
    #[instrument(skip(self, request), fields(session_id = %request.session_id))]
    pub async fn register_expense(&self, request: NewExpense) -> LedgerResult<Expense> {
        require_positive_amount("amount", request.amount)?;
        require_non_blank("category", &request.category)?;

        let _guard = self.locks.lock(&request.session_id).await;

        let session = self.db.sessions().get_by_id(&request.session_id).await?;
        session.ensure_open("register expense")?;

        let tender = if request.paid_from_till {
            // Money out of the drawer is cash by definition
            TenderType::Cash
        } else {
            TenderType::parse_legacy(request.tender.as_deref())
        };

        let expense = Expense {
            id: Uuid::new_v4().to_string(),
            session_id: session.id.clone(),
            amount: request.amount,
            tender,
            paid_from_till: request.paid_from_till,
            category: request.category,
            description: request.description,
            occurred_at: Utc::now(),
        };

        if expense.drains_till() {
            self.ensure_solvent(&session, expense.amount).await?;
        }

        self.db.expenses().insert(&expense).await?;
        info!(
            expense_id = %expense.id,
            amount = %expense.amount,
            from_till = expense.paid_from_till,
            "expense registered"
        );
        Ok(expense)
    }

    /// Deletes an expense recorded by mistake. Only while its session is
    /// still OPEN; closed sessions are frozen evidence.
    ///
    /// Removing the row is the whole correction: the cash expectation is
    /// recomputed from surviving records, so a till-funded amount flows
    /// back into the available balance with no compensating entry.
    #[instrument(skip(self))]
    pub async fn delete_expense(&self, expense_id: &str) -> LedgerResult<()> {
        let expense = self.db.expenses().get_by_id(expense_id).await?;
        let _guard = self.locks.lock(&expense.session_id).await;

        let session = self.db.sessions().get_by_id(&expense.session_id).await?;
        session.ensure_open("delete expense")?;

        self.db.expenses().delete(expense_id).await?;

        if expense.drains_till() {
            self.restore_till_cash(&session, &expense).await?;
        } else {
            info!(expense_id = %expense.id, "non-till expense deleted");
        }
        Ok(())
    }

    /// Records manual cash income. Always cash; that is what the operation
    /// exists for.
    #[instrument(skip(self, request), fields(session_id = %request.session_id))]
    pub async fn register_cash_entry(&self, request: NewCashEntry) -> LedgerResult<ManualCashEntry> {
        require_positive_amount("amount", request.amount)?;

        let _guard = self.locks.lock(&request.session_id).await;

        let session = self.db.sessions().get_by_id(&request.session_id).await?;
        session.ensure_open("register cash entry")?;

        let entry = ManualCashEntry {
            id: Uuid::new_v4().to_string(),
            session_id: session.id.clone(),
            amount: request.amount,
            tender: TenderType::Cash,
            description: request.description,
            recorded_at: Utc::now(),
        };

        self.db.cash_entries().insert(&entry).await?;
        info!(entry_id = %entry.id, amount = %entry.amount, "cash entry recorded");
        Ok(entry)
    }

    /// Deletes a manual cash entry. Only while its session is still OPEN.
    #[instrument(skip(self))]
    pub async fn delete_cash_entry(&self, entry_id: &str) -> LedgerResult<()> {
        let entry = self.db.cash_entries().get_by_id(entry_id).await?;
        let _guard = self.locks.lock(&entry.session_id).await;

        let session = self.db.sessions().get_by_id(&entry.session_id).await?;
        session.ensure_open("delete cash entry")?;

        self.db.cash_entries().delete(entry_id).await?;
        info!(entry_id = %entry_id, "cash entry deleted");
        Ok(())
    }

    /// Solvency gate: refuse a till-funded expense larger than the cash the
    /// till currently holds. Runs under the session lock.
    async fn ensure_solvent(&self, session: &TillSession, requested: Money) -> LedgerResult<()> {
        let available = live_expected_cash(&self.db, session).await?;
        if requested > available {
            warn!(
                session_id = %session.id,
                %available,
                %requested,
                "till-funded expense refused by solvency gate"
            );
            return Err(CoreError::InsufficientFunds {
                available,
                requested,
            }
            .into());
        }
        Ok(())
    }

    /// Audit record for cash returning to the drawer after an expense
    /// deletion. The balance itself is already correct (the row is gone);
    /// this logs the movement and its new available figure.
    async fn restore_till_cash(&self, session: &TillSession, deleted: &Expense) -> LedgerResult<()> {
        let available = live_expected_cash(&self.db, session).await?;
        info!(
            session_id = %session.id,
            expense_id = %deleted.id,
            restored = %deleted.amount,
            %available,
            "till cash restored after expense deletion"
        );
        Ok(())
    }
}
