//! # Reconciler
//!
//! Closes a session: computes the expectation, classifies the declared
//! count, freezes the snapshot.
//!
//! ## Close Sequence
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  close_session(id, declared_cash)                                       │
//! │                                                                         │
//! │   lock(session)                                                         │
//! │     ├─ ensure OPEN                                                      │
//! │     ├─ fetch orders / entries / expenses / invoices                     │
//! │     ├─ expected  = conservation formula (caja-core)                     │
//! │     ├─ outcome   = reconcile(expected, declared, tolerance)             │
//! │     ├─ snapshot  = sales_by_tender + expenses_by_category               │
//! │     └─ UPDATE ... WHERE version = read version                          │
//! │              │                                                          │
//! │              └─ 0 rows ──► ConcurrencyConflict (retry from fresh read)  │
//! │                                                                         │
//! │  After close the snapshot is immutable. Approve/reject touch status,   │
//! │  approver, and notes only.                                             │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::Utc;
use std::sync::Arc;
use tracing::{info, instrument, warn};

use caja_core::error::ValidationError;
use caja_core::reconcile::{aggregate_sales, expenses_by_category, reconcile};
use caja_core::{Money, SessionStatus, TillSession};
use caja_db::Database;

use crate::config::LedgerConfig;
use crate::error::LedgerResult;
use crate::locks::SessionLocks;

/// Service that closes and reconciles sessions.
#[derive(Debug, Clone)]
pub struct Reconciler {
    db: Database,
    locks: Arc<SessionLocks>,
    config: LedgerConfig,
}

impl Reconciler {
    pub fn new(db: Database, locks: Arc<SessionLocks>, config: LedgerConfig) -> Self {
        Reconciler { db, locks, config }
    }

    /// Closes an OPEN session against the operator's physical count.
    ///
    /// `declared_cash` may be zero (an emptied drawer) but never negative.
    #[instrument(skip(self, notes), fields(session_id = %id, declared = %declared_cash))]
    pub async fn close_session(
        &self,
        id: &str,
        declared_cash: Money,
        notes: Option<String>,
    ) -> LedgerResult<TillSession> {
        if declared_cash.is_negative() {
            return Err(ValidationError::InvalidFormat {
                field: "declared_cash",
                reason: "cannot be negative".to_string(),
            }
            .into());
        }

        let _guard = self.locks.lock(id).await;

        let mut session = self.db.sessions().get_by_id(id).await?;
        session.ensure_open("close")?;

        let orders = self.db.orders().find_by_session(&session.id).await?;
        let entries = self.db.cash_entries().find_by_session(&session.id).await?;
        let expenses = self.db.expenses().find_by_session(&session.id).await?;
        let invoices = self.db.invoices().find_by_session(&session.id).await?;

        let sales = aggregate_sales(&orders, &session.id);
        let expected = caja_core::reconcile::expected_cash(
            &session.id,
            session.opening_cash(),
            &orders,
            &entries,
            &expenses,
            &invoices,
        );
        let outcome = reconcile(expected, declared_cash, self.config.tolerance);

        let expected_version = session.version;
        session.status = SessionStatus::Closed;
        session.sales_by_tender = sales.by_tender;
        session.expenses_by_category = expenses_by_category(&expenses);
        session.declared_cash = Some(outcome.declared_cash);
        session.expected_cash = Some(outcome.expected_cash);
        session.discrepancy = Some(outcome.discrepancy);
        session.reconciled = outcome.reconciled;
        session.closed_at = Some(Utc::now());
        if let Some(note) = notes.as_deref() {
            session.append_note(note);
        }

        self.db.sessions().update(&session, expected_version).await?;
        session.version = expected_version + 1;

        if outcome.reconciled {
            info!(
                expected = %outcome.expected_cash,
                discrepancy = %outcome.discrepancy,
                "session closed, reconciled"
            );
        } else {
            warn!(
                expected = %outcome.expected_cash,
                discrepancy = %outcome.discrepancy,
                tolerance = %self.config.tolerance,
                "session closed with discrepancy past tolerance"
            );
        }

        Ok(session)
    }
}
