//! # Sales Aggregation Service
//!
//! Live sales figures for a session. Nothing here is stored: every call
//! re-reads the order stream and folds it with the pure aggregation in
//! caja-core, so a reversal is reflected the moment its tag flips.

use tracing::instrument;

use caja_core::reconcile::{aggregate_sales, expected_cash};
use caja_core::{Money, SalesReport, TillSession};
use caja_db::Database;

use crate::error::LedgerResult;

/// Read-side service for sales totals.
#[derive(Debug, Clone)]
pub struct SalesAggregator {
    db: Database,
}

impl SalesAggregator {
    pub fn new(db: Database) -> Self {
        SalesAggregator { db }
    }

    /// Per-tender sales totals for a session, computed from the current
    /// order records.
    #[instrument(skip(self))]
    pub async fn sales_report(&self, session_id: &str) -> LedgerResult<SalesReport> {
        // Existence check so a typo'd id reads as NotFound, not an empty report
        let session = self.db.sessions().get_by_id(session_id).await?;
        let orders = self.db.orders().find_by_session(&session.id).await?;
        Ok(aggregate_sales(&orders, &session.id))
    }
}

/// Computes the live cash expectation for a session from freshly fetched
/// records. Shared by the solvency gate, the reconciler, and summaries.
pub(crate) async fn live_expected_cash(db: &Database, session: &TillSession) -> LedgerResult<Money> {
    let orders = db.orders().find_by_session(&session.id).await?;
    let entries = db.cash_entries().find_by_session(&session.id).await?;
    let expenses = db.expenses().find_by_session(&session.id).await?;
    let invoices = db.invoices().find_by_session(&session.id).await?;

    Ok(expected_cash(
        &session.id,
        session.opening_cash(),
        &orders,
        &entries,
        &expenses,
        &invoices,
    ))
}
