//! # Session Summaries and Anomaly Reports
//!
//! One read model for every consumer: live figures for an OPEN session,
//! frozen snapshot for anything closed. The caller never needs to know
//! which path produced the numbers.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeMap;
use tracing::instrument;

use caja_core::reconcile::{aggregate_sales, expected_cash, expenses_by_category, reconcile};
use caja_core::{Money, SessionStatus, SettledOrder, TenderType};
use caja_db::Database;

use crate::config::LedgerConfig;
use crate::error::LedgerResult;

// =============================================================================
// Summary Model
// =============================================================================

/// Full financial picture of one session.
#[derive(Debug, Clone, Serialize)]
pub struct SessionSummary {
    pub session_id: String,
    pub name: String,
    pub operator: String,
    pub status: SessionStatus,

    pub opening_float: Money,
    pub opening_cash: Money,

    /// Sales totals by tender. Live for OPEN sessions, frozen otherwise.
    pub sales_by_tender: BTreeMap<TenderType, Money>,
    pub sales_total: Money,

    pub expenses_by_category: BTreeMap<String, Money>,
    pub expenses_total: Money,

    /// Manual cash income for the session.
    pub cash_entries_total: Money,

    pub expected_cash: Money,
    /// Present once the session closed.
    pub declared_cash: Option<Money>,
    pub discrepancy: Option<Money>,
    pub reconciled: Option<bool>,

    pub notes: Option<String>,
    pub opened_at: DateTime<Utc>,
    pub closed_at: Option<DateTime<Utc>>,
}

// =============================================================================
// Service
// =============================================================================

/// Read-side service producing summaries and anomaly reports.
#[derive(Debug, Clone)]
pub struct SummaryService {
    db: Database,
    config: LedgerConfig,
}

impl SummaryService {
    pub fn new(db: Database, config: LedgerConfig) -> Self {
        SummaryService { db, config }
    }

    /// The financial picture of a session.
    ///
    /// OPEN sessions are computed live from current records, so the figures
    /// move with every sale, expense, and reversal. Closed sessions report
    /// the frozen snapshot exactly as it was at close.
    #[instrument(skip(self))]
    pub async fn session_summary(&self, session_id: &str) -> LedgerResult<SessionSummary> {
        let session = self.db.sessions().get_by_id(session_id).await?;

        if session.status != SessionStatus::Open {
            // Frozen snapshot, straight off the session row
            let sales_total = session.sales_by_tender.values().copied().sum();
            let expenses_total = session.expenses_by_category.values().copied().sum();
            let entries = self.db.cash_entries().find_by_session(&session.id).await?;
            let cash_entries_total = entries.iter().map(|e| e.amount).sum();

            return Ok(SessionSummary {
                session_id: session.id.clone(),
                name: session.name,
                operator: session.operator,
                status: session.status,
                opening_float: session.opening_float,
                opening_cash: session
                    .opening_breakdown
                    .get(&TenderType::Cash)
                    .copied()
                    .unwrap_or(session.opening_float),
                sales_by_tender: session.sales_by_tender,
                sales_total,
                expenses_by_category: session.expenses_by_category,
                expenses_total,
                cash_entries_total,
                expected_cash: session.expected_cash.unwrap_or_default(),
                declared_cash: session.declared_cash,
                discrepancy: session.discrepancy,
                reconciled: Some(session.reconciled),
                notes: session.notes,
                opened_at: session.opened_at,
                closed_at: session.closed_at,
            });
        }

        // Live: recompute everything from current records
        let orders = self.db.orders().find_by_session(&session.id).await?;
        let entries = self.db.cash_entries().find_by_session(&session.id).await?;
        let expenses = self.db.expenses().find_by_session(&session.id).await?;
        let invoices = self.db.invoices().find_by_session(&session.id).await?;

        let sales = aggregate_sales(&orders, &session.id);
        let by_category = expenses_by_category(&expenses);
        let expenses_total = by_category.values().copied().sum();
        let cash_entries_total = entries.iter().map(|e| e.amount).sum();
        let expected = expected_cash(
            &session.id,
            session.opening_cash(),
            &orders,
            &entries,
            &expenses,
            &invoices,
        );

        Ok(SessionSummary {
            session_id: session.id.clone(),
            name: session.name.clone(),
            operator: session.operator.clone(),
            status: session.status,
            opening_float: session.opening_float,
            opening_cash: session.opening_cash(),
            sales_total: sales.total,
            sales_by_tender: sales.by_tender,
            expenses_by_category: by_category,
            expenses_total,
            cash_entries_total,
            expected_cash: expected,
            declared_cash: None,
            discrepancy: None,
            reconciled: None,
            notes: session.notes,
            opened_at: session.opened_at,
            closed_at: None,
        })
    }

    /// What close WOULD report for a hypothetical declared count, without
    /// closing anything. An operator pre-counts the drawer with this.
    #[instrument(skip(self))]
    pub async fn preview_reconciliation(
        &self,
        session_id: &str,
        declared_cash: Money,
    ) -> LedgerResult<caja_core::Reconciliation> {
        let summary = self.session_summary(session_id).await?;
        Ok(reconcile(
            summary.expected_cash,
            declared_cash,
            self.config.tolerance,
        ))
    }

    /// Settled orders that belong to no session, settled within
    /// `[start, end)`. Money that entered some drawer but counts toward no
    /// reconciliation; supervisors chase these down.
    #[instrument(skip(self))]
    pub async fn unassigned_settled(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> LedgerResult<Vec<SettledOrder>> {
        Ok(self.db.orders().find_settled_unassigned(start, end).await?)
    }
}
