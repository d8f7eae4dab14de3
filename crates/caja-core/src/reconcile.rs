//! # Reconciliation Math
//!
//! The pure heart of the ledger: sales aggregation, the money-conservation
//! formula, and tolerance classification.
//!
//! ## The Conservation Invariant
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  expected_cash(session) =                                               │
//! │        opening_float[CASH]                                              │
//! │      + Σ cash settled orders      (status = SETTLED, this session)      │
//! │      + Σ cash manual entries      (this session)                        │
//! │      - Σ cash till-funded expenses                                      │
//! │      - Σ cash till-funded purchase invoices                             │
//! │                                                                         │
//! │  There is NO append-only transaction log. Totals are recomputed from   │
//! │  the current records every time, so deleting an expense or reversing   │
//! │  an order corrects the total by construction — no compensating ledger  │
//! │  entry, no drift between a cached total and the rows that back it.     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Everything in this module is a pure function over slices. The service
//! layer fetches the records; this module never sees a database.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::money::Money;
use crate::tender::TenderType;
use crate::types::{Expense, ManualCashEntry, OrderStatus, PurchaseInvoice, SettledOrder};

// =============================================================================
// Sales Report
// =============================================================================

/// Per-tender sales totals for one session.
///
/// Derived, never stored authoritatively: a report is a snapshot of the
/// order stream at the moment it was computed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SalesReport {
    /// Totals grouped by tender type.
    pub by_tender: BTreeMap<TenderType, Money>,
    /// Grand total across all tenders.
    pub total: Money,
    /// Number of contributing orders.
    pub count: usize,
}

impl SalesReport {
    /// The cash bucket, or zero when no cash order settled.
    pub fn cash(&self) -> Money {
        self.by_tender
            .get(&TenderType::Cash)
            .copied()
            .unwrap_or_default()
    }
}

/// Sums settled orders for `session_id`, grouped by tender type.
///
/// - Only `status = Settled` contributes; reversed orders drop out of the
///   totals simply by carrying the `Reversed` tag.
/// - Only orders assigned to the session contribute; unassigned orders are
///   an anomaly reported elsewhere, never counted here.
/// - Purchase-type documents never pass through this function; sales are
///   income, invoices are outflow, and the two never share a sign.
pub fn aggregate_sales(orders: &[SettledOrder], session_id: &str) -> SalesReport {
    let mut report = SalesReport::default();

    for order in orders {
        if order.status != OrderStatus::Settled {
            continue;
        }
        if order.session_id.as_deref() != Some(session_id) {
            continue;
        }

        *report.by_tender.entry(order.tender).or_default() += order.settled_amount;
        report.total += order.settled_amount;
        report.count += 1;
    }

    report
}

/// Sums expenses for a session grouped by category name.
pub fn expenses_by_category(expenses: &[Expense]) -> BTreeMap<String, Money> {
    let mut by_category: BTreeMap<String, Money> = BTreeMap::new();
    for expense in expenses {
        *by_category.entry(expense.category.clone()).or_default() += expense.amount;
    }
    by_category
}

// =============================================================================
// Expected Cash
// =============================================================================

/// Computes the cash the till should physically hold.
///
/// This is the single implementation of the conservation formula; the
/// solvency gate, the reconciler, and the summary all call it with freshly
/// fetched records.
pub fn expected_cash(
    session_id: &str,
    opening_cash: Money,
    orders: &[SettledOrder],
    entries: &[ManualCashEntry],
    expenses: &[Expense],
    invoices: &[PurchaseInvoice],
) -> Money {
    let cash_sales = aggregate_sales(orders, session_id).cash();

    let cash_in: Money = entries
        .iter()
        .filter(|e| e.session_id == session_id && e.tender.is_cash())
        .map(|e| e.amount)
        .sum();

    let expense_out: Money = expenses
        .iter()
        .filter(|e| e.session_id == session_id && e.drains_till())
        .map(|e| e.amount)
        .sum();

    let invoice_out: Money = invoices
        .iter()
        .filter(|i| i.session_id.as_deref() == Some(session_id) && i.drains_till())
        .map(|i| i.total)
        .sum();

    opening_cash + cash_sales + cash_in - expense_out - invoice_out
}

// =============================================================================
// Reconciliation
// =============================================================================

/// The frozen outcome of closing a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reconciliation {
    /// Computed expectation at the moment of close.
    pub expected_cash: Money,
    /// Physically counted cash reported by the operator.
    pub declared_cash: Money,
    /// `|expected - declared|`. Always non-negative.
    pub discrepancy: Money,
    /// Whether the discrepancy is within tolerance (inclusive boundary).
    pub reconciled: bool,
}

/// Classifies a declared count against the computed expectation.
///
/// The boundary is inclusive: a discrepancy exactly equal to the tolerance
/// still reconciles. One unit past it does not.
pub fn reconcile(expected_cash: Money, declared_cash: Money, tolerance: Money) -> Reconciliation {
    let discrepancy = (expected_cash - declared_cash).abs();
    Reconciliation {
        expected_cash,
        declared_cash,
        discrepancy,
        reconciled: discrepancy <= tolerance,
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
