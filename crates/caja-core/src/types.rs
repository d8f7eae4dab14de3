//! # Domain Types
//!
//! Core domain types for the till session ledger.
//!
//! ## Type Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │   TillSession   │   │  SettledOrder   │   │     Expense     │       │
//! │  │  ─────────────  │   │  ─────────────  │   │  ─────────────  │       │
//! │  │  id (UUID)      │   │  id (UUID)      │   │  id (UUID)      │       │
//! │  │  status         │   │  session_id?    │   │  session_id     │       │
//! │  │  opening_float  │   │  tender         │   │  paid_from_till │       │
//! │  │  declared_cash  │   │  settled_amount │   │  category       │       │
//! │  └─────────────────┘   └─────────────────┘   └─────────────────┘       │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │ PurchaseInvoice │   │ ManualCashEntry │   │  SessionStatus  │       │
//! │  │  ─────────────  │   │  ─────────────  │   │  ─────────────  │       │
//! │  │  total          │   │  amount         │   │  Open → Closed  │       │
//! │  │  paid_from_till │   │  tender         │   │   → Approved    │       │
//! │  └─────────────────┘   └─────────────────┘   │   → Rejected    │       │
//! │                                              └─────────────────┘       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Ownership Rules
//! - `TillSession` is owned by the session registry; everything else is a
//!   stream of records that *reference* a session by id.
//! - `SettledOrder` and `PurchaseInvoice` are created by external
//!   collaborators (order management, invoicing); this core reads them and,
//!   for orders, flips `Settled → Reversed`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::error::CoreError;
use crate::money::Money;
use crate::tender::TenderType;

// =============================================================================
// Session Status
// =============================================================================

/// The lifecycle state of a till session.
///
/// ```text
/// OPEN ──► CLOSED ──► APPROVED
///              └────► REJECTED
/// ```
///
/// `Open` is the only entry state. `Approved` and `Rejected` are terminal;
/// there is no path back to `Open`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    /// Session is active; sales settle and expenses post against it.
    Open,
    /// Session has been reconciled; expectation and discrepancy are frozen.
    Closed,
    /// A supervisor accepted the closed session. Terminal.
    Approved,
    /// A supervisor rejected the closed session. Terminal.
    Rejected,
}

impl SessionStatus {
    /// Stable lowercase name, matching the database representation.
    pub const fn as_str(&self) -> &'static str {
        match self {
            SessionStatus::Open => "open",
            SessionStatus::Closed => "closed",
            SessionStatus::Approved => "approved",
            SessionStatus::Rejected => "rejected",
        }
    }
}

// =============================================================================
// Order Status
// =============================================================================

/// The status of a settled order as seen by the ledger.
///
/// Reversal is one-way: `Settled → Reversed`, never back. The order's
/// monetary fields are retained for audit; only the tag changes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    /// Payment completed; the order contributes to session totals.
    Settled,
    /// Financial effect undone; excluded from every recomputation.
    Reversed,
}

// =============================================================================
// Till Session
// =============================================================================

/// One bounded period of register activity, from opening to closing.
///
/// ## Mutability Rules
/// - Mutated only through the registry/ledger services, under the
///   per-session lock.
/// - Once `Closed`, the reconciliation snapshot (`declared_cash`,
///   `expected_cash`, `discrepancy`, `reconciled`) is immutable.
///   Approve/reject annotate status, approver, and notes only.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TillSession {
    /// Unique identifier (UUID v4).
    pub id: String,

    /// Display name for the session (e.g. "Caja principal - turno tarde").
    pub name: String,

    /// The operator responsible for the till.
    pub operator: String,

    /// Lifecycle state.
    pub status: SessionStatus,

    /// Total float placed in the till at opening.
    pub opening_float: Money,

    /// Per-tender breakdown of the opening float.
    /// Defaults to `{cash: opening_float}` when the caller provides none.
    pub opening_breakdown: BTreeMap<TenderType, Money>,

    /// Sales-by-tender snapshot taken at close. Empty while the session is
    /// open; live figures come from the aggregator, never from here.
    pub sales_by_tender: BTreeMap<TenderType, Money>,

    /// Expenses-by-category snapshot taken at close.
    pub expenses_by_category: BTreeMap<String, Money>,

    /// Physically counted cash, reported at close.
    pub declared_cash: Option<Money>,

    /// Computed cash expectation, frozen at close.
    pub expected_cash: Option<Money>,

    /// `|expected - declared|`, frozen at close.
    pub discrepancy: Option<Money>,

    /// Whether the discrepancy fell within tolerance at close.
    pub reconciled: bool,

    /// Free-form notes; close and reject append to this.
    pub notes: Option<String>,

    /// Supervisor who approved or rejected the session.
    pub decided_by: Option<String>,

    /// When the approve/reject decision was recorded.
    pub decided_at: Option<DateTime<Utc>>,

    /// When the session was opened.
    pub opened_at: DateTime<Utc>,

    /// When the session was closed. `None` while open.
    pub closed_at: Option<DateTime<Utc>>,

    /// Optimistic concurrency token; every session UPDATE re-validates it.
    pub version: i64,
}

impl TillSession {
    /// Creates a new OPEN session.
    ///
    /// When `opening_breakdown` is empty the whole float is assumed to be
    /// cash, matching how tills are actually seeded. Fallback for a
    /// non-positive `opening_float` is a registry policy, not applied here.
    pub fn open(
        id: impl Into<String>,
        name: impl Into<String>,
        operator: impl Into<String>,
        opening_float: Money,
        opening_breakdown: BTreeMap<TenderType, Money>,
        opened_at: DateTime<Utc>,
    ) -> Self {
        let opening_breakdown = if opening_breakdown.is_empty() {
            BTreeMap::from([(TenderType::Cash, opening_float)])
        } else {
            opening_breakdown
        };

        TillSession {
            id: id.into(),
            name: name.into(),
            operator: operator.into(),
            status: SessionStatus::Open,
            opening_float,
            opening_breakdown,
            sales_by_tender: BTreeMap::new(),
            expenses_by_category: BTreeMap::new(),
            declared_cash: None,
            expected_cash: None,
            discrepancy: None,
            reconciled: false,
            notes: None,
            decided_by: None,
            decided_at: None,
            opened_at,
            closed_at: None,
            version: 0,
        }
    }

    /// The cash portion of the opening float, as used by the conservation
    /// formula. Falls back to the total float when no cash bucket exists.
    pub fn opening_cash(&self) -> Money {
        self.opening_breakdown
            .get(&TenderType::Cash)
            .copied()
            .unwrap_or(self.opening_float)
    }

    /// Guard: the session must be OPEN for mutating activity.
    pub fn ensure_open(&self, operation: &'static str) -> Result<(), CoreError> {
        if self.status != SessionStatus::Open {
            return Err(CoreError::invalid_state(
                "session",
                self.id.clone(),
                self.status.as_str(),
                operation,
            ));
        }
        Ok(())
    }

    /// Guard: approve/reject is valid only from CLOSED.
    pub fn ensure_closed(&self, operation: &'static str) -> Result<(), CoreError> {
        if self.status != SessionStatus::Closed {
            return Err(CoreError::invalid_state(
                "session",
                self.id.clone(),
                self.status.as_str(),
                operation,
            ));
        }
        Ok(())
    }

    /// Appends a line to the session notes, preserving prior content.
    pub fn append_note(&mut self, note: &str) {
        match &mut self.notes {
            Some(existing) if !existing.is_empty() => {
                existing.push_str(" | ");
                existing.push_str(note);
            }
            _ => self.notes = Some(note.to_string()),
        }
    }
}

// =============================================================================
// Settled Order
// =============================================================================

/// The ledger-relevant subset of a sale whose payment has completed.
///
/// Created by the order-management collaborator at settlement time;
/// referenced, never owned, by this core. `session_id` is `None` until the
/// collaborator assigns the order to a session — such orders are an
/// externally-detectable anomaly, not an internal error, and they feed no
/// session's totals.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct SettledOrder {
    pub id: String,
    pub session_id: Option<String>,
    pub tender: TenderType,
    pub settled_amount: Money,
    pub status: OrderStatus,
    pub settled_at: DateTime<Utc>,
    /// Set when the order is reversed; monetary fields are kept for audit.
    pub reversed_at: Option<DateTime<Utc>>,
    pub reversed_by: Option<String>,
}

impl SettledOrder {
    /// Guard: reversal requires a currently-settled order.
    pub fn ensure_settled(&self, operation: &'static str) -> Result<(), CoreError> {
        if self.status != OrderStatus::Settled {
            return Err(CoreError::invalid_state(
                "order",
                self.id.clone(),
                match self.status {
                    OrderStatus::Settled => "settled",
                    OrderStatus::Reversed => "reversed",
                },
                operation,
            ));
        }
        Ok(())
    }
}

// =============================================================================
// Expense
// =============================================================================

/// An expense posted during a session.
///
/// `paid_from_till = true` means the money physically left the till drawer;
/// such expenses are always cash (the ledger forces the tender) and are
/// gated by the solvency check before they persist.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Expense {
    pub id: String,
    pub session_id: String,
    pub amount: Money,
    pub tender: TenderType,
    pub paid_from_till: bool,
    /// Expense category name (denormalized, as the legacy system kept it).
    pub category: String,
    pub description: Option<String>,
    pub occurred_at: DateTime<Utc>,
}

impl Expense {
    /// Whether this expense subtracts from the conservation formula:
    /// till-funded cash outflows only.
    #[inline]
    pub fn drains_till(&self) -> bool {
        self.paid_from_till && self.tender.is_cash()
    }
}

// =============================================================================
// Purchase Invoice
// =============================================================================

/// The ledger-relevant subset of a supplier invoice.
///
/// Owned by the invoicing collaborator; only `total`, `tender`, and
/// `paid_from_till` are consumed here. An invoice paid from the till is a
/// cash outflow exactly like a till-funded expense.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct PurchaseInvoice {
    pub id: String,
    pub session_id: Option<String>,
    pub total: Money,
    pub tender: TenderType,
    pub paid_from_till: bool,
    pub issued_at: DateTime<Utc>,
}

impl PurchaseInvoice {
    /// Whether this invoice subtracts from the conservation formula.
    #[inline]
    pub fn drains_till(&self) -> bool {
        self.paid_from_till && self.tender.is_cash()
    }
}

// =============================================================================
// Manual Cash Entry
// =============================================================================

/// A manual income entry: cash placed into the till outside a sale
/// (change funds, owner top-ups, found money).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct ManualCashEntry {
    pub id: String,
    pub session_id: String,
    pub amount: Money,
    pub tender: TenderType,
    pub description: Option<String>,
    pub recorded_at: DateTime<Utc>,
}

// =============================================================================
// Unit Tests
// =============================================================================
