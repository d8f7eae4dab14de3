//! # Purchase Invoice Repository
//!
//! Data access for the `purchase_invoices` table. Invoices belong to the
//! invoicing collaborator; the ledger inserts the slim projection it needs
//! and reads it back for the conservation formula.

use sqlx::SqlitePool;
use tracing::instrument;

use caja_core::PurchaseInvoice;

use crate::error::DbResult;

/// Repository for purchase invoice data access.
#[derive(Debug, Clone)]
pub struct InvoiceRepository {
    pool: SqlitePool,
}

impl InvoiceRepository {
    /// Creates a new repository with the given pool.
    pub fn new(pool: SqlitePool) -> Self {
        InvoiceRepository { pool }
    }

    /// Inserts an invoice record.
    #[instrument(skip(self, invoice), fields(invoice_id = %invoice.id))]
    pub async fn insert(&self, invoice: &PurchaseInvoice) -> DbResult<()> {
        sqlx::query(
            "INSERT INTO purchase_invoices (id, session_id, total, tender, paid_from_till, \
             issued_at) \
             VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(&invoice.id)
        .bind(&invoice.session_id)
        .bind(invoice.total)
        .bind(invoice.tender)
        .bind(invoice.paid_from_till)
        .bind(invoice.issued_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Every invoice assigned to a session, oldest first.
    pub async fn find_by_session(&self, session_id: &str) -> DbResult<Vec<PurchaseInvoice>> {
        let invoices = sqlx::query_as(
            "SELECT id, session_id, total, tender, paid_from_till, issued_at \
             FROM purchase_invoices WHERE session_id = ? ORDER BY issued_at ASC",
        )
        .bind(session_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(invoices)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
