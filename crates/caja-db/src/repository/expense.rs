//! # Expense Repository
//!
//! Data access for the `expenses` table. Validation, the solvency gate, and
//! the forced-cash rule all run in the ledger layer before a row gets here.

use sqlx::SqlitePool;
use tracing::instrument;

use caja_core::Expense;

use crate::error::{DbError, DbResult};

/// Repository for expense data access.
#[derive(Debug, Clone)]
pub struct ExpenseRepository {
    pool: SqlitePool,
}

impl ExpenseRepository {
    /// Creates a new repository with the given pool.
    pub fn new(pool: SqlitePool) -> Self {
        ExpenseRepository { pool }
    }

    /// Inserts an expense record.
    #[instrument(skip(self, expense), fields(expense_id = %expense.id, session_id = %expense.session_id))]
    pub async fn insert(&self, expense: &Expense) -> DbResult<()> {
        sqlx::query(
            "INSERT INTO expenses (id, session_id, amount, tender, paid_from_till, \
             category, description, occurred_at) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&expense.id)
        .bind(&expense.session_id)
        .bind(expense.amount)
        .bind(expense.tender)
        .bind(expense.paid_from_till)
        .bind(&expense.category)
        .bind(&expense.description)
        .bind(expense.occurred_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Fetches an expense by id.
    pub async fn get_by_id(&self, id: &str) -> DbResult<Expense> {
        let expense: Option<Expense> = sqlx::query_as(
            "SELECT id, session_id, amount, tender, paid_from_till, category, \
             description, occurred_at \
             FROM expenses WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        expense.ok_or_else(|| DbError::not_found("expense", id))
    }

    /// Every expense posted against a session, oldest first.
    pub async fn find_by_session(&self, session_id: &str) -> DbResult<Vec<Expense>> {
        let expenses = sqlx::query_as(
            "SELECT id, session_id, amount, tender, paid_from_till, category, \
             description, occurred_at \
             FROM expenses WHERE session_id = ? ORDER BY occurred_at ASC",
        )
        .bind(session_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(expenses)
    }

    /// Deletes an expense row. Removing the row is what restores the till
    /// balance: the cash expectation is recomputed from surviving rows.
    pub async fn delete(&self, id: &str) -> DbResult<()> {
        let result = sqlx::query("DELETE FROM expenses WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("expense", id));
        }
        Ok(())
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::{Database, DbConfig};
    use caja_core::{Money, TenderType, TillSession};
    use chrono::Utc;
    use std::collections::BTreeMap;

    async fn db_with_session() -> Database {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let session = TillSession::open(
            "s-1",
            "Caja",
            "ana",
            Money::from_minor(500_000),
            BTreeMap::new(),
            Utc::now(),
        );
        db.sessions().insert(&session).await.unwrap();
        db
    }

    fn sample_expense(id: &str) -> Expense {
        Expense {
            id: id.to_string(),
            session_id: "s-1".to_string(),
            amount: Money::from_minor(50_000),
            tender: TenderType::Cash,
            paid_from_till: true,
            category: "insumos".to_string(),
            description: Some("gas refill".to_string()),
            occurred_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_insert_and_fetch() {
        let db = db_with_session().await;
        let repo = db.expenses();

        repo.insert(&sample_expense("e-1")).await.unwrap();

        let fetched = repo.get_by_id("e-1").await.unwrap();
        assert_eq!(fetched.amount, Money::from_minor(50_000));
        assert!(fetched.paid_from_till);
        assert_eq!(fetched.category, "insumos");
    }

    #[tokio::test]
    async fn test_insert_rejects_missing_session() {
        let db = db_with_session().await;
        let mut expense = sample_expense("e-1");
        expense.session_id = "ghost".to_string();

        let err = db.expenses().insert(&expense).await.unwrap_err();
        assert!(matches!(err, DbError::ForeignKeyViolation { .. }));
    }

    #[tokio::test]
    async fn test_delete_removes_row() {
        let db = db_with_session().await;
        let repo = db.expenses();

        repo.insert(&sample_expense("e-1")).await.unwrap();
        repo.delete("e-1").await.unwrap();

        assert!(repo.find_by_session("s-1").await.unwrap().is_empty());
        let err = repo.delete("e-1").await.unwrap_err();
        assert!(matches!(err, DbError::NotFound { .. }));
    }
}
