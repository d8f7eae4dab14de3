//! # Manual Cash Entry Repository
//!
//! Data access for the `cash_entries` table: till income recorded outside a
//! sale (change funds, owner top-ups, found money).

use sqlx::SqlitePool;
use tracing::instrument;

use caja_core::ManualCashEntry;

use crate::error::{DbError, DbResult};

/// Repository for manual cash entry data access.
#[derive(Debug, Clone)]
pub struct CashEntryRepository {
    pool: SqlitePool,
}

impl CashEntryRepository {
    /// Creates a new repository with the given pool.
    pub fn new(pool: SqlitePool) -> Self {
        CashEntryRepository { pool }
    }

    /// Inserts a cash entry record.
    #[instrument(skip(self, entry), fields(entry_id = %entry.id, session_id = %entry.session_id))]
    pub async fn insert(&self, entry: &ManualCashEntry) -> DbResult<()> {
        sqlx::query(
            "INSERT INTO cash_entries (id, session_id, amount, tender, description, recorded_at) \
             VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(&entry.id)
        .bind(&entry.session_id)
        .bind(entry.amount)
        .bind(entry.tender)
        .bind(&entry.description)
        .bind(entry.recorded_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Fetches a cash entry by id.
    pub async fn get_by_id(&self, id: &str) -> DbResult<ManualCashEntry> {
        let entry: Option<ManualCashEntry> = sqlx::query_as(
            "SELECT id, session_id, amount, tender, description, recorded_at \
             FROM cash_entries WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        entry.ok_or_else(|| DbError::not_found("cash entry", id))
    }

    /// Every cash entry recorded against a session, oldest first.
    pub async fn find_by_session(&self, session_id: &str) -> DbResult<Vec<ManualCashEntry>> {
        let entries = sqlx::query_as(
            "SELECT id, session_id, amount, tender, description, recorded_at \
             FROM cash_entries WHERE session_id = ? ORDER BY recorded_at ASC",
        )
        .bind(session_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(entries)
    }

    /// Deletes a cash entry row.
    pub async fn delete(&self, id: &str) -> DbResult<()> {
        let result = sqlx::query("DELETE FROM cash_entries WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("cash entry", id));
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

    #[tokio::test]
    async fn test_insert_fetch_delete() {
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

        let entry = ManualCashEntry {
            id: "i-1".to_string(),
            session_id: "s-1".to_string(),
            amount: Money::from_minor(30_000),
            tender: TenderType::Cash,
            description: Some("change fund".to_string()),
            recorded_at: Utc::now(),
        };
        db.cash_entries().insert(&entry).await.unwrap();

        let fetched = db.cash_entries().get_by_id("i-1").await.unwrap();
        assert_eq!(fetched.amount, Money::from_minor(30_000));

        db.cash_entries().delete("i-1").await.unwrap();
        assert!(db
            .cash_entries()
            .find_by_session("s-1")
            .await
            .unwrap()
            .is_empty());
    }
}
