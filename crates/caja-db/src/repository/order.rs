//! # Settled Order Repository
//!
//! Data access for the `settled_orders` table.
//!
//! Orders are created by order management and read here for aggregation.
//! The only write the ledger performs on an order is the reversal tag flip,
//! guarded by `WHERE status = 'settled'` so a repeated reversal is a no-op
//! at the SQL level.

use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use tracing::{debug, instrument};

use caja_core::SettledOrder;

use crate::error::{DbError, DbResult};

/// Repository for settled order data access.
#[derive(Debug, Clone)]
pub struct OrderRepository {
    pool: SqlitePool,
}

impl OrderRepository {
    /// Creates a new repository with the given pool.
    pub fn new(pool: SqlitePool) -> Self {
        OrderRepository { pool }
    }

    /// Inserts a settled order record.
    #[instrument(skip(self, order), fields(order_id = %order.id))]
    pub async fn insert(&self, order: &SettledOrder) -> DbResult<()> {
        sqlx::query(
            "INSERT INTO settled_orders (id, session_id, tender, settled_amount, status, \
             settled_at, reversed_at, reversed_by) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&order.id)
        .bind(&order.session_id)
        .bind(order.tender)
        .bind(order.settled_amount)
        .bind(order.status)
        .bind(order.settled_at)
        .bind(order.reversed_at)
        .bind(&order.reversed_by)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Fetches an order by id.
    pub async fn get_by_id(&self, id: &str) -> DbResult<SettledOrder> {
        let order: Option<SettledOrder> = sqlx::query_as(
            "SELECT id, session_id, tender, settled_amount, status, settled_at, \
             reversed_at, reversed_by \
             FROM settled_orders WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        order.ok_or_else(|| DbError::not_found("order", id))
    }

    /// Every order assigned to a session, settled and reversed alike,
    /// oldest first. Callers filter by status.
    pub async fn find_by_session(&self, session_id: &str) -> DbResult<Vec<SettledOrder>> {
        let orders = sqlx::query_as(
            "SELECT id, session_id, tender, settled_amount, status, settled_at, \
             reversed_at, reversed_by \
             FROM settled_orders WHERE session_id = ? ORDER BY settled_at ASC",
        )
        .bind(session_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(orders)
    }

    /// Flips `settled → reversed`, recording who and when.
    ///
    /// Returns `true` when the flip happened, `false` when the order was
    /// already reversed. The status guard in the WHERE clause is what makes
    /// the operation idempotent under concurrent submission.
    #[instrument(skip(self), fields(order_id = %id, actor = %reversed_by))]
    pub async fn mark_reversed(
        &self,
        id: &str,
        reversed_by: &str,
        reversed_at: DateTime<Utc>,
    ) -> DbResult<bool> {
        let result = sqlx::query(
            "UPDATE settled_orders SET status = 'reversed', reversed_at = ?, reversed_by = ? \
             WHERE id = ? AND status = 'settled'",
        )
        .bind(reversed_at)
        .bind(reversed_by)
        .bind(id)
        .execute(&self.pool)
        .await?;

        let flipped = result.rows_affected() > 0;
        debug!(flipped, "reversal write complete");
        Ok(flipped)
    }

    /// Settled orders with no session assignment, settled within
    /// `[start, end)`. These feed the anomaly report, not any session total.
    pub async fn find_settled_unassigned(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> DbResult<Vec<SettledOrder>> {
        let orders = sqlx::query_as(
            "SELECT id, session_id, tender, settled_amount, status, settled_at, \
             reversed_at, reversed_by \
             FROM settled_orders \
             WHERE session_id IS NULL AND status = 'settled' \
             AND settled_at >= ? AND settled_at < ? \
             ORDER BY settled_at ASC",
        )
        .bind(start)
        .bind(end)
        .fetch_all(&self.pool)
        .await?;

        Ok(orders)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::{Database, DbConfig};
    use caja_core::{Money, OrderStatus, TenderType, TillSession};
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

    fn sample_order(id: &str, session_id: Option<&str>) -> SettledOrder {
        SettledOrder {
            id: id.to_string(),
            session_id: session_id.map(String::from),
            tender: TenderType::Cash,
            settled_amount: Money::from_minor(120_000),
            status: OrderStatus::Settled,
            settled_at: Utc::now(),
            reversed_at: None,
            reversed_by: None,
        }
    }

    #[tokio::test]
    async fn test_insert_and_find_by_session() {
        let db = db_with_session().await;
        let repo = db.orders();

        repo.insert(&sample_order("o-1", Some("s-1"))).await.unwrap();
        repo.insert(&sample_order("o-2", Some("s-1"))).await.unwrap();

        let orders = repo.find_by_session("s-1").await.unwrap();
        assert_eq!(orders.len(), 2);
        assert_eq!(orders[0].settled_amount, Money::from_minor(120_000));
    }

    #[tokio::test]
    async fn test_mark_reversed_is_idempotent() {
        let db = db_with_session().await;
        let repo = db.orders();

        repo.insert(&sample_order("o-1", Some("s-1"))).await.unwrap();

        let first = repo.mark_reversed("o-1", "luis", Utc::now()).await.unwrap();
        assert!(first);

        // Second submission finds nothing to flip
        let second = repo.mark_reversed("o-1", "luis", Utc::now()).await.unwrap();
        assert!(!second);

        let order = repo.get_by_id("o-1").await.unwrap();
        assert_eq!(order.status, OrderStatus::Reversed);
        assert_eq!(order.reversed_by.as_deref(), Some("luis"));
    }

    #[tokio::test]
    async fn test_find_settled_unassigned() {
        let db = db_with_session().await;
        let repo = db.orders();

        repo.insert(&sample_order("o-1", Some("s-1"))).await.unwrap();
        repo.insert(&sample_order("o-2", None)).await.unwrap();

        let start = Utc::now() - chrono::Duration::hours(1);
        let end = Utc::now() + chrono::Duration::hours(1);
        let unassigned = repo.find_settled_unassigned(start, end).await.unwrap();
        assert_eq!(unassigned.len(), 1);
        assert_eq!(unassigned[0].id, "o-2");
    }
}
