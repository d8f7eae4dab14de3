//! # Till Session Repository
//!
//! Data access for the `till_sessions` table.
//!
//! ## Row Mapping
//! `TillSession` carries three `BTreeMap` breakdowns that live in the
//! database as JSON TEXT columns, so the table row is materialized into a
//! private `SessionRow` first and then decoded. A row whose JSON cannot be
//! decoded surfaces as `DbError::CorruptColumn` rather than as an empty map.
//!
//! ## Version Guard
//! `update()` is the only write path for an existing session, and it always
//! runs `WHERE id = ? AND version = ?`. Zero affected rows means another
//! writer committed first; the caller gets `DbError::StaleVersion` and
//! retries from a fresh read.

use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use std::collections::BTreeMap;
use tracing::{debug, instrument};

use caja_core::{Money, SessionStatus, TenderType, TillSession};

use crate::error::{DbError, DbResult};

// =============================================================================
// Row Type
// =============================================================================

/// Raw `till_sessions` row; JSON columns still encoded.
#[derive(Debug, sqlx::FromRow)]
struct SessionRow {
    id: String,
    name: String,
    operator: String,
    status: SessionStatus,
    opening_float: Money,
    opening_breakdown: String,
    sales_by_tender: String,
    expenses_by_category: String,
    declared_cash: Option<Money>,
    expected_cash: Option<Money>,
    discrepancy: Option<Money>,
    reconciled: bool,
    notes: Option<String>,
    decided_by: Option<String>,
    decided_at: Option<DateTime<Utc>>,
    opened_at: DateTime<Utc>,
    closed_at: Option<DateTime<Utc>>,
    version: i64,
}

impl TryFrom<SessionRow> for TillSession {
    type Error = DbError;

    fn try_from(row: SessionRow) -> Result<Self, Self::Error> {
        let decode_tender_map =
            |raw: &str, column: &'static str| -> DbResult<BTreeMap<TenderType, Money>> {
                serde_json::from_str(raw).map_err(|e| DbError::CorruptColumn {
                    entity: "session".to_string(),
                    id: row.id.clone(),
                    column,
                    reason: e.to_string(),
                })
            };
        let expenses_by_category: BTreeMap<String, Money> =
            serde_json::from_str(&row.expenses_by_category).map_err(|e| {
                DbError::CorruptColumn {
                    entity: "session".to_string(),
                    id: row.id.clone(),
                    column: "expenses_by_category",
                    reason: e.to_string(),
                }
            })?;

        Ok(TillSession {
            opening_breakdown: decode_tender_map(&row.opening_breakdown, "opening_breakdown")?,
            sales_by_tender: decode_tender_map(&row.sales_by_tender, "sales_by_tender")?,
            expenses_by_category,
            id: row.id,
            name: row.name,
            operator: row.operator,
            status: row.status,
            opening_float: row.opening_float,
            declared_cash: row.declared_cash,
            expected_cash: row.expected_cash,
            discrepancy: row.discrepancy,
            reconciled: row.reconciled,
            notes: row.notes,
            decided_by: row.decided_by,
            decided_at: row.decided_at,
            opened_at: row.opened_at,
            closed_at: row.closed_at,
            version: row.version,
        })
    }
}

fn encode_json<T: serde::Serialize>(value: &T) -> DbResult<String> {
    serde_json::to_string(value).map_err(|e| DbError::Internal(e.to_string()))
}

// =============================================================================
// Repository
// =============================================================================

/// Repository for till session data access.
#[derive(Debug, Clone)]
pub struct SessionRepository {
    pool: SqlitePool,
}

const SELECT_COLUMNS: &str = "id, name, operator, status, opening_float, opening_breakdown, \
     sales_by_tender, expenses_by_category, declared_cash, expected_cash, discrepancy, \
     reconciled, notes, decided_by, decided_at, opened_at, closed_at, version";

impl SessionRepository {
    /// Creates a new repository with the given pool.
    pub fn new(pool: SqlitePool) -> Self {
        SessionRepository { pool }
    }

    /// Inserts a new session.
    #[instrument(skip(self, session), fields(session_id = %session.id))]
    pub async fn insert(&self, session: &TillSession) -> DbResult<()> {
        debug!(operator = %session.operator, "inserting session");

        sqlx::query(
            "INSERT INTO till_sessions (id, name, operator, status, opening_float, \
             opening_breakdown, sales_by_tender, expenses_by_category, declared_cash, \
             expected_cash, discrepancy, reconciled, notes, decided_by, decided_at, \
             opened_at, closed_at, version) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&session.id)
        .bind(&session.name)
        .bind(&session.operator)
        .bind(session.status)
        .bind(session.opening_float)
        .bind(encode_json(&session.opening_breakdown)?)
        .bind(encode_json(&session.sales_by_tender)?)
        .bind(encode_json(&session.expenses_by_category)?)
        .bind(session.declared_cash)
        .bind(session.expected_cash)
        .bind(session.discrepancy)
        .bind(session.reconciled)
        .bind(&session.notes)
        .bind(&session.decided_by)
        .bind(session.decided_at)
        .bind(session.opened_at)
        .bind(session.closed_at)
        .bind(session.version)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Fetches a session by id.
    pub async fn get_by_id(&self, id: &str) -> DbResult<TillSession> {
        let row: Option<SessionRow> = sqlx::query_as(&format!(
            "SELECT {SELECT_COLUMNS} FROM till_sessions WHERE id = ?"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => row.try_into(),
            None => Err(DbError::not_found("session", id)),
        }
    }

    /// Returns the currently OPEN session, if any.
    ///
    /// The registry enforces at most one; this query takes the oldest if an
    /// out-of-band write ever left more than one behind.
    pub async fn find_active(&self) -> DbResult<Option<TillSession>> {
        let row: Option<SessionRow> = sqlx::query_as(&format!(
            "SELECT {SELECT_COLUMNS} FROM till_sessions WHERE status = 'open' \
             ORDER BY opened_at ASC LIMIT 1"
        ))
        .fetch_optional(&self.pool)
        .await?;

        row.map(TillSession::try_from).transpose()
    }

    /// Lists every session, newest first.
    pub async fn list_all(&self) -> DbResult<Vec<TillSession>> {
        let rows: Vec<SessionRow> = sqlx::query_as(&format!(
            "SELECT {SELECT_COLUMNS} FROM till_sessions ORDER BY opened_at DESC"
        ))
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(TillSession::try_from).collect()
    }

    /// Lists sessions in a given lifecycle state, newest first.
    pub async fn list_by_status(&self, status: SessionStatus) -> DbResult<Vec<TillSession>> {
        let rows: Vec<SessionRow> = sqlx::query_as(&format!(
            "SELECT {SELECT_COLUMNS} FROM till_sessions WHERE status = ? \
             ORDER BY opened_at DESC"
        ))
        .bind(status)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(TillSession::try_from).collect()
    }

    /// Lists sessions opened by a given operator, newest first.
    pub async fn list_by_operator(&self, operator: &str) -> DbResult<Vec<TillSession>> {
        let rows: Vec<SessionRow> = sqlx::query_as(&format!(
            "SELECT {SELECT_COLUMNS} FROM till_sessions WHERE operator = ? \
             ORDER BY opened_at DESC"
        ))
        .bind(operator)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(TillSession::try_from).collect()
    }

    /// Lists sessions opened within `[start, end)`, oldest first.
    pub async fn list_between(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> DbResult<Vec<TillSession>> {
        let rows: Vec<SessionRow> = sqlx::query_as(&format!(
            "SELECT {SELECT_COLUMNS} FROM till_sessions \
             WHERE opened_at >= ? AND opened_at < ? ORDER BY opened_at ASC"
        ))
        .bind(start)
        .bind(end)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(TillSession::try_from).collect()
    }

    /// Persists a mutated session under the optimistic version guard.
    ///
    /// `expected_version` is the version the caller read; the stored row is
    /// bumped to `expected_version + 1`. Zero affected rows means a
    /// concurrent writer got there first.
    #[instrument(skip(self, session), fields(session_id = %session.id, expected_version))]
    pub async fn update(&self, session: &TillSession, expected_version: i64) -> DbResult<()> {
        let result = sqlx::query(
            "UPDATE till_sessions SET name = ?, operator = ?, status = ?, opening_float = ?, \
             opening_breakdown = ?, sales_by_tender = ?, expenses_by_category = ?, \
             declared_cash = ?, expected_cash = ?, discrepancy = ?, reconciled = ?, \
             notes = ?, decided_by = ?, decided_at = ?, opened_at = ?, closed_at = ?, \
             version = ? \
             WHERE id = ? AND version = ?",
        )
        .bind(&session.name)
        .bind(&session.operator)
        .bind(session.status)
        .bind(session.opening_float)
        .bind(encode_json(&session.opening_breakdown)?)
        .bind(encode_json(&session.sales_by_tender)?)
        .bind(encode_json(&session.expenses_by_category)?)
        .bind(session.declared_cash)
        .bind(session.expected_cash)
        .bind(session.discrepancy)
        .bind(session.reconciled)
        .bind(&session.notes)
        .bind(&session.decided_by)
        .bind(session.decided_at)
        .bind(session.opened_at)
        .bind(session.closed_at)
        .bind(expected_version + 1)
        .bind(&session.id)
        .bind(expected_version)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            // Distinguish missing row from version conflict
            let exists: Option<i64> =
                sqlx::query_scalar("SELECT 1 FROM till_sessions WHERE id = ?")
                    .bind(&session.id)
                    .fetch_optional(&self.pool)
                    .await?;

            return Err(match exists {
                Some(_) => DbError::stale_version("session", &session.id, expected_version),
                None => DbError::not_found("session", &session.id),
            });
        }

        debug!(new_version = expected_version + 1, "session updated");
        Ok(())
    }

    /// Deletes a session row. The caller is responsible for the
    /// only-pending-and-empty policy; foreign keys stop a delete that
    /// would orphan activity rows.
    pub async fn delete(&self, id: &str) -> DbResult<()> {
        let result = sqlx::query("DELETE FROM till_sessions WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("session", id));
        }
        Ok(())
    }

    /// Whether any activity row (order, expense, invoice, cash entry)
    /// references the session.
    pub async fn has_activity(&self, id: &str) -> DbResult<bool> {
        let found: Option<i64> = sqlx::query_scalar(
            "SELECT 1 WHERE EXISTS (SELECT 1 FROM settled_orders WHERE session_id = ?1) \
             OR EXISTS (SELECT 1 FROM expenses WHERE session_id = ?1) \
             OR EXISTS (SELECT 1 FROM purchase_invoices WHERE session_id = ?1) \
             OR EXISTS (SELECT 1 FROM cash_entries WHERE session_id = ?1)",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(found.is_some())
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::{Database, DbConfig};
    use caja_core::Money;

    async fn test_db() -> Database {
        Database::new(DbConfig::in_memory()).await.unwrap()
    }

    fn sample_session(id: &str) -> TillSession {
        TillSession::open(
            id,
            "Caja principal",
            "ana",
            Money::from_minor(500_000),
            BTreeMap::new(),
            Utc::now(),
        )
    }

    #[tokio::test]
    async fn test_insert_and_get_roundtrip() {
        let db = test_db().await;
        let repo = db.sessions();

        let session = sample_session("s-1");
        repo.insert(&session).await.unwrap();

        let fetched = repo.get_by_id("s-1").await.unwrap();
        assert_eq!(fetched.name, "Caja principal");
        assert_eq!(fetched.status, SessionStatus::Open);
        assert_eq!(fetched.opening_float, Money::from_minor(500_000));
        assert_eq!(
            fetched.opening_breakdown.get(&TenderType::Cash),
            Some(&Money::from_minor(500_000))
        );
        assert_eq!(fetched.version, 0);
    }

    #[tokio::test]
    async fn test_get_missing_returns_not_found() {
        let db = test_db().await;
        let err = db.sessions().get_by_id("nope").await.unwrap_err();
        assert!(matches!(err, DbError::NotFound { .. }));
    }

    #[tokio::test]
    async fn test_find_active() {
        let db = test_db().await;
        let repo = db.sessions();

        assert!(repo.find_active().await.unwrap().is_none());

        repo.insert(&sample_session("s-1")).await.unwrap();
        let active = repo.find_active().await.unwrap().unwrap();
        assert_eq!(active.id, "s-1");
    }

    #[tokio::test]
    async fn test_second_open_row_violates_unique_index() {
        let db = test_db().await;
        let repo = db.sessions();

        repo.insert(&sample_session("s-1")).await.unwrap();
        let err = repo.insert(&sample_session("s-2")).await.unwrap_err();
        assert!(matches!(err, DbError::UniqueViolation { .. }));

        // A closed row does not occupy the partial index
        let mut closed = sample_session("s-3");
        closed.status = SessionStatus::Closed;
        repo.insert(&closed).await.unwrap();
    }

    #[tokio::test]
    async fn test_update_bumps_version() {
        let db = test_db().await;
        let repo = db.sessions();

        let mut session = sample_session("s-1");
        repo.insert(&session).await.unwrap();

        session.append_note("first note");
        repo.update(&session, 0).await.unwrap();

        let fetched = repo.get_by_id("s-1").await.unwrap();
        assert_eq!(fetched.version, 1);
        assert_eq!(fetched.notes.as_deref(), Some("first note"));
    }

    #[tokio::test]
    async fn test_update_stale_version_rejected() {
        let db = test_db().await;
        let repo = db.sessions();

        let session = sample_session("s-1");
        repo.insert(&session).await.unwrap();
        repo.update(&session, 0).await.unwrap();

        // Second write with the already-consumed version
        let err = repo.update(&session, 0).await.unwrap_err();
        assert!(matches!(err, DbError::StaleVersion { .. }));
    }

    #[tokio::test]
    async fn test_delete_and_has_activity() {
        let db = test_db().await;
        let repo = db.sessions();

        repo.insert(&sample_session("s-1")).await.unwrap();
        assert!(!repo.has_activity("s-1").await.unwrap());

        repo.delete("s-1").await.unwrap();
        let err = repo.get_by_id("s-1").await.unwrap_err();
        assert!(matches!(err, DbError::NotFound { .. }));
    }

    #[tokio::test]
    async fn test_list_by_status_and_operator() {
        let db = test_db().await;
        let repo = db.sessions();

        let mut a = sample_session("s-a");
        a.operator = "ana".to_string();
        repo.insert(&a).await.unwrap();

        let mut b = sample_session("s-b");
        b.operator = "luis".to_string();
        b.status = SessionStatus::Closed;
        repo.insert(&b).await.unwrap();

        let open = repo.list_by_status(SessionStatus::Open).await.unwrap();
        assert_eq!(open.len(), 1);
        assert_eq!(open[0].id, "s-a");

        let by_luis = repo.list_by_operator("luis").await.unwrap();
        assert_eq!(by_luis.len(), 1);
        assert_eq!(by_luis[0].id, "s-b");
    }
}
