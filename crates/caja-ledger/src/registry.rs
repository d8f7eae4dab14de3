//! # Session Registry
//!
//! Owns the session lifecycle outside of close: open, approve, reject,
//! delete, and the query surface.
//!
//! ## Lifecycle
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │   open_session ──► OPEN ──(reconciler.close)──► CLOSED ──► APPROVED    │
//! │        │             │                             │                    │
//! │        │             │ delete_session              └─────► REJECTED    │
//! │        │             ▼ (only while empty)                               │
//! │        │           gone                                                 │
//! │        │                                                                │
//! │   At most ONE session may be OPEN at a time. Opening while another     │
//! │   is open is refused, not queued. The rule is enforced twice: an      │
//! │   early read for a friendly refusal, and a partial unique index over  │
//! │   the 'open' rows that rejects whichever concurrent open loses.       │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::Utc;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use caja_core::error::{require_non_blank, CoreError};
use caja_core::{Money, SessionStatus, TenderType, TillSession};
use caja_db::{Database, DbError};

use crate::config::LedgerConfig;
use crate::error::{LedgerError, LedgerResult};
use crate::locks::SessionLocks;

// =============================================================================
// Inputs
// =============================================================================

/// Request to open a new till session.
#[derive(Debug, Clone)]
pub struct OpenSession {
    /// Display name, e.g. "Caja principal - turno tarde".
    pub name: String,
    /// Operator responsible for the till.
    pub operator: String,
    /// Total float placed in the till. Non-positive values are replaced by
    /// the configured fallback.
    pub opening_float: Money,
    /// Optional per-tender breakdown; empty means all cash.
    pub opening_breakdown: BTreeMap<TenderType, Money>,
}

// =============================================================================
// Registry
// =============================================================================

/// Service owning session open/approve/reject/delete and all queries.
#[derive(Debug, Clone)]
pub struct SessionRegistry {
    db: Database,
    locks: Arc<SessionLocks>,
    config: LedgerConfig,
}

impl SessionRegistry {
    pub fn new(db: Database, locks: Arc<SessionLocks>, config: LedgerConfig) -> Self {
        SessionRegistry { db, locks, config }
    }

    /// Opens a new session.
    ///
    /// Refused while another session is OPEN. A non-positive float is
    /// replaced by the configured fallback (tills never truly open empty).
    #[instrument(skip(self, request), fields(operator = %request.operator))]
    pub async fn open_session(&self, request: OpenSession) -> LedgerResult<TillSession> {
        require_non_blank("name", &request.name)?;
        require_non_blank("operator", &request.operator)?;

        if let Some(active) = self.db.sessions().find_active().await? {
            return Err(CoreError::invalid_state(
                "session",
                active.id,
                "open",
                "open another session",
            )
            .into());
        }

        let opening_float = if request.opening_float.is_positive() {
            request.opening_float
        } else {
            warn!(
                submitted = %request.opening_float,
                fallback = %self.config.fallback_opening_float,
                "non-positive opening float, applying fallback"
            );
            self.config.fallback_opening_float
        };

        let session = TillSession::open(
            Uuid::new_v4().to_string(),
            request.name,
            request.operator,
            opening_float,
            request.opening_breakdown,
            Utc::now(),
        );

        // The check above is unserialized; the unique index over 'open'
        // rows decides races, and the loser gets the same refusal
        match self.db.sessions().insert(&session).await {
            Ok(()) => {}
            Err(DbError::UniqueViolation { .. }) => {
                let winner = self
                    .db
                    .sessions()
                    .find_active()
                    .await?
                    .map(|s| s.id)
                    .unwrap_or_else(|| "unknown".to_string());
                return Err(CoreError::invalid_state(
                    "session",
                    winner,
                    "open",
                    "open another session",
                )
                .into());
            }
            Err(err) => return Err(err.into()),
        }

        info!(session_id = %session.id, float = %session.opening_float, "session opened");
        Ok(session)
    }

    /// The currently OPEN session, if any.
    pub async fn get_active_session(&self) -> LedgerResult<Option<TillSession>> {
        Ok(self.db.sessions().find_active().await?)
    }

    /// Fetches one session by id.
    pub async fn get_session(&self, id: &str) -> LedgerResult<TillSession> {
        Ok(self.db.sessions().get_by_id(id).await?)
    }

    /// Every session, newest first.
    pub async fn list_sessions(&self) -> LedgerResult<Vec<TillSession>> {
        Ok(self.db.sessions().list_all().await?)
    }

    /// Sessions in one lifecycle state, newest first.
    pub async fn sessions_by_status(
        &self,
        status: SessionStatus,
    ) -> LedgerResult<Vec<TillSession>> {
        Ok(self.db.sessions().list_by_status(status).await?)
    }

    /// Sessions opened by one operator, newest first.
    pub async fn sessions_by_operator(&self, operator: &str) -> LedgerResult<Vec<TillSession>> {
        Ok(self.db.sessions().list_by_operator(operator).await?)
    }

    /// Sessions opened within `[start, end)`, oldest first.
    pub async fn sessions_between(
        &self,
        start: chrono::DateTime<Utc>,
        end: chrono::DateTime<Utc>,
    ) -> LedgerResult<Vec<TillSession>> {
        Ok(self.db.sessions().list_between(start, end).await?)
    }

    /// Supervisor accepts a CLOSED session. Terminal.
    #[instrument(skip(self))]
    pub async fn approve_session(&self, id: &str, supervisor: &str) -> LedgerResult<TillSession> {
        require_non_blank("supervisor", supervisor)?;
        let _guard = self.locks.lock(id).await;

        let mut session = self.db.sessions().get_by_id(id).await?;
        session.ensure_closed("approve")?;

        let expected_version = session.version;
        session.status = SessionStatus::Approved;
        session.decided_by = Some(supervisor.to_string());
        session.decided_at = Some(Utc::now());

        self.db.sessions().update(&session, expected_version).await?;
        session.version = expected_version + 1;

        info!(session_id = %session.id, %supervisor, "session approved");
        Ok(session)
    }

    /// Supervisor rejects a CLOSED session, recording the reason in the
    /// notes. Terminal; the reconciliation snapshot is kept as evidence.
    #[instrument(skip(self, reason))]
    pub async fn reject_session(
        &self,
        id: &str,
        supervisor: &str,
        reason: &str,
    ) -> LedgerResult<TillSession> {
        require_non_blank("supervisor", supervisor)?;
        require_non_blank("reason", reason)?;
        let _guard = self.locks.lock(id).await;

        let mut session = self.db.sessions().get_by_id(id).await?;
        session.ensure_closed("reject")?;

        let expected_version = session.version;
        session.status = SessionStatus::Rejected;
        session.decided_by = Some(supervisor.to_string());
        session.decided_at = Some(Utc::now());
        session.append_note(&format!("REJECTED: {reason}"));

        self.db.sessions().update(&session, expected_version).await?;
        session.version = expected_version + 1;

        warn!(session_id = %session.id, %supervisor, "session rejected");
        Ok(session)
    }

    /// Deletes an OPEN session that never saw activity (opened by mistake).
    ///
    /// A session with any order, expense, invoice, or cash entry is
    /// evidence and stays.
    #[instrument(skip(self))]
    pub async fn delete_session(&self, id: &str) -> LedgerResult<()> {
        let _guard = self.locks.lock(id).await;

        let session = self.db.sessions().get_by_id(id).await?;
        session.ensure_open("delete")?;

        if self.db.sessions().has_activity(id).await? {
            return Err(LedgerError::SessionNotEmpty { id: id.to_string() });
        }

        self.db.sessions().delete(id).await?;
        info!(session_id = %id, "empty session deleted");
        Ok(())
    }
}
