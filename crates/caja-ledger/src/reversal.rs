//! # Payment Reversal Handler
//!
//! Undoes the financial effect of a settled order by flipping its status
//! tag. No amounts are edited and no compensating record is written; every
//! total that ever counted the order is recomputed from records, so the
//! correction propagates by construction.
//!
//! ## Rules
//! - Only a SETTLED order can flip. A second reversal of the same order is
//!   refused by the lifecycle guard, with no side effects.
//! - An order assigned to a session can only be reversed while that session
//!   is OPEN. A closed reconciliation is frozen evidence; correcting it
//!   means reopening the count with a supervisor, not silently editing
//!   history.
//! - Unassigned orders reverse freely; no snapshot ever counted them.

use chrono::Utc;
use std::sync::Arc;
use tracing::{info, instrument};

use caja_core::error::CoreError;
use caja_core::SettledOrder;
use caja_db::Database;

use crate::error::LedgerResult;
use crate::locks::SessionLocks;

/// Service that reverses settled order payments.
#[derive(Debug, Clone)]
pub struct ReversalHandler {
    db: Database,
    locks: Arc<SessionLocks>,
}

impl ReversalHandler {
    pub fn new(db: Database, locks: Arc<SessionLocks>) -> Self {
        ReversalHandler { db, locks }
    }

    /// Reverses a settled order, recording who did it and when.
    ///
    /// Returns the order in its post-reversal state. A second reversal of
    /// the same order is refused with an invalid-state error and leaves the
    /// record untouched.
    #[instrument(skip(self), fields(order_id = %order_id, actor = %actor))]
    pub async fn reverse_order(&self, order_id: &str, actor: &str) -> LedgerResult<SettledOrder> {
        let order = self.db.orders().get_by_id(order_id).await?;
        order.ensure_settled("reverse")?;

        // Hold the session lock so the flip cannot race a close that is
        // snapshotting this very order
        let _guard = match &order.session_id {
            Some(session_id) => {
                let guard = self.locks.lock(session_id).await;
                let session = self.db.sessions().get_by_id(session_id).await?;
                session.ensure_open("reverse order")?;
                Some(guard)
            }
            None => None,
        };

        let reversed_at = Utc::now();
        let flipped = self
            .db
            .orders()
            .mark_reversed(order_id, actor, reversed_at)
            .await?;

        if !flipped {
            // A concurrent submission flipped the order between our read
            // and the write; same refusal as reading REVERSED up front
            return Err(
                CoreError::invalid_state("order", order_id, "reversed", "reverse").into(),
            );
        }

        info!(amount = %order.settled_amount, "order payment reversed");
        Ok(self.db.orders().get_by_id(order_id).await?)
    }
}
