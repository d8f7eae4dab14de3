//! Shared helpers for the ledger integration tests.

use std::collections::BTreeMap;

use caja_core::{Money, OrderStatus, SettledOrder, TenderType};
use caja_db::{Database, DbConfig};
use caja_ledger::{CajaLedger, LedgerConfig, OpenSession};
use chrono::Utc;

/// Fresh in-memory database with the full ledger wired over it.
pub async fn ledger() -> (Database, CajaLedger) {
    // RUST_LOG=debug makes a failing test narrate itself
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();

    let db = Database::new(DbConfig::in_memory())
        .await
        .expect("in-memory database");
    let ledger = CajaLedger::new(db.clone(), LedgerConfig::default());
    (db, ledger)
}

/// Opens a session with a 500 000 all-cash float.
pub async fn open_default_session(ledger: &CajaLedger) -> caja_core::TillSession {
    ledger
        .registry()
        .open_session(OpenSession {
            name: "Caja principal".to_string(),
            operator: "ana".to_string(),
            opening_float: Money::from_minor(500_000),
            opening_breakdown: BTreeMap::new(),
        })
        .await
        .expect("open session")
}

/// Simulates the order-management collaborator settling a sale.
pub async fn settle_order(
    db: &Database,
    id: &str,
    session_id: Option<&str>,
    tender: TenderType,
    amount: i64,
) -> SettledOrder {
    let order = SettledOrder {
        id: id.to_string(),
        session_id: session_id.map(String::from),
        tender,
        settled_amount: Money::from_minor(amount),
        status: OrderStatus::Settled,
        settled_at: Utc::now(),
        reversed_at: None,
        reversed_by: None,
    };
    db.orders().insert(&order).await.expect("insert order");
    order
}
