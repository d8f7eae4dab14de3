//! # caja-db: Database Layer
//!
//! SQLite persistence for the till session ledger.
//!
//! ## Architecture
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                           caja-db                                       │
//! │                                                                         │
//! │  ┌──────────────┐   ┌──────────────┐   ┌──────────────────────────┐    │
//! │  │   pool.rs    │   │ migrations.rs│   │      repository/         │    │
//! │  │  ──────────  │   │  ──────────  │   │  ──────────────────────  │    │
//! │  │  Database    │   │  Embedded    │   │  SessionRepository       │    │
//! │  │  DbConfig    │   │  SQL files   │   │  OrderRepository         │    │
//! │  │  WAL mode    │   │  (sqlx       │   │  ExpenseRepository       │    │
//! │  │  SqlitePool  │   │   migrate!)  │   │  InvoiceRepository       │    │
//! │  └──────────────┘   └──────────────┘   │  CashEntryRepository     │    │
//! │                                        └──────────────────────────┘    │
//! │                                                                         │
//! │  All rows map into caja-core types; no business rules live here.        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust,ignore
//! use caja_db::{Database, DbConfig};
//!
//! let db = Database::new(DbConfig::new("/var/lib/caja/caja.db")).await?;
//! let session = db.sessions().get_by_id("some-id").await?;
//! ```

pub mod error;
pub mod migrations;
pub mod pool;
pub mod repository;

pub use error::{DbError, DbResult};
pub use pool::{Database, DbConfig};
pub use repository::{
    CashEntryRepository, ExpenseRepository, InvoiceRepository, OrderRepository, SessionRepository,
};
