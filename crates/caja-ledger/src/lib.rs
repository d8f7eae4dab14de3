//! # caja-ledger: Session Lifecycle Services
//!
//! The orchestration layer of the till reconciliation engine.
//!
//! ## Architecture
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                          caja-ledger                                    │
//! │                                                                         │
//! │  ┌───────────────┐ ┌───────────────┐ ┌───────────────┐                 │
//! │  │SessionRegistry│ │ ExpenseLedger │ │ReversalHandler│                 │
//! │  │ open/approve/ │ │ solvency gate │ │  tag flips    │                 │
//! │  │ reject/delete │ │ cash entries  │ │  open-only    │                 │
//! │  └───────┬───────┘ └───────┬───────┘ └───────┬───────┘                 │
//! │          │                 │                 │                          │
//! │  ┌───────┴───────┐ ┌───────┴───────┐ ┌───────┴───────┐                 │
//! │  │  Reconciler   │ │SalesAggregator│ │SummaryService │                 │
//! │  │  close +      │ │  live totals  │ │ live/frozen   │                 │
//! │  │  snapshot     │ │               │ │ + anomalies   │                 │
//! │  └───────────────┘ └───────────────┘ └───────────────┘                 │
//! │                                                                         │
//! │  Shared: SessionLocks (per-session serialization) + LedgerConfig       │
//! │  Below:  caja-db repositories • Rules: caja-core pure functions        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust,ignore
//! use caja_db::{Database, DbConfig};
//! use caja_ledger::{CajaLedger, LedgerConfig, OpenSession};
//!
//! let db = Database::new(DbConfig::new("/var/lib/caja/caja.db")).await?;
//! let ledger = CajaLedger::new(db, LedgerConfig::default());
//!
//! let session = ledger.registry().open_session(OpenSession { /* ... */ }).await?;
//! let closed = ledger.reconciler()
//!     .close_session(&session.id, declared, None)
//!     .await?;
//! ```

use std::sync::Arc;

pub mod config;
pub mod error;
pub mod expenses;
pub mod locks;
pub mod reconciler;
pub mod registry;
pub mod reversal;
pub mod sales;
pub mod summary;

pub use config::LedgerConfig;
pub use error::{LedgerError, LedgerResult};
pub use expenses::{ExpenseLedger, NewCashEntry, NewExpense};
pub use reconciler::Reconciler;
pub use registry::{OpenSession, SessionRegistry};
pub use reversal::ReversalHandler;
pub use sales::SalesAggregator;
pub use summary::{SessionSummary, SummaryService};

use caja_db::Database;
use locks::SessionLocks;

/// All ledger services wired over one database and one lock set.
///
/// Cheap to clone; services share the pool and the per-session locks.
#[derive(Debug, Clone)]
pub struct CajaLedger {
    registry: SessionRegistry,
    sales: SalesAggregator,
    expenses: ExpenseLedger,
    reversal: ReversalHandler,
    reconciler: Reconciler,
    summary: SummaryService,
}

impl CajaLedger {
    /// Wires every service over the given database and configuration.
    pub fn new(db: Database, config: LedgerConfig) -> Self {
        let locks = Arc::new(SessionLocks::new());

        CajaLedger {
            registry: SessionRegistry::new(db.clone(), Arc::clone(&locks), config.clone()),
            sales: SalesAggregator::new(db.clone()),
            expenses: ExpenseLedger::new(db.clone(), Arc::clone(&locks)),
            reversal: ReversalHandler::new(db.clone(), Arc::clone(&locks)),
            reconciler: Reconciler::new(db.clone(), Arc::clone(&locks), config.clone()),
            summary: SummaryService::new(db, config),
        }
    }

    pub fn registry(&self) -> &SessionRegistry {
        &self.registry
    }

    pub fn sales(&self) -> &SalesAggregator {
        &self.sales
    }

    pub fn expenses(&self) -> &ExpenseLedger {
        &self.expenses
    }

    pub fn reversal(&self) -> &ReversalHandler {
        &self.reversal
    }

    pub fn reconciler(&self) -> &Reconciler {
        &self.reconciler
    }

    pub fn summary(&self) -> &SummaryService {
        &self.summary
    }
}
