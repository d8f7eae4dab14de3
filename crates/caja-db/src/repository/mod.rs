//! # Repository Layer
//!
//! Data access repositories for ledger entities.
//!
//! ## Repository Pattern
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                     Repository Structure                                │
//! │                                                                         │
//! │  Each repository:                                                       │
//! │  • Owns a clone of the connection pool (cheap; internally Arc'd)        │
//! │  • Provides typed CRUD for one aggregate                                │
//! │  • Maps rows into caja-core types (FromRow or an explicit Row struct)   │
//! │  • Returns DbResult<T> for error handling                               │
//! │                                                                         │
//! │  SessionRepository ──► till_sessions     (version-guarded updates)      │
//! │  OrderRepository ────► settled_orders    (reversal tag flips)           │
//! │  ExpenseRepository ──► expenses                                         │
//! │  InvoiceRepository ──► purchase_invoices                                │
//! │  CashEntryRepository ► cash_entries                                     │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Querying Style
//! Runtime-checked `sqlx::query` / `query_as` with `FromRow` mapping; no
//! offline prepared-statement cache is required to build this crate.

pub mod cash_entry;
pub mod expense;
pub mod invoice;
pub mod order;
pub mod session;

pub use cash_entry::CashEntryRepository;
pub use expense::ExpenseRepository;
pub use invoice::InvoiceRepository;
pub use order::OrderRepository;
pub use session::SessionRepository;
