//! # caja-core: Pure Business Logic for the Caja POS Session Ledger
//!
//! This crate is the **heart** of the till reconciliation engine. It contains
//! all business logic as pure functions with zero I/O dependencies.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                     Caja POS Ledger Architecture                        │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │            Callers (HTTP layer, reporting — out of scope)       │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                    caja-ledger (services)                       │   │
//! │  │    SessionRegistry, ExpenseLedger, ReversalHandler, Reconciler  │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │               ★ caja-core (THIS CRATE) ★                        │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────┐  ┌───────────┐  ┌───────────┐  ┌───────────┐  │   │
//! │  │   │   types   │  │   money   │  │  tender   │  │ reconcile │  │   │
//! │  │   │  Session  │  │   Money   │  │ TenderType│  │  formula  │  │   │
//! │  │   │   Order   │  │  (minor)  │  │  parser   │  │ tolerance │  │   │
//! │  │   └───────────┘  └───────────┘  └───────────┘  └───────────┘  │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO DATABASE • NO NETWORK • PURE FUNCTIONS           │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                    caja-db (Database Layer)                     │   │
//! │  │              SQLite queries, migrations, repositories           │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Domain types (TillSession, SettledOrder, Expense, ...)
//! - [`money`] - Money type with integer arithmetic (no floating point!)
//! - [`tender`] - Closed tender enumeration + legacy string normalizer
//! - [`reconcile`] - Sales aggregation, conservation formula, tolerance
//! - [`error`] - Domain error types
//!
//! ## Design Principles
//!
//! 1. **Pure Functions**: Every function is deterministic - same input = same output
//! 2. **No I/O**: Database, network, file system access is FORBIDDEN here
//! 3. **Integer Money**: All monetary values are i64 minor units, never floats
//! 4. **Recompute, don't cache**: totals are always derived from current
//!    records; no stored total is authoritative while a session is open
//!
//! ## Example Usage
//!
//! ```rust
//! use caja_core::money::Money;
//! use caja_core::reconcile::reconcile;
//!
//! let outcome = reconcile(
//!     Money::from_minor(570_000), // expected
//!     Money::from_minor(565_000), // declared
//!     Money::from_minor(5_000),   // tolerance
//! );
//!
//! assert_eq!(outcome.discrepancy.minor(), 5_000);
//! assert!(outcome.reconciled); // inclusive boundary
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod money;
pub mod reconcile;
pub mod tender;
pub mod types;

// =============================================================================
// Re-exports for Convenience
// =============================================================================
// These allow users to do `use caja_core::Money` instead of
// `use caja_core::money::Money`

pub use error::{CoreError, ValidationError};
pub use money::Money;
pub use reconcile::{Reconciliation, SalesReport};
pub use tender::TenderType;
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Default tolerance for reconciliation, in minor units.
///
/// ## Business Reason
/// Small counting differences (change rounding, a dropped coin) should not
/// flag a session. The value mirrors what the replaced system compiled in;
/// here it is only the default of a configurable setting.
pub const DEFAULT_TOLERANCE: Money = Money::from_minor(5_000);

/// Fallback opening float applied when a session opens with a non-positive
/// float, in minor units.
///
/// ## Business Reason
/// A till never truly opens empty; operators sometimes submit 0 out of
/// habit. Rather than silently accepting an impossible float, the registry
/// substitutes this documented default.
pub const DEFAULT_OPENING_FLOAT: Money = Money::from_minor(500_000);
