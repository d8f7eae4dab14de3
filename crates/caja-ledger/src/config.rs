//! # Ledger Configuration
//!
//! Tunable policy values. Both fields were compile-time constants in the
//! system this ledger replaced; here they are deployment configuration with
//! the legacy values as defaults.

use serde::Deserialize;

use caja_core::{Money, DEFAULT_OPENING_FLOAT, DEFAULT_TOLERANCE};

/// Policy configuration for the ledger services.
///
/// ## Example (TOML)
/// ```toml
/// [ledger]
/// tolerance = 5000
/// fallback_opening_float = 500000
/// ```
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LedgerConfig {
    /// Maximum |expected - declared| that still reconciles. Inclusive.
    pub tolerance: Money,

    /// Opening float substituted when a session opens with a non-positive
    /// float amount.
    pub fallback_opening_float: Money,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        LedgerConfig {
            tolerance: DEFAULT_TOLERANCE,
            fallback_opening_float: DEFAULT_OPENING_FLOAT,
        }
    }
}
