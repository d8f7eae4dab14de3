//! # Tender Types
//!
//! The closed enumeration of payment instruments and the normalizing parser
//! for the legacy free-text values.
//!
//! ## Why a Closed Enumeration?
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  The legacy system compared free-text strings on every aggregation:    │
//! │                                                                         │
//! │    "efectivo" / "Efectivo" / " EFECTIVO "  → cash                      │
//! │    "transferencia"                         → transfer                   │
//! │    "tarjeta"                               → card                       │
//! │    null / "" / anything else               → other                      │
//! │                                                                         │
//! │  Every consumer re-implemented the comparison, each slightly           │
//! │  differently. Here the parse happens ONCE at the edge; everything      │
//! │  downstream matches on the enum.                                       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;

// =============================================================================
// Tender Type
// =============================================================================

/// The payment instrument used for an order, expense, or cash entry.
///
/// Unknown or blank values are bucketed as `Other`, never dropped: a sale
/// with a mistyped tender still happened and still belongs in the totals.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[serde(rename_all = "snake_case")]
pub enum TenderType {
    /// Physical cash. The only tender that moves the till.
    Cash,
    /// Bank transfer.
    Transfer,
    /// Card payment on an external terminal.
    Card,
    /// Unknown, blank, or unrecognized legacy value.
    Other,
}

impl TenderType {
    /// Normalizes a legacy free-text tender value.
    ///
    /// Accepts the Spanish strings the replaced system stored as well as
    /// their English counterparts. Comparison is trimmed and
    /// case-insensitive. `None`, blank, and unrecognized input all map to
    /// [`TenderType::Other`].
    pub fn parse_legacy(raw: Option<&str>) -> TenderType {
        let Some(raw) = raw else {
            return TenderType::Other;
        };

        match raw.trim().to_lowercase().as_str() {
            "efectivo" | "cash" => TenderType::Cash,
            "transferencia" | "transfer" => TenderType::Transfer,
            "tarjeta" | "card" | "credit" | "debit" => TenderType::Card,
            _ => TenderType::Other,
        }
    }

    /// True for the tender that affects physical cash in the till.
    #[inline]
    pub const fn is_cash(&self) -> bool {
        matches!(self, TenderType::Cash)
    }

    /// Stable lowercase name, matching the database representation.
    pub const fn as_str(&self) -> &'static str {
        match self {
            TenderType::Cash => "cash",
            TenderType::Transfer => "transfer",
            TenderType::Card => "card",
            TenderType::Other => "other",
        }
    }
}

impl fmt::Display for TenderType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_legacy_spanish_variants() {
        assert_eq!(TenderType::parse_legacy(Some("efectivo")), TenderType::Cash);
        assert_eq!(TenderType::parse_legacy(Some(" EFECTIVO ")), TenderType::Cash);
        assert_eq!(
            TenderType::parse_legacy(Some("Transferencia")),
            TenderType::Transfer
        );
        assert_eq!(TenderType::parse_legacy(Some("tarjeta")), TenderType::Card);
    }

    #[test]
    fn test_parse_legacy_english_variants() {
        assert_eq!(TenderType::parse_legacy(Some("Cash")), TenderType::Cash);
        assert_eq!(TenderType::parse_legacy(Some("debit")), TenderType::Card);
    }

    #[test]
    fn test_unknown_and_blank_bucket_as_other() {
        assert_eq!(TenderType::parse_legacy(None), TenderType::Other);
        assert_eq!(TenderType::parse_legacy(Some("")), TenderType::Other);
        assert_eq!(TenderType::parse_legacy(Some("   ")), TenderType::Other);
        assert_eq!(TenderType::parse_legacy(Some("cheque")), TenderType::Other);
    }

    #[test]
    fn test_is_cash() {
        assert!(TenderType::Cash.is_cash());
        assert!(!TenderType::Transfer.is_cash());
        assert!(!TenderType::Card.is_cash());
        assert!(!TenderType::Other.is_cash());
    }

    #[test]
    fn test_serde_round_trip_as_snake_case() {
        let json = serde_json::to_string(&TenderType::Transfer).unwrap();
        assert_eq!(json, "\"transfer\"");
        let back: TenderType = serde_json::from_str(&json).unwrap();
        assert_eq!(back, TenderType::Transfer);
    }
}
