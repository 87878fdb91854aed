//! The closed set of query destinations.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A query-handling destination.
///
/// The set is closed: routing decisions, cache entries, and dispatch all
/// operate over exactly these four units. Anything else coming back from a
/// model is rejected at the parsing boundary.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Unit {
    /// Structured-data analytics (aggregations, metrics, tabular queries).
    Analytics,
    /// Document knowledge retrieval (policies, procedures, how-it-works).
    Knowledge,
    /// Commercial-document analysis (invoices, orders, receipts).
    Commerce,
    /// Generic triage handler (greetings, out-of-scope, clarification).
    Triage,
}

impl Unit {
    /// All units, in a fixed order.
    pub const ALL: [Self; 4] = [Self::Analytics, Self::Knowledge, Self::Commerce, Self::Triage];

    /// Stable wire name.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Analytics => "analytics",
            Self::Knowledge => "knowledge",
            Self::Commerce => "commerce",
            Self::Triage => "triage",
        }
    }
}

impl fmt::Display for Unit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when a string is not a member of the unit set.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown unit: {0:?}")]
pub struct UnknownUnit(pub String);

impl FromStr for Unit {
    type Err = UnknownUnit;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "analytics" => Ok(Self::Analytics),
            "knowledge" => Ok(Self::Knowledge),
            "commerce" => Ok(Self::Commerce),
            "triage" => Ok(Self::Triage),
            other => Err(UnknownUnit(other.to_owned())),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn all_contains_every_unit_once() {
        let mut names: Vec<&str> = Unit::ALL.iter().map(|u| u.as_str()).collect();
        names.sort_unstable();
        names.dedup();
        assert_eq!(names.len(), 4);
    }

    #[test]
    fn serde_round_trip_snake_case() {
        for unit in Unit::ALL {
            let json = serde_json::to_value(unit).unwrap();
            assert_eq!(json, serde_json::json!(unit.as_str()));
            let back: Unit = serde_json::from_value(json).unwrap();
            assert_eq!(back, unit);
        }
    }

    #[test]
    fn from_str_accepts_all_members() {
        for unit in Unit::ALL {
            assert_eq!(unit.as_str().parse::<Unit>().unwrap(), unit);
        }
    }

    #[test]
    fn from_str_is_case_and_whitespace_tolerant() {
        assert_eq!("  Analytics ".parse::<Unit>().unwrap(), Unit::Analytics);
        assert_eq!("COMMERCE".parse::<Unit>().unwrap(), Unit::Commerce);
    }

    #[test]
    fn from_str_rejects_outside_closed_set() {
        assert!("billing".parse::<Unit>().is_err());
        assert!("".parse::<Unit>().is_err());
        assert!("triage2".parse::<Unit>().is_err());
    }

    #[test]
    fn unknown_unit_error_carries_input() {
        let err = "sales".parse::<Unit>().unwrap_err();
        assert_eq!(err, UnknownUnit("sales".into()));
    }
}
