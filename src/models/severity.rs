//! Severity
//!
//! The source system mixes upper- and lower-case severity strings
//! across the Alert, AlertRule, and DigestConfig surfaces (spec §9,
//! Open Question). We canonicalize to a single enum at parse time and
//! never compare raw strings again.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Critical,
    Warning,
    Info,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Severity::Critical => "critical",
            Severity::Warning => "warning",
            Severity::Info => "info",
        };
        write!(f, "{s}")
    }
}

impl FromStr for Severity {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "critical" => Ok(Severity::Critical),
            "warning" => Ok(Severity::Warning),
            "info" => Ok(Severity::Info),
            other => Err(format!("unknown severity: {other}")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_case_insensitively() {
        assert_eq!(Severity::from_str("CRITICAL").unwrap(), Severity::Critical);
        assert_eq!(Severity::from_str("Warning").unwrap(), Severity::Warning);
        assert_eq!(Severity::from_str("info").unwrap(), Severity::Info);
    }

    #[test]
    fn rejects_unknown_severity() {
        assert!(Severity::from_str("urgent").is_err());
    }

    #[test]
    fn display_round_trips_through_from_str() {
        for s in [Severity::Critical, Severity::Warning, Severity::Info] {
            assert_eq!(Severity::from_str(&s.to_string()).unwrap(), s);
        }
    }
}
