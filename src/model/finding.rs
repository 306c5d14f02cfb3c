//! Severity, waiver authority and verb vocabulary for findings.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Severity of a finding.
///
/// Reportable severities are ordered `Ok < Info < Verify < Bad`. `Skip`
/// marks a finding that is recorded but never reported and never counts
/// towards the worst severity of a run.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Default,
    Serialize,
    Deserialize,
    JsonSchema,
    clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    #[default]
    Ok,
    Info,
    Verify,
    Bad,
    Skip,
}

impl Severity {
    /// All reportable severities, lowest first.
    pub const REPORTABLE: [Self; 4] = [Self::Ok, Self::Info, Self::Verify, Self::Bad];

    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Ok => "OK",
            Self::Info => "INFO",
            Self::Verify => "VERIFY",
            Self::Bad => "BAD",
            Self::Skip => "SKIP",
        }
    }

    /// Whether findings of this severity show up in reports.
    #[must_use]
    pub const fn is_reportable(&self) -> bool {
        !matches!(self, Self::Skip)
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Severity {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "ok" | "pass" => Ok(Self::Ok),
            "info" | "inform" => Ok(Self::Info),
            "verify" => Ok(Self::Verify),
            "bad" | "fail" => Ok(Self::Bad),
            "skip" => Ok(Self::Skip),
            other => Err(format!(
                "unknown severity '{other}' (expected ok, info, verify, bad or skip)"
            )),
        }
    }
}

/// Who may waive a finding.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Default,
    Serialize,
    Deserialize,
    JsonSchema,
)]
#[serde(rename_all = "kebab-case")]
pub enum WaiverAuthority {
    #[default]
    NotWaivable,
    Anyone,
    Security,
}

impl WaiverAuthority {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::NotWaivable => "Not Waivable",
            Self::Anyone => "Anyone",
            Self::Security => "Security",
        }
    }
}

impl fmt::Display for WaiverAuthority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What happened to the noun of a finding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum Verb {
    Added,
    Removed,
    Changed,
    Failed,
}

impl Verb {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Added => "added",
            Self::Removed => "removed",
            Self::Changed => "changed",
            Self::Failed => "failed",
        }
    }
}

impl fmt::Display for Verb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_severity_ordering() {
        assert!(Severity::Ok < Severity::Info);
        assert!(Severity::Info < Severity::Verify);
        assert!(Severity::Verify < Severity::Bad);
        assert!(!Severity::Skip.is_reportable());
        assert!(Severity::REPORTABLE.iter().all(Severity::is_reportable));
    }

    #[test]
    fn test_severity_parsing_aliases() {
        assert_eq!("VERIFY".parse::<Severity>(), Ok(Severity::Verify));
        assert_eq!("inform".parse::<Severity>(), Ok(Severity::Info));
        assert_eq!("fail".parse::<Severity>(), Ok(Severity::Bad));
        assert!("fatal".parse::<Severity>().is_err());
    }

    #[test]
    fn test_waiver_authority_serde_names() {
        let json = serde_json::to_string(&WaiverAuthority::NotWaivable).expect("serialize");
        assert_eq!(json, "\"not-waivable\"");
        let parsed: WaiverAuthority = serde_json::from_str("\"security\"").expect("deserialize");
        assert_eq!(parsed, WaiverAuthority::Security);
    }
}
