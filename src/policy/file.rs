//! Loading security rule files.
//!
//! A rule file is a YAML map of package name to a list of clauses:
//!
//! ```yaml
//! sudo:
//!   - version: "*"
//!     release: "*"
//!     waivers:
//!       bad: security
//!     actions:
//!       setuid: info
//!   - version: "1\\.9\\..*"
//!     actions:
//!       setuid: skip
//! ```

use super::rules::{RuleClause, SecurityRuleSet};
use crate::error::{ErrorContext, InspectError, Result};
use crate::model::{Severity, WaiverAuthority};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::Path;

fn any_pattern() -> String {
    "*".to_string()
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawClause {
    #[serde(default = "any_pattern")]
    version: String,
    #[serde(default = "any_pattern")]
    release: String,
    #[serde(default)]
    waivers: BTreeMap<Severity, WaiverAuthority>,
    #[serde(default)]
    actions: BTreeMap<String, Severity>,
}

/// Parse a rule document. Any invalid pattern fails the whole load.
pub fn parse_rule_str(content: &str) -> Result<SecurityRuleSet> {
    let raw: BTreeMap<String, Vec<RawClause>> =
        serde_yaml::from_str(content).context("security rules")?;

    let mut rules = SecurityRuleSet::new();
    for (package, clauses) in raw {
        for raw in clauses {
            let mut clause = RuleClause::new(&raw.version, &raw.release)
                .with_context(|| format!("rule for package '{package}'"))?;
            clause.waivers = raw.waivers;
            clause.actions = raw.actions;
            rules.insert(package.clone(), clause);
        }
    }
    Ok(rules)
}

/// Load a rule file from disk.
pub fn load_rule_file(path: &Path) -> Result<SecurityRuleSet> {
    let content = std::fs::read_to_string(path).map_err(|e| InspectError::io(path, e))?;
    let rules = parse_rule_str(&content)?;
    tracing::info!(
        path = %path.display(),
        packages = rules.packages().len(),
        clauses = rules.len(),
        "Loaded security rules"
    );
    Ok(rules)
}
