//! Security rule clauses grouped by package name.

use super::pattern::VersionPattern;
use crate::error::Result;
use crate::model::{Severity, WaiverAuthority};
use std::collections::{BTreeMap, HashMap};

/// One rule clause for a package.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RuleClause {
    pub version: VersionPattern,
    pub release: VersionPattern,
    /// Waiver authority overrides, per severity
    pub waivers: BTreeMap<Severity, WaiverAuthority>,
    /// Severity remaps, per check name
    pub actions: BTreeMap<String, Severity>,
}

impl RuleClause {
    /// A clause with compiled version and release patterns.
    pub fn new(version: &str, release: &str) -> Result<Self> {
        Ok(Self {
            version: VersionPattern::parse(version)?,
            release: VersionPattern::parse(release)?,
            ..Self::default()
        })
    }

    #[must_use]
    pub fn with_waiver(mut self, severity: Severity, authority: WaiverAuthority) -> Self {
        self.waivers.insert(severity, authority);
        self
    }

    #[must_use]
    pub fn with_action(mut self, check: impl Into<String>, severity: Severity) -> Self {
        self.actions.insert(check.into(), severity);
        self
    }

    #[must_use]
    pub fn matches(&self, version: &str, release: &str) -> bool {
        self.version.matches(version) && self.release.matches(release)
    }

    /// Specificity as (version score, release score).
    #[must_use]
    pub const fn specificity(&self) -> (u8, u8) {
        (self.version.score(), self.release.score())
    }
}

/// Rule clauses per package name, in registration order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SecurityRuleSet {
    rules: HashMap<String, Vec<RuleClause>>,
    clause_count: usize,
}

impl SecurityRuleSet {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a clause for a package.
    pub fn insert(&mut self, package: impl Into<String>, clause: RuleClause) {
        self.rules.entry(package.into()).or_default().push(clause);
        self.clause_count += 1;
    }

    #[must_use]
    pub fn clauses(&self, package: &str) -> &[RuleClause] {
        self.rules.get(package).map(Vec::as_slice).unwrap_or_default()
    }

    /// Package names with rules, sorted.
    #[must_use]
    pub fn packages(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.rules.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Total number of clauses.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.clause_count
    }

    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.clause_count == 0
    }
}
