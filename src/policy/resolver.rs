//! Resolution of the most specific security rule clause for a package.

use super::rules::{RuleClause, SecurityRuleSet};
use crate::model::{Severity, WaiverAuthority};

/// The clause that applies to one package name, version and release.
#[derive(Debug, Clone, Copy)]
pub struct ResolvedPolicy<'a> {
    package: &'a str,
    clause: &'a RuleClause,
}

impl<'a> ResolvedPolicy<'a> {
    #[must_use]
    pub const fn package(&self) -> &'a str {
        self.package
    }

    #[must_use]
    pub const fn clause(&self) -> &'a RuleClause {
        self.clause
    }

    /// Waiver authority override for findings of `severity`.
    #[must_use]
    pub fn waiver_for(&self, severity: Severity) -> Option<WaiverAuthority> {
        self.clause.waivers.get(&severity).copied()
    }

    /// Severity remap for a named check.
    #[must_use]
    pub fn action(&self, check: &str) -> Option<Severity> {
        self.clause.actions.get(check).copied()
    }
}

/// Read-only resolver over a loaded rule set.
///
/// Resolution is a pure function of its inputs and never fails; `None`
/// means the global waiver policy applies.
#[derive(Debug, Clone, Default)]
pub struct SecurityPolicyResolver {
    rules: SecurityRuleSet,
}

impl SecurityPolicyResolver {
    #[must_use]
    pub fn new(rules: SecurityRuleSet) -> Self {
        Self { rules }
    }

    /// Add a clause; it wins ties against clauses registered earlier.
    pub fn register(&mut self, package: impl Into<String>, clause: RuleClause) {
        self.rules.insert(package, clause);
    }

    #[must_use]
    pub const fn rules(&self) -> &SecurityRuleSet {
        &self.rules
    }

    /// Most specific matching clause for a package build.
    ///
    /// Exact patterns outrank regexes, which outrank wildcards; the version
    /// is compared before the release.
    #[must_use]
    pub fn resolve<'a>(
        &'a self,
        name: &'a str,
        version: &str,
        release: &str,
    ) -> Option<ResolvedPolicy<'a>> {
        let mut best: Option<&RuleClause> = None;
        for clause in self.rules.clauses(name) {
            if !clause.matches(version, release) {
                continue;
            }
            // >= so later registrations win ties
            if best.map_or(true, |b| clause.specificity() >= b.specificity()) {
                best = Some(clause);
            }
        }

        let clause = best?;
        tracing::debug!(
            package = name,
            version,
            release,
            rule_version = %clause.version,
            rule_release = %clause.release,
            "Resolved security rule"
        );
        Some(ResolvedPolicy {
            package: name,
            clause,
        })
    }
}
