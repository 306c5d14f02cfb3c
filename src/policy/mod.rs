//! Per-package security rules.
//!
//! A [`SecurityRuleSet`] holds rule clauses per package name; the
//! [`SecurityPolicyResolver`] picks the most specific clause matching a
//! package build. Clauses override waiver authorities and remap the
//! severity of named checks.

pub mod file;
mod pattern;
mod resolver;
mod rules;

pub use file::{load_rule_file, parse_rule_str};
pub use pattern::VersionPattern;
pub use resolver::{ResolvedPolicy, SecurityPolicyResolver};
pub use rules::{RuleClause, SecurityRuleSet};
