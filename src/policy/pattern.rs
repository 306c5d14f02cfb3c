//! Version and release patterns used by security rule clauses.

use crate::error::{InspectError, Result};
use regex::Regex;
use std::fmt;

/// Characters that turn a pattern into a regular expression. A plain `.`
/// is not among them, since every dotted version would qualify.
const REGEX_META: &[char] = &['*', '?', '[', ']', '(', ')', '{', '}', '|', '+', '^', '$', '\\'];

/// A pattern matched against a package version or release string.
#[derive(Debug, Clone, Default)]
pub enum VersionPattern {
    /// `*` or empty: matches anything
    #[default]
    Any,
    /// Literal match
    Exact(String),
    /// Anchored regular expression
    Regex { source: String, regex: Regex },
}

impl VersionPattern {
    /// Parse a pattern string, compiling it if it looks like a regex.
    pub fn parse(pattern: &str) -> Result<Self> {
        let pattern = pattern.trim();
        if pattern.is_empty() || pattern == "*" {
            return Ok(Self::Any);
        }
        if !pattern.contains(REGEX_META) {
            return Ok(Self::Exact(pattern.to_string()));
        }

        let regex = Regex::new(&format!("^(?:{pattern})$"))
            .map_err(|e| InspectError::rule_pattern(pattern, e.to_string()))?;
        Ok(Self::Regex {
            source: pattern.to_string(),
            regex,
        })
    }

    #[must_use]
    pub fn matches(&self, value: &str) -> bool {
        match self {
            Self::Any => true,
            Self::Exact(s) => s == value,
            Self::Regex { regex, .. } => regex.is_match(value),
        }
    }

    /// Specificity used to rank matching clauses.
    #[must_use]
    pub const fn score(&self) -> u8 {
        match self {
            Self::Any => 0,
            Self::Regex { .. } => 1,
            Self::Exact(_) => 2,
        }
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Any => "*",
            Self::Exact(s) | Self::Regex { source: s, .. } => s,
        }
    }
}

impl PartialEq for VersionPattern {
    fn eq(&self, other: &Self) -> bool {
        self.score() == other.score() && self.as_str() == other.as_str()
    }
}

impl Eq for VersionPattern {}

impl fmt::Display for VersionPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pattern_kinds() {
        assert_eq!(VersionPattern::parse("*").expect("any"), VersionPattern::Any);
        assert_eq!(VersionPattern::parse("").expect("any"), VersionPattern::Any);
        assert!(matches!(
            VersionPattern::parse("2.0").expect("exact"),
            VersionPattern::Exact(_)
        ));
        assert!(matches!(
            VersionPattern::parse("2\\..*").expect("regex"),
            VersionPattern::Regex { .. }
        ));
    }

    #[test]
    fn test_regex_is_anchored() {
        let p = VersionPattern::parse("1\\.el[0-9]+").expect("regex");
        assert!(p.matches("1.el9"));
        assert!(!p.matches("21.el9"));
        assert!(!p.matches("1.el9_2"));
    }

    #[test]
    fn test_exact_does_not_treat_dot_as_wildcard() {
        let p = VersionPattern::parse("2.0").expect("exact");
        assert!(p.matches("2.0"));
        assert!(!p.matches("2x0"));
    }

    #[test]
    fn test_invalid_regex_rejected() {
        let err = VersionPattern::parse("1.(").expect_err("unbalanced");
        assert!(matches!(err, InspectError::RulePattern { ref pattern, .. } if pattern == "1.("));
    }

    #[test]
    fn test_scores() {
        assert!(
            VersionPattern::parse("1.0").expect("exact").score()
                > VersionPattern::parse("1.*").expect("regex").score()
        );
        assert_eq!(VersionPattern::Any.score(), 0);
    }
}
