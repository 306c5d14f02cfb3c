//! Payload path ignore globs.

use crate::config::RunConfig;
use crate::error::{InspectError, Result};
use globset::{Glob, GlobSet, GlobSetBuilder};
use std::collections::HashMap;

/// A compiled set of ignore globs.
#[derive(Debug, Clone)]
pub struct IgnoreSet {
    set: GlobSet,
    len: usize,
}

impl Default for IgnoreSet {
    fn default() -> Self {
        Self {
            set: GlobSet::empty(),
            len: 0,
        }
    }
}

impl IgnoreSet {
    pub fn new<S: AsRef<str>>(patterns: &[S]) -> Result<Self> {
        let mut builder = GlobSetBuilder::new();
        for pattern in patterns {
            let pattern = pattern.as_ref();
            let glob = Glob::new(pattern)
                .map_err(|e| InspectError::config(format!("invalid glob '{pattern}': {e}")))?;
            builder.add(glob);
        }
        let set = builder
            .build()
            .map_err(|e| InspectError::config(format!("cannot build glob set: {e}")))?;
        Ok(Self {
            set,
            len: patterns.len(),
        })
    }

    #[must_use]
    pub fn is_match(&self, path: &str) -> bool {
        self.len > 0 && self.set.is_match(path)
    }

    #[must_use]
    pub const fn len(&self) -> usize {
        self.len
    }

    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.len == 0
    }
}

/// Global and per-inspection ignore sets of a run.
#[derive(Debug, Clone, Default)]
pub struct IgnoreRules {
    global: IgnoreSet,
    per_inspection: HashMap<String, IgnoreSet>,
}

impl IgnoreRules {
    pub fn from_config(config: &RunConfig) -> Result<Self> {
        let global = IgnoreSet::new(&config.ignores)?;
        let per_inspection = config
            .inspection_ignores
            .iter()
            .map(|(name, globs)| Ok((name.clone(), IgnoreSet::new(globs)?)))
            .collect::<Result<HashMap<_, _>>>()?;
        Ok(Self {
            global,
            per_inspection,
        })
    }

    /// Whether `inspection` should skip the payload path.
    #[must_use]
    pub fn is_ignored(&self, inspection: &str, path: &str) -> bool {
        self.global.is_match(path)
            || self
                .per_inspection
                .get(inspection)
                .is_some_and(|set| set.is_match(path))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ignore_set_matching() {
        let set = IgnoreSet::new(&["/usr/share/doc/**", "*.pyc"]).expect("valid globs");
        assert!(set.is_match("/usr/share/doc/foo/README"));
        assert!(set.is_match("/usr/lib/python3/x.pyc"));
        assert!(!set.is_match("/usr/bin/foo"));
        assert_eq!(set.len(), 2);
    }

    #[test]
    fn test_empty_set_matches_nothing() {
        let set = IgnoreSet::default();
        assert!(set.is_empty());
        assert!(!set.is_match("/anything"));
    }

    #[test]
    fn test_invalid_glob() {
        let err = IgnoreSet::new(&["/usr/["]).expect_err("invalid");
        assert!(matches!(err, InspectError::Config(_)));
    }

    #[test]
    fn test_rules_per_inspection() {
        let config = RunConfig::builder()
            .ignore("/tmp/**")
            .inspection_ignore("permissions", "/var/**")
            .build();
        let rules = IgnoreRules::from_config(&config).expect("rules");
        assert!(rules.is_ignored("filechanges", "/tmp/x"));
        assert!(rules.is_ignored("permissions", "/var/lib/x"));
        assert!(!rules.is_ignored("filechanges", "/var/lib/x"));
    }
}
