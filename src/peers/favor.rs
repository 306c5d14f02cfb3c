//! Tie-break between same-named snapshots on one side of a comparison.

use crate::model::PackageSnapshot;
use crate::utils::compare_evr;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;

/// Which of several same-named candidate snapshots is authoritative.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Default,
    Serialize,
    Deserialize,
    JsonSchema,
    clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum FavorRelease {
    /// First seen in input order
    #[default]
    None,
    /// Lowest epoch:version-release
    Oldest,
    /// Highest epoch:version-release
    Newest,
}

impl fmt::Display for FavorRelease {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::None => "none",
            Self::Oldest => "oldest",
            Self::Newest => "newest",
        })
    }
}

impl FavorRelease {
    /// Split candidates into the authoritative snapshot and the shadowed rest.
    ///
    /// Candidates must be in input order. Ties on EVR keep the earlier one.
    pub(crate) fn select(
        self,
        mut candidates: Vec<PackageSnapshot>,
    ) -> Option<(PackageSnapshot, Vec<PackageSnapshot>)> {
        if candidates.is_empty() {
            return None;
        }

        let mut chosen = 0;
        for (i, candidate) in candidates.iter().enumerate().skip(1) {
            let ord = compare_evr(candidate.metadata(), candidates[chosen].metadata());
            let replace = match self {
                Self::None => false,
                Self::Oldest => ord == Ordering::Less,
                Self::Newest => ord == Ordering::Greater,
            };
            if replace {
                chosen = i;
            }
        }

        let winner = candidates.remove(chosen);
        Some((winner, candidates))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{BuildSide, PackageMetadata};
    use std::sync::Arc;

    fn snap(version: &str, release: &str) -> PackageSnapshot {
        PackageSnapshot::new(
            Arc::new(PackageMetadata::new("foo", version, release)),
            BuildSide::After,
        )
    }

    fn versions() -> Vec<PackageSnapshot> {
        vec![snap("1.2", "1"), snap("1.10", "1"), snap("1.0", "3")]
    }

    #[test]
    fn test_favor_none_keeps_first_seen() {
        let (winner, shadowed) = FavorRelease::None.select(versions()).expect("winner");
        assert_eq!(winner.metadata().version, "1.2");
        assert_eq!(shadowed.len(), 2);
    }

    #[test]
    fn test_favor_newest_and_oldest() {
        let (newest, _) = FavorRelease::Newest.select(versions()).expect("winner");
        assert_eq!(newest.metadata().version, "1.10");

        let (oldest, _) = FavorRelease::Oldest.select(versions()).expect("winner");
        assert_eq!(oldest.metadata().version, "1.0");
    }

    #[test]
    fn test_empty_candidates() {
        assert!(FavorRelease::Newest.select(Vec::new()).is_none());
    }
}
