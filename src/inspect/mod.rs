//! Inspections over a correlated build pair.
//!
//! Two kinds of checks exist. A [`PairedCheck`] compares the before and
//! after side of each package peer; a [`SingleBuildCheck`] looks at every
//! snapshot of the after build on its own. The [`InspectionRunner`] fans
//! each check out over peers with rayon and reports one outcome per
//! inspection.

mod capabilities;
mod changes;
mod context;
mod ignore;
mod ownership;
mod permissions;

pub use capabilities::Capabilities;
pub use changes::FileChanges;
pub use context::{InspectionRun, RunContext};
pub use ignore::{IgnoreRules, IgnoreSet};
pub use ownership::Ownership;
pub use permissions::Permissions;

use crate::config::RunConfig;
use crate::model::{BuildSide, PackageSnapshot};
use crate::peers::PackagePeer;
use crate::results::InspectionOutcome;
use rayon::prelude::*;

/// Names of the built-in inspections, in run order.
pub const BUILTIN_INSPECTIONS: &[&str] = &[
    FileChanges::NAME,
    Permissions::NAME,
    Capabilities::NAME,
    Ownership::NAME,
];

/// A check comparing both sides of a package peer.
pub trait PairedCheck: Send + Sync {
    /// Header used on this check's findings.
    fn name(&self) -> &'static str;

    /// Inspect one peer. Called concurrently for different peers.
    fn check_peer(&self, ctx: &RunContext<'_>, peer: &PackagePeer);
}

/// A check looking at one build only.
pub trait SingleBuildCheck: Send + Sync {
    fn name(&self) -> &'static str;

    /// Inspect one after-build snapshot. Called concurrently.
    fn check_snapshot(&self, ctx: &RunContext<'_>, snapshot: &PackageSnapshot);
}

/// An inspection of either kind.
pub enum Inspection {
    Paired(Box<dyn PairedCheck>),
    SingleBuild(Box<dyn SingleBuildCheck>),
}

impl std::fmt::Debug for Inspection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Paired(c) => f.debug_tuple("Paired").field(&c.name()).finish(),
            Self::SingleBuild(c) => f.debug_tuple("SingleBuild").field(&c.name()).finish(),
        }
    }
}

impl Inspection {
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::Paired(c) => c.name(),
            Self::SingleBuild(c) => c.name(),
        }
    }

    /// Look up a built-in inspection by name.
    #[must_use]
    pub fn builtin(name: &str) -> Option<Self> {
        match name {
            FileChanges::NAME => Some(Self::Paired(Box::new(FileChanges))),
            Permissions::NAME => Some(Self::Paired(Box::new(Permissions))),
            Capabilities::NAME => Some(Self::Paired(Box::new(Capabilities))),
            Ownership::NAME => Some(Self::SingleBuild(Box::new(Ownership))),
            _ => None,
        }
    }
}

/// Runs a list of inspections against a run context.
#[derive(Debug, Default)]
pub struct InspectionRunner {
    inspections: Vec<Inspection>,
}

impl InspectionRunner {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The built-in inspections enabled by the configuration.
    #[must_use]
    pub fn from_config(config: &RunConfig) -> Self {
        let inspections = BUILTIN_INSPECTIONS
            .iter()
            .filter(|name| config.is_enabled(name))
            .filter_map(|name| Inspection::builtin(name))
            .collect();
        Self { inspections }
    }

    #[must_use]
    pub fn with(mut self, inspection: Inspection) -> Self {
        self.inspections.push(inspection);
        self
    }

    #[must_use]
    pub fn names(&self) -> Vec<&'static str> {
        self.inspections.iter().map(Inspection::name).collect()
    }

    /// Run every inspection in order.
    ///
    /// An inspection passes when none of its findings reach the run
    /// threshold.
    pub fn run(&self, ctx: &RunContext<'_>) -> Vec<InspectionOutcome> {
        let has_before = ctx.peers.has_before();
        let mut outcomes = Vec::with_capacity(self.inspections.len());

        for inspection in &self.inspections {
            let name = inspection.name();
            match inspection {
                Inspection::Paired(check) => {
                    if has_before {
                        ctx.peers
                            .peers()
                            .par_iter()
                            .for_each(|peer| check.check_peer(ctx, peer));
                    } else {
                        tracing::info!(inspection = name, "No before build, skipping");
                    }
                }
                Inspection::SingleBuild(check) => {
                    let snapshots: Vec<&PackageSnapshot> =
                        ctx.peers.snapshots(BuildSide::After).collect();
                    snapshots
                        .into_par_iter()
                        .for_each(|snapshot| check.check_snapshot(ctx, snapshot));
                }
            }

            let worst = ctx.results().worst_for_header(name);
            let passed = worst < ctx.config.threshold;
            tracing::info!(inspection = name, %worst, passed, "Inspection finished");
            outcomes.push(InspectionOutcome {
                name: name.to_string(),
                passed,
            });
        }

        outcomes
    }
}
