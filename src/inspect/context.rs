//! Run state shared by inspections.

use super::ignore::IgnoreRules;
use crate::cache::BuildCaches;
use crate::config::RunConfig;
use crate::error::Result;
use crate::model::{PackageMetadata, PackageSnapshot, Severity};
use crate::peers::{BuildPeerIndex, PeerIndexBuilder};
use crate::policy::SecurityPolicyResolver;
use crate::results::{FindingParams, InspectionOutcome, Report, ResultAggregator, WaiverPolicy};

/// Everything one inspection run owns.
///
/// Fields drop in declaration order: findings first, then the rules, the
/// peer index and finally the metadata caches the snapshots were built from.
#[derive(Debug)]
pub struct InspectionRun {
    results: ResultAggregator,
    resolver: SecurityPolicyResolver,
    peers: BuildPeerIndex,
    caches: BuildCaches,
    ignores: IgnoreRules,
    config: RunConfig,
}

impl InspectionRun {
    /// Correlate both builds and set up an empty result set.
    pub fn new(
        config: RunConfig,
        caches: BuildCaches,
        resolver: SecurityPolicyResolver,
        before: Vec<PackageSnapshot>,
        after: Vec<PackageSnapshot>,
    ) -> Result<Self> {
        let ignores = IgnoreRules::from_config(&config)?;
        let peers = PeerIndexBuilder::new()
            .with_favor_release(config.favor_release)
            .build(before, after);
        let results = ResultAggregator::with_waiver_policy(WaiverPolicy::with_overrides(
            &config.waivers,
        ));

        Ok(Self {
            results,
            resolver,
            peers,
            caches,
            ignores,
            config,
        })
    }

    /// Borrowed view handed to inspections.
    #[must_use]
    pub fn context(&self) -> RunContext<'_> {
        RunContext {
            config: &self.config,
            peers: &self.peers,
            resolver: &self.resolver,
            caches: &self.caches,
            results: &self.results,
            ignores: &self.ignores,
        }
    }

    #[must_use]
    pub const fn config(&self) -> &RunConfig {
        &self.config
    }

    #[must_use]
    pub const fn peers(&self) -> &BuildPeerIndex {
        &self.peers
    }

    pub fn peers_mut(&mut self) -> &mut BuildPeerIndex {
        &mut self.peers
    }

    #[must_use]
    pub const fn results(&self) -> &ResultAggregator {
        &self.results
    }

    #[must_use]
    pub const fn caches(&self) -> &BuildCaches {
        &self.caches
    }

    /// Finish the run, judging findings against the configured threshold.
    #[must_use]
    pub fn finish(self, inspections: Vec<InspectionOutcome>) -> Report {
        let threshold = self.config.threshold;
        self.results.into_report(threshold, inspections)
    }
}

/// Read-only access to run state for inspections.
#[derive(Debug, Clone, Copy)]
pub struct RunContext<'a> {
    pub config: &'a RunConfig,
    pub peers: &'a BuildPeerIndex,
    pub resolver: &'a SecurityPolicyResolver,
    pub caches: &'a BuildCaches,
    results: &'a ResultAggregator,
    ignores: &'a IgnoreRules,
}

impl<'a> RunContext<'a> {
    /// Record a finding, applying security rule waiver overrides.
    pub fn report(&self, params: FindingParams) {
        self.results.submit_with_rules(params, self.resolver);
    }

    #[must_use]
    pub const fn results(&self) -> &'a ResultAggregator {
        self.results
    }

    /// Severity for a named check, after security rule remapping.
    #[must_use]
    pub fn action_severity(
        &self,
        meta: &PackageMetadata,
        check: &str,
        default: Severity,
    ) -> Severity {
        self.resolver
            .resolve(&meta.name, &meta.version, &meta.release)
            .and_then(|policy| policy.action(check))
            .unwrap_or(default)
    }

    #[must_use]
    pub fn is_ignored(&self, inspection: &str, path: &str) -> bool {
        self.ignores.is_ignored(inspection, path)
    }

    /// Whether a payload path lies under a security-sensitive prefix.
    #[must_use]
    pub fn is_security_path(&self, path: &str) -> bool {
        self.config
            .security_path_prefixes
            .iter()
            .any(|prefix| path.starts_with(prefix.as_str()))
    }
}
