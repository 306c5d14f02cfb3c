//! Append-only collection of findings for one run.

use super::finding::{Finding, FindingParams, WaiverPolicy};
use super::report::{InspectionOutcome, Report};
use crate::model::{Severity, WaiverAuthority};
use crate::policy::SecurityPolicyResolver;
use std::sync::Mutex;

#[derive(Debug, Default)]
struct Collected {
    findings: Vec<Finding>,
    worst: Severity,
}

/// Thread-safe sink for inspection findings.
///
/// One lock guards both the append and the worst-severity update, so the
/// worst severity always agrees with the stored findings.
#[derive(Debug, Default)]
pub struct ResultAggregator {
    collected: Mutex<Collected>,
    waivers: WaiverPolicy,
}

impl ResultAggregator {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_waiver_policy(waivers: WaiverPolicy) -> Self {
        Self {
            collected: Mutex::default(),
            waivers,
        }
    }

    /// Record a finding using the explicit or global waiver authority.
    pub fn submit(&self, params: FindingParams) {
        let authority = params
            .waiver_authority
            .unwrap_or_else(|| self.waivers.authority_for(params.severity));
        self.push(Finding::from_params(params, authority));
    }

    /// Record a finding, consulting the security rules for its package.
    ///
    /// Precedence: explicit authority, then the resolved rule clause, then
    /// the global map.
    pub fn submit_with_rules(&self, params: FindingParams, resolver: &SecurityPolicyResolver) {
        let authority = params
            .waiver_authority
            .or_else(|| self.rule_authority(&params, resolver))
            .unwrap_or_else(|| self.waivers.authority_for(params.severity));
        self.push(Finding::from_params(params, authority));
    }

    fn rule_authority(
        &self,
        params: &FindingParams,
        resolver: &SecurityPolicyResolver,
    ) -> Option<WaiverAuthority> {
        let package = params.package.as_ref()?;
        resolver
            .resolve(&package.name, &package.version, &package.release)
            .and_then(|policy| policy.waiver_for(params.severity))
    }

    fn push(&self, finding: Finding) {
        tracing::debug!(
            header = %finding.header,
            severity = %finding.severity,
            file = finding.file.as_deref().unwrap_or(""),
            "Recorded finding"
        );
        let mut collected = self.collected.lock().expect("result aggregator lock poisoned");
        if finding.severity.is_reportable() && finding.severity > collected.worst {
            collected.worst = finding.severity;
        }
        collected.findings.push(finding);
    }

    /// Highest non-SKIP severity recorded, or OK.
    #[must_use]
    pub fn worst_severity(&self) -> Severity {
        self.collected
            .lock()
            .expect("result aggregator lock poisoned")
            .worst
    }

    /// Highest non-SKIP severity recorded by one inspection.
    #[must_use]
    pub fn worst_for_header(&self, header: &str) -> Severity {
        self.collected
            .lock()
            .expect("result aggregator lock poisoned")
            .findings
            .iter()
            .filter(|f| f.header == header && f.severity.is_reportable())
            .map(|f| f.severity)
            .max()
            .unwrap_or_default()
    }

    /// Whether the run stays below `threshold`.
    #[must_use]
    pub fn passes(&self, threshold: Severity) -> bool {
        self.worst_severity() < threshold
    }

    /// Snapshot of all findings in submission order, SKIP included.
    #[must_use]
    pub fn findings(&self) -> Vec<Finding> {
        self.collected
            .lock()
            .expect("result aggregator lock poisoned")
            .findings
            .clone()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.collected
            .lock()
            .expect("result aggregator lock poisoned")
            .findings
            .len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Consume the aggregator into a report judged against `threshold`.
    #[must_use]
    pub fn into_report(self, threshold: Severity, inspections: Vec<InspectionOutcome>) -> Report {
        let collected = self
            .collected
            .into_inner()
            .expect("result aggregator lock poisoned");
        Report::new(collected.findings, collected.worst, threshold, inspections)
    }
}
