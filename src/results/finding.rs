//! Findings and the parameters they are created from.

use crate::model::{PackageMetadata, Severity, Verb, WaiverAuthority};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Package a finding was raised for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackageContext {
    pub name: String,
    pub version: String,
    pub release: String,
}

impl From<&PackageMetadata> for PackageContext {
    fn from(meta: &PackageMetadata) -> Self {
        Self {
            name: meta.name.clone(),
            version: meta.version.clone(),
            release: meta.release.clone(),
        }
    }
}

/// Everything an inspection supplies when reporting a result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FindingParams {
    pub severity: Severity,
    /// Explicit authority; wins over rules and the global map
    pub waiver_authority: Option<WaiverAuthority>,
    /// Name of the inspection reporting
    pub header: String,
    pub message: String,
    pub details: Option<String>,
    pub remedy: Option<String>,
    pub verb: Verb,
    pub noun: String,
    pub arch: Option<String>,
    pub file: Option<String>,
    pub package: Option<PackageContext>,
}

impl FindingParams {
    pub fn new(
        header: impl Into<String>,
        severity: Severity,
        verb: Verb,
        message: impl Into<String>,
    ) -> Self {
        Self {
            severity,
            waiver_authority: None,
            header: header.into(),
            message: message.into(),
            details: None,
            remedy: None,
            verb,
            noun: String::new(),
            arch: None,
            file: None,
            package: None,
        }
    }

    #[must_use]
    pub fn with_noun(mut self, noun: impl Into<String>) -> Self {
        self.noun = noun.into();
        self
    }

    #[must_use]
    pub fn with_waiver(mut self, authority: WaiverAuthority) -> Self {
        self.waiver_authority = Some(authority);
        self
    }

    #[must_use]
    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    #[must_use]
    pub fn with_remedy(mut self, remedy: impl Into<String>) -> Self {
        self.remedy = Some(remedy.into());
        self
    }

    #[must_use]
    pub fn with_arch(mut self, arch: impl Into<String>) -> Self {
        self.arch = Some(arch.into());
        self
    }

    #[must_use]
    pub fn with_file(mut self, file: impl Into<String>) -> Self {
        self.file = Some(file.into());
        self
    }

    /// Attach the package context, and its arch if it has one.
    #[must_use]
    pub fn with_package(mut self, meta: &PackageMetadata) -> Self {
        if self.arch.is_none() {
            self.arch.clone_from(&meta.arch);
        }
        self.package = Some(PackageContext::from(meta));
        self
    }
}

/// A recorded inspection result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Finding {
    pub severity: Severity,
    pub waiver_authority: WaiverAuthority,
    pub header: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remedy: Option<String>,
    pub verb: Verb,
    pub noun: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub arch: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub package: Option<PackageContext>,
}

impl Finding {
    pub(crate) fn from_params(params: FindingParams, waiver_authority: WaiverAuthority) -> Self {
        Self {
            severity: params.severity,
            waiver_authority,
            header: params.header,
            message: params.message,
            details: params.details,
            remedy: params.remedy,
            verb: params.verb,
            noun: params.noun,
            arch: params.arch,
            file: params.file,
            package: params.package,
        }
    }
}

/// Global severity to waiver authority map.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WaiverPolicy {
    defaults: BTreeMap<Severity, WaiverAuthority>,
}

impl Default for WaiverPolicy {
    fn default() -> Self {
        let defaults = [
            (Severity::Ok, WaiverAuthority::NotWaivable),
            (Severity::Info, WaiverAuthority::NotWaivable),
            (Severity::Verify, WaiverAuthority::Anyone),
            (Severity::Bad, WaiverAuthority::Anyone),
            (Severity::Skip, WaiverAuthority::NotWaivable),
        ];
        Self {
            defaults: defaults.into_iter().collect(),
        }
    }
}

impl WaiverPolicy {
    /// Defaults with the given entries overridden.
    #[must_use]
    pub fn with_overrides(overrides: &BTreeMap<Severity, WaiverAuthority>) -> Self {
        let mut policy = Self::default();
        policy
            .defaults
            .extend(overrides.iter().map(|(s, a)| (*s, *a)));
        policy
    }

    #[must_use]
    pub fn authority_for(&self, severity: Severity) -> WaiverAuthority {
        self.defaults.get(&severity).copied().unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_waiver_policy() {
        let policy = WaiverPolicy::default();
        assert_eq!(policy.authority_for(Severity::Info), WaiverAuthority::NotWaivable);
        assert_eq!(policy.authority_for(Severity::Bad), WaiverAuthority::Anyone);
    }

    #[test]
    fn test_waiver_overrides() {
        let overrides = [(Severity::Bad, WaiverAuthority::Security)].into_iter().collect();
        let policy = WaiverPolicy::with_overrides(&overrides);
        assert_eq!(policy.authority_for(Severity::Bad), WaiverAuthority::Security);
        assert_eq!(policy.authority_for(Severity::Verify), WaiverAuthority::Anyone);
    }

    #[test]
    fn test_with_package_inherits_arch() {
        let meta = PackageMetadata::new("foo", "1.0", "1").with_arch("x86_64");
        let params = FindingParams::new("filechanges", Severity::Info, Verb::Added, "msg")
            .with_package(&meta);
        assert_eq!(params.arch.as_deref(), Some("x86_64"));
        assert_eq!(params.package.map(|p| p.name), Some("foo".to_string()));
    }
}
