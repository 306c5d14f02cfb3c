//! Configuration types for inspection runs.

use crate::model::{Severity, WaiverAuthority};
use crate::peers::FavorRelease;
use crate::results::ReportFormat;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;

// ============================================================================
// Run Configuration
// ============================================================================

/// Configuration of one inspection run, loaded from a config file and
/// overridden by command line arguments.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct RunConfig {
    /// Lowest severity that fails the run
    pub threshold: Severity,
    /// Which duplicate snapshot of a package wins
    pub favor_release: FavorRelease,
    /// Path to a security rule file
    #[serde(skip_serializing_if = "Option::is_none")]
    pub security_rules: Option<PathBuf>,
    /// Global waiver authority overrides per severity
    pub waivers: BTreeMap<Severity, WaiverAuthority>,
    /// Payload path globs ignored by every inspection
    pub ignores: Vec<String>,
    /// Payload path globs ignored by one inspection
    pub inspection_ignores: BTreeMap<String, Vec<String>>,
    /// Payload path prefixes where content changes are security relevant
    pub security_path_prefixes: Vec<String>,
    /// File owners that must not appear in a build
    pub forbidden_owners: Vec<String>,
    /// File groups that must not appear in a build
    pub forbidden_groups: Vec<String>,
    /// Files expected to carry a given mode and ownership
    pub fileinfo: Vec<FileInfoEntry>,
    /// Files allowed to carry file capabilities
    pub capabilities: Vec<CapsEntry>,
    /// Inspections to run; empty runs all of them
    pub inspections: Vec<String>,
    /// Report output settings
    pub output: OutputConfig,
}

impl RunConfig {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn builder() -> RunConfigBuilder {
        RunConfigBuilder::default()
    }

    /// Whether an inspection is enabled by name.
    #[must_use]
    pub fn is_enabled(&self, inspection: &str) -> bool {
        self.inspections.is_empty() || self.inspections.iter().any(|i| i == inspection)
    }

    /// The fileinfo entry describing exactly this path, mode and ownership.
    #[must_use]
    pub fn expected_fileinfo(
        &self,
        path: &str,
        permissions: u32,
        owner: &str,
        group: &str,
    ) -> Option<&FileInfoEntry> {
        self.fileinfo.iter().find(|info| {
            info.path == path
                && info.permissions() == Some(permissions)
                && info.owner == owner
                && info.group == group
        })
    }

    /// Capabilities a package's file is allowed to carry.
    #[must_use]
    pub fn allowed_capabilities(&self, package: &str, path: &str) -> Option<&str> {
        self.capabilities
            .iter()
            .find(|entry| entry.package == package && entry.path == path)
            .map(|entry| entry.capabilities.as_str())
    }
}

/// Expected mode and ownership of one payload file.
///
/// Listed files are not flagged for carrying exactly this mode and
/// ownership, setuid and setgid bits included.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct FileInfoEntry {
    pub path: String,
    /// Permission bits in octal, e.g. `"4755"`
    pub mode: String,
    pub owner: String,
    pub group: String,
}

impl FileInfoEntry {
    pub fn new(
        path: impl Into<String>,
        mode: u32,
        owner: impl Into<String>,
        group: impl Into<String>,
    ) -> Self {
        Self {
            path: path.into(),
            mode: format!("{mode:04o}"),
            owner: owner.into(),
            group: group.into(),
        }
    }

    /// Permission bits, or `None` when `mode` is not octal.
    #[must_use]
    pub fn permissions(&self) -> Option<u32> {
        u32::from_str_radix(self.mode.trim(), 8)
            .ok()
            .filter(|bits| *bits <= 0o7777)
    }
}

/// File capabilities a package's file may carry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct CapsEntry {
    pub package: String,
    pub path: String,
    /// Capability text as printed by `getcap`, e.g. `"cap_net_raw=ep"`
    pub capabilities: String,
}

impl CapsEntry {
    pub fn new(
        package: impl Into<String>,
        path: impl Into<String>,
        capabilities: impl Into<String>,
    ) -> Self {
        Self {
            package: package.into(),
            path: path.into(),
            capabilities: capabilities.into(),
        }
    }
}

/// Report output settings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct OutputConfig {
    pub format: ReportFormat,
    /// Write the report to a file instead of stdout
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file: Option<PathBuf>,
    pub no_color: bool,
}

// ============================================================================
// Builder for RunConfig
// ============================================================================

/// Builder for constructing `RunConfig` with a fluent API.
#[derive(Debug, Default)]
#[must_use]
pub struct RunConfigBuilder {
    config: RunConfig,
}

impl RunConfigBuilder {
    pub const fn threshold(mut self, threshold: Severity) -> Self {
        self.config.threshold = threshold;
        self
    }

    pub const fn favor_release(mut self, favor: FavorRelease) -> Self {
        self.config.favor_release = favor;
        self
    }

    pub fn security_rules(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.security_rules = Some(path.into());
        self
    }

    pub fn waiver(mut self, severity: Severity, authority: WaiverAuthority) -> Self {
        self.config.waivers.insert(severity, authority);
        self
    }

    pub fn ignore(mut self, glob: impl Into<String>) -> Self {
        self.config.ignores.push(glob.into());
        self
    }

    pub fn inspection_ignore(
        mut self,
        inspection: impl Into<String>,
        glob: impl Into<String>,
    ) -> Self {
        self.config
            .inspection_ignores
            .entry(inspection.into())
            .or_default()
            .push(glob.into());
        self
    }

    pub fn security_path_prefixes(mut self, prefixes: Vec<String>) -> Self {
        self.config.security_path_prefixes = prefixes;
        self
    }

    pub fn forbidden_owner(mut self, owner: impl Into<String>) -> Self {
        self.config.forbidden_owners.push(owner.into());
        self
    }

    pub fn forbidden_group(mut self, group: impl Into<String>) -> Self {
        self.config.forbidden_groups.push(group.into());
        self
    }

    pub fn fileinfo(mut self, entry: FileInfoEntry) -> Self {
        self.config.fileinfo.push(entry);
        self
    }

    pub fn capabilities(mut self, entry: CapsEntry) -> Self {
        self.config.capabilities.push(entry);
        self
    }

    pub fn inspections(mut self, names: Vec<String>) -> Self {
        self.config.inspections = names;
        self
    }

    pub const fn output_format(mut self, format: ReportFormat) -> Self {
        self.config.output.format = format;
        self
    }

    pub const fn no_color(mut self, no_color: bool) -> Self {
        self.config.output.no_color = no_color;
        self
    }

    #[must_use]
    pub fn build(self) -> RunConfig {
        self.config
    }
}
