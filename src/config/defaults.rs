//! Default configuration values.

use super::types::RunConfig;
use crate::model::Severity;
use crate::peers::FavorRelease;

/// Default severity at which a run fails.
pub const DEFAULT_THRESHOLD: Severity = Severity::Verify;

/// Payload locations where a content change needs a security review.
pub const DEFAULT_SECURITY_PATH_PREFIXES: &[&str] = &[
    "/etc/pam.d/",
    "/etc/security/",
    "/etc/sudoers.d/",
    "/usr/lib/polkit-1/",
    "/usr/share/polkit-1/",
    "/usr/lib/tmpfiles.d/",
];

/// Owners and groups that packaged files should never carry.
pub const DEFAULT_FORBIDDEN_OWNERS: &[&str] = &["mockbuild"];
pub const DEFAULT_FORBIDDEN_GROUPS: &[&str] = &["mockbuild"];

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            threshold: DEFAULT_THRESHOLD,
            favor_release: FavorRelease::None,
            security_rules: None,
            waivers: Default::default(),
            ignores: Vec::new(),
            inspection_ignores: Default::default(),
            security_path_prefixes: to_strings(DEFAULT_SECURITY_PATH_PREFIXES),
            forbidden_owners: to_strings(DEFAULT_FORBIDDEN_OWNERS),
            forbidden_groups: to_strings(DEFAULT_FORBIDDEN_GROUPS),
            fileinfo: Vec::new(),
            capabilities: Vec::new(),
            inspections: Vec::new(),
            output: Default::default(),
        }
    }
}

fn to_strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| (*s).to_string()).collect()
}
