//! Files owned by forbidden users or groups.
//!
//! A file whose mode and ownership match a `fileinfo` entry is allowed.

use super::{RunContext, SingleBuildCheck};
use crate::model::{PackageSnapshot, Severity, Verb};
use crate::results::FindingParams;

#[derive(Debug, Clone, Copy, Default)]
pub struct Ownership;

impl Ownership {
    pub const NAME: &'static str = "ownership";
}

impl SingleBuildCheck for Ownership {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn check_snapshot(&self, ctx: &RunContext<'_>, snapshot: &PackageSnapshot) {
        let meta = snapshot.metadata().as_ref();
        let owners = &ctx.config.forbidden_owners;
        let groups = &ctx.config.forbidden_groups;

        for entry in snapshot.files() {
            let path = entry.localpath.as_str();
            if ctx.is_ignored(Self::NAME, path) {
                continue;
            }

            let mut violations = Vec::new();
            if owners.contains(&entry.stat.owner) {
                violations.push(format!("owner {}", entry.stat.owner));
            }
            if groups.contains(&entry.stat.group) {
                violations.push(format!("group {}", entry.stat.group));
            }
            if violations.is_empty() {
                continue;
            }
            let stat = &entry.stat;
            if ctx
                .config
                .expected_fileinfo(path, stat.permissions(), &stat.owner, &stat.group)
                .is_some()
            {
                tracing::debug!(path, "Ownership listed in fileinfo");
                continue;
            }

            ctx.report(
                FindingParams::new(
                    Self::NAME,
                    Severity::Bad,
                    Verb::Failed,
                    format!(
                        "{path} in {} has forbidden {}",
                        meta.nvr(),
                        violations.join(" and ")
                    ),
                )
                .with_noun(format!("file {path}"))
                .with_file(path)
                .with_package(meta)
                .with_remedy("Set the file owner and group explicitly in the package spec file."),
            );
        }
    }
}
